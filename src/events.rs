//! Cache Invalidation Bus
//!
//! On every successful transition the coordinators publish an
//! invalidation event keyed by the changed object and the list views it
//! affects. The presentation layer subscribes and refetches; the
//! delivery mechanism beyond this process boundary is someone else's
//! concern.

use tokio::sync::broadcast;

use crate::custody::TransferId;

/// Cache key for a view that must be refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    Transfer(TransferId),
    Transfers,
    /// Document-custody list (holders change on accept).
    Documents,
    ApprovalRequest(i64),
    ApprovalRequests,
    SignupRequest(i64),
    SignupRequests,
}

/// One "object changed" notification.
#[derive(Debug, Clone)]
pub struct Invalidation {
    pub keys: Vec<CacheKey>,
}

/// Broadcast fan-out for invalidation events.
///
/// Lossy: slow subscribers miss events and refetch on the next one;
/// publishing with no subscribers is a no-op.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Invalidation>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, keys: Vec<CacheKey>) {
        let _ = self.tx.send(Invalidation { keys });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
