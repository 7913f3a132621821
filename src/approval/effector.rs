//! Entity Effector
//!
//! The external collaborator that actually deletes or updates the
//! underlying entity when a request is approved. The coordinator calls
//! it before committing Approved: if it fails, the request stays
//! Pending and the caller sees `DependencyFailure`.

use async_trait::async_trait;

use super::types::ApprovalRequest;
use crate::error::WorkflowError;

#[async_trait]
pub trait EntityEffector: Send + Sync {
    /// Apply the requested action to the underlying entity.
    ///
    /// # Idempotency
    /// May be retried for the same request id after a failure; the
    /// implementation must tolerate re-application.
    async fn apply(&self, request: &ApprovalRequest) -> Result<(), WorkflowError>;
}

/// Mock effector for tests: records calls, optionally fails.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct MockEffector {
        apply_count: AtomicUsize,
        fail_apply: AtomicBool,
        applied_ids: Mutex<Vec<i64>>,
    }

    impl MockEffector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_apply(&self, fail: bool) {
            self.fail_apply.store(fail, Ordering::SeqCst);
        }

        pub fn apply_count(&self) -> usize {
            self.apply_count.load(Ordering::SeqCst)
        }

        pub fn applied_ids(&self) -> Vec<i64> {
            self.applied_ids.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EntityEffector for MockEffector {
        async fn apply(&self, request: &ApprovalRequest) -> Result<(), WorkflowError> {
            self.apply_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_apply.load(Ordering::SeqCst) {
                return Err(WorkflowError::DependencyFailure(format!(
                    "{} {} #{} failed",
                    request.action, request.entity_type, request.entity_id
                )));
            }
            self.applied_ids.lock().unwrap().push(request.id);
            Ok(())
        }
    }
}
