//! Delivery Timeline Merger
//!
//! Combines the immutable creation fact with the append-only checkpoint
//! log into one display-ready sequence, most recent first. The merge is
//! deterministic: same inputs, same order.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{Checkpoint, Transfer};
use crate::core_types::UserRef;

/// Label for the synthetic creation event.
pub const TICKET_CREATED: &str = "Ticket Created";

/// One display event in the merged timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    /// Wire status label ("Dispatched", "In Transit", ..., or "Ticket Created")
    pub status: String,
    pub location: Option<String>,
    pub note: Option<String>,
    /// Absent for the synthetic creation event
    pub updated_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    /// The creation event renders differently and is never attributed
    /// like an operator update.
    pub is_system_event: bool,
}

impl From<&Checkpoint> for TimelineEvent {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            status: checkpoint.status.as_str().to_string(),
            location: checkpoint.location.clone(),
            note: checkpoint.note.clone(),
            updated_by: Some(checkpoint.updated_by.clone()),
            created_at: checkpoint.created_at,
            is_system_event: false,
        }
    }
}

/// Merge the creation fact with the checkpoint log.
///
/// Checkpoints first in insertion order, then the synthetic creation
/// event, stable-sorted by `created_at` descending; equal timestamps
/// keep their relative order.
pub fn merge(
    created_at: DateTime<Utc>,
    sender: &UserRef,
    checkpoints: &[Checkpoint],
) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = checkpoints.iter().map(TimelineEvent::from).collect();
    events.push(TimelineEvent {
        status: TICKET_CREATED.to_string(),
        location: None,
        note: Some(format!("Transfer request initiated by {}", sender.name)),
        updated_by: None,
        created_at,
        is_system_event: true,
    });
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events
}

/// Convenience wrapper for a whole transfer record.
pub fn merge_transfer(transfer: &Transfer) -> Vec<TimelineEvent> {
    merge(transfer.created_at, &transfer.sender, &transfer.checkpoints)
}
