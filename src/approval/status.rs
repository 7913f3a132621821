//! Approval FSM State Definitions
//!
//! Two-action workflow: Pending resolves to Approved or Rejected, both
//! terminal. State IDs are designed for PostgreSQL storage as SMALLINT.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum ApprovalStatus {
    /// Awaiting admin sign-off
    Pending = 0,

    /// Terminal: admin signed off and the underlying effect was applied
    Approved = 10,

    /// Terminal: admin declined; the underlying entity is untouched
    Rejected = -10,
}

impl ApprovalStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }

    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(ApprovalStatus::Pending),
            10 => Some(ApprovalStatus::Approved),
            -10 => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for ApprovalStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        ApprovalStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(!ApprovalStatus::Pending.is_terminal());
    }

    #[test]
    fn test_state_id_roundtrip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::from_id(status.id()), Some(status));
        }
        assert!(ApprovalStatus::from_id(5).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(ApprovalStatus::Pending.to_string(), "Pending");
        assert_eq!(ApprovalStatus::Approved.to_string(), "Approved");
    }
}
