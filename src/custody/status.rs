//! Custody FSM State Definitions
//!
//! State IDs are designed for PostgreSQL storage as SMALLINT.
//!
//! The original system overloaded one status enum for both custody
//! acceptance and courier progress; here they are two orthogonal
//! fields. `Transfer::wire_status()` reconstructs the externally
//! observed label set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Custody acceptance status.
///
/// Terminal states: REJECTED (-10), CANCELLED (-20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum CustodyStatus {
    /// Awaiting the receiver's decision
    Pending = 0,

    /// Receiver acknowledged custody (or acceptance was implied by dispatch)
    Accepted = 10,

    /// Terminal: receiver declined; documents stay with the sender
    Rejected = -10,

    /// Terminal: sender withdrew the transfer while pending
    Cancelled = -20,
}

impl CustodyStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustodyStatus::Rejected | CustodyStatus::Cancelled)
    }

    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(CustodyStatus::Pending),
            10 => Some(CustodyStatus::Accepted),
            -10 => Some(CustodyStatus::Rejected),
            -20 => Some(CustodyStatus::Cancelled),
            _ => None,
        }
    }

    /// Wire label, matching the original enum values
    pub fn as_str(&self) -> &'static str {
        match self {
            CustodyStatus::Pending => "Pending",
            CustodyStatus::Accepted => "Accepted",
            CustodyStatus::Rejected => "Rejected",
            CustodyStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for CustodyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for CustodyStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        CustodyStatus::from_id(value).ok_or(())
    }
}

/// Courier delivery sub-state for physical transfers.
///
/// No ordering is enforced between these values; operators may correct
/// or revert a status at any time while the transfer is not terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum DeliveryStatus {
    Dispatched = 1,
    #[serde(rename = "In Transit")]
    InTransit = 2,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery = 3,
    Delivered = 4,
    Returned = 5,
    Held = 6,
}

impl DeliveryStatus {
    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(DeliveryStatus::Dispatched),
            2 => Some(DeliveryStatus::InTransit),
            3 => Some(DeliveryStatus::OutForDelivery),
            4 => Some(DeliveryStatus::Delivered),
            5 => Some(DeliveryStatus::Returned),
            6 => Some(DeliveryStatus::Held),
            _ => None,
        }
    }

    /// Wire label, matching the original enum values (spaces included)
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Dispatched => "Dispatched",
            DeliveryStatus::InTransit => "In Transit",
            DeliveryStatus::OutForDelivery => "Out for Delivery",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Returned => "Returned",
            DeliveryStatus::Held => "Held",
        }
    }

    /// Parse a wire label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Dispatched" => Some(DeliveryStatus::Dispatched),
            "In Transit" => Some(DeliveryStatus::InTransit),
            "Out for Delivery" => Some(DeliveryStatus::OutForDelivery),
            "Delivered" => Some(DeliveryStatus::Delivered),
            "Returned" => Some(DeliveryStatus::Returned),
            "Held" => Some(DeliveryStatus::Held),
            _ => None,
        }
    }

    pub const ALL: [DeliveryStatus; 6] = [
        DeliveryStatus::Dispatched,
        DeliveryStatus::InTransit,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
        DeliveryStatus::Returned,
        DeliveryStatus::Held,
    ];
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for DeliveryStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        DeliveryStatus::from_id(value).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CustodyStatus::Rejected.is_terminal());
        assert!(CustodyStatus::Cancelled.is_terminal());

        assert!(!CustodyStatus::Pending.is_terminal());
        assert!(!CustodyStatus::Accepted.is_terminal());
    }

    #[test]
    fn test_custody_id_roundtrip() {
        let states = [
            CustodyStatus::Pending,
            CustodyStatus::Accepted,
            CustodyStatus::Rejected,
            CustodyStatus::Cancelled,
        ];
        for state in states {
            assert_eq!(CustodyStatus::from_id(state.id()), Some(state));
        }
        assert!(CustodyStatus::from_id(99).is_none());
    }

    #[test]
    fn test_delivery_id_roundtrip() {
        for state in DeliveryStatus::ALL {
            assert_eq!(DeliveryStatus::from_id(state.id()), Some(state));
        }
        assert!(DeliveryStatus::from_id(0).is_none());
        assert!(DeliveryStatus::from_id(7).is_none());
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(DeliveryStatus::InTransit.as_str(), "In Transit");
        assert_eq!(DeliveryStatus::OutForDelivery.as_str(), "Out for Delivery");
        assert_eq!(
            DeliveryStatus::from_label("Out for Delivery"),
            Some(DeliveryStatus::OutForDelivery)
        );
        assert_eq!(DeliveryStatus::from_label("Lost"), None);
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&DeliveryStatus::InTransit).unwrap();
        assert_eq!(json, "\"In Transit\"");
        let back: DeliveryStatus = serde_json::from_str("\"Out for Delivery\"").unwrap();
        assert_eq!(back, DeliveryStatus::OutForDelivery);
    }
}
