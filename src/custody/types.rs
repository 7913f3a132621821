//! Custody Transfer Core Types
//!
//! Records for the document custody transfer FSM: the transfer itself,
//! its courier checkpoints, and the request payloads. Transition
//! methods validate legality before mutating; a failed transition
//! leaves the record untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{CustodyStatus, DeliveryStatus};
use crate::core_types::{DocumentId, UserRef};
use crate::error::WorkflowError;

/// Transfer ID - ULID-based unique identifier
///
/// Monotonic, sortable, and needs no coordination to mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    /// Generate a new unique TransferId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get the inner ULID value
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for TransferId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TransferId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Transfer variant: staff-to-staff digital handover, or a physical
/// package moving through a courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TransferKind {
    Digital = 1,
    Physical = 2,
}

impl TransferKind {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TransferKind::Digital),
            2 => Some(TransferKind::Physical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Digital => "digital",
            TransferKind::Physical => "physical",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One courier checkpoint appended to a physical transfer's delivery log.
///
/// Append-only; insertion order is the logical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub status: DeliveryStatus,
    pub location: Option<String>,
    pub note: Option<String>,
    pub tracking_number: Option<String>,
    pub courier_name: Option<String>,
    pub updated_by: UserRef,
    pub created_at: DateTime<Utc>,
}

/// A delivery log entry submitted by the sender or an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub courier_name: Option<String>,
}

/// Creation payload; the sender is the acting user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransfer {
    pub kind: TransferKind,
    pub receiver: UserRef,
    pub documents: Vec<DocumentId>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Document custody transfer record.
///
/// Never hard-deleted: terminal transfers are retained for history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub kind: TransferKind,
    pub sender: UserRef,
    pub receiver: UserRef,
    /// Non-empty, insertion-ordered
    pub documents: Vec<DocumentId>,
    pub message: Option<String>,
    pub custody_status: CustodyStatus,
    /// Populated once dispatch begins; physical transfers only
    pub delivery_status: Option<DeliveryStatus>,
    pub tracking_number: Option<String>,
    pub courier_name: Option<String>,
    /// Append-only courier log; physical transfers only
    pub checkpoints: Vec<Checkpoint>,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token; bumped on every committed transition
    pub revision: u64,
}

/// Treat empty or whitespace-only strings as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl Transfer {
    /// Create a new transfer in Pending state
    pub fn new(
        sender: UserRef,
        company_id: impl Into<String>,
        req: CreateTransfer,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if req.documents.is_empty() {
            return Err(WorkflowError::ValidationError(
                "a transfer needs at least one document".to_string(),
            ));
        }
        if sender.id == req.receiver.id {
            return Err(WorkflowError::ValidationError(
                "sender and receiver cannot be the same user".to_string(),
            ));
        }

        Ok(Self {
            id: TransferId::new(),
            kind: req.kind,
            sender,
            receiver: req.receiver,
            documents: req.documents,
            message: non_empty(req.message),
            custody_status: CustodyStatus::Pending,
            delivery_status: None,
            tracking_number: None,
            courier_name: None,
            checkpoints: Vec::new(),
            company_id: company_id.into(),
            created_at: now,
            accepted_at: None,
            cancelled_at: None,
            updated_at: now,
            revision: 0,
        })
    }

    /// The externally observed status label: delivery progress when
    /// dispatch has begun, custody status otherwise. Matches the
    /// original single-enum wire values.
    pub fn wire_status(&self) -> &'static str {
        match self.delivery_status {
            Some(delivery) => delivery.as_str(),
            None => self.custody_status.as_str(),
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.custody_status.is_terminal()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.revision += 1;
    }

    fn require_pending(&self, action: &str) -> Result<(), WorkflowError> {
        if self.custody_status != CustodyStatus::Pending {
            return Err(WorkflowError::InvalidTransition(format!(
                "cannot {} a transfer in status {}",
                action,
                self.wire_status()
            )));
        }
        Ok(())
    }

    /// Receiver acknowledges custody. Legal only while Pending.
    pub fn apply_accept(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.require_pending("accept")?;
        self.custody_status = CustodyStatus::Accepted;
        self.accepted_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Receiver declines custody. Legal only while Pending. Terminal.
    pub fn apply_reject(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.require_pending("reject")?;
        self.custody_status = CustodyStatus::Rejected;
        self.touch(now);
        Ok(())
    }

    /// Sender withdraws the transfer. Legal only while Pending. Terminal.
    pub fn apply_cancel(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.require_pending("cancel")?;
        self.custody_status = CustodyStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Log a courier checkpoint. Physical transfers only, legal from
    /// any non-terminal status; dispatching a still-Pending transfer
    /// implies acceptance. Appends exactly one checkpoint; non-empty
    /// tracking/courier values overwrite the transfer's, empty or
    /// omitted values leave them unchanged.
    pub fn apply_delivery(
        &mut self,
        update: DeliveryUpdate,
        updated_by: UserRef,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.kind != TransferKind::Physical {
            return Err(WorkflowError::InvalidTransition(
                "delivery updates apply only to physical transfers".to_string(),
            ));
        }
        if self.is_terminal() {
            return Err(WorkflowError::InvalidTransition(format!(
                "cannot update delivery of a transfer in status {}",
                self.wire_status()
            )));
        }

        if self.custody_status == CustodyStatus::Pending {
            self.custody_status = CustodyStatus::Accepted;
        }

        let tracking_number = non_empty(update.tracking_number);
        let courier_name = non_empty(update.courier_name);
        if let Some(ref tracking) = tracking_number {
            self.tracking_number = Some(tracking.clone());
        }
        if let Some(ref courier) = courier_name {
            self.courier_name = Some(courier.clone());
        }

        self.delivery_status = Some(update.status);
        self.checkpoints.push(Checkpoint {
            status: update.status,
            location: non_empty(update.location),
            note: non_empty(update.note),
            tracking_number,
            courier_name,
            updated_by,
            created_at: now,
        });
        self.touch(now);
        Ok(())
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} {} -> {} docs={} status={}",
            self.id,
            self.kind,
            self.sender,
            self.receiver,
            self.documents.len(),
            self.wire_status()
        )
    }
}
