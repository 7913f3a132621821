//! Approval Request Core Types
//!
//! A delete/update action raised by non-admin staff, pending admin
//! sign-off. The review fields are unset while Pending and set together
//! exactly once on the transition out of it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::ApprovalStatus;
use crate::core_types::UserRef;
use crate::error::WorkflowError;

/// The action being requested on the underlying entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalAction {
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "UPDATE")]
    Update,
}

impl ApprovalAction {
    #[inline]
    pub fn id(&self) -> i16 {
        match self {
            ApprovalAction::Delete => 1,
            ApprovalAction::Update => 2,
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ApprovalAction::Delete),
            2 => Some(ApprovalAction::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Delete => "DELETE",
            ApprovalAction::Update => "UPDATE",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creation payload; the requester is the acting user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApproval {
    pub action: ApprovalAction,
    pub entity_type: String,
    pub entity_id: i64,
    /// Denormalized label for display
    pub entity_name: String,
    /// Requester's justification, required
    pub message: String,
    /// Field changes to apply on approval (UPDATE requests)
    #[serde(default)]
    pub pending_changes: Option<serde_json::Value>,
}

/// Approval request record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: i64,
    pub action: ApprovalAction,
    pub entity_type: String,
    pub entity_id: i64,
    pub entity_name: String,
    pub message: String,
    pub pending_changes: Option<serde_json::Value>,
    pub requested_by: UserRef,
    pub company_id: String,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<UserRef>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token; bumped on every committed transition
    pub revision: u64,
}

impl ApprovalRequest {
    /// Create a new request in Pending state
    pub fn new(
        id: i64,
        requested_by: UserRef,
        company_id: impl Into<String>,
        req: CreateApproval,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if req.message.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "a justification message is required".to_string(),
            ));
        }
        if req.entity_type.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "entity_type is required".to_string(),
            ));
        }

        Ok(Self {
            id,
            action: req.action,
            entity_type: req.entity_type,
            entity_id: req.entity_id,
            entity_name: req.entity_name,
            message: req.message,
            pending_changes: req.pending_changes,
            requested_by,
            company_id: company_id.into(),
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            review_note: None,
            created_at: now,
            reviewed_at: None,
            revision: 0,
        })
    }

    fn require_pending(&self, action: &str) -> Result<(), WorkflowError> {
        if self.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidTransition(format!(
                "cannot {} a request already {}",
                action, self.status
            )));
        }
        Ok(())
    }

    fn resolve(
        &mut self,
        status: ApprovalStatus,
        reviewer: UserRef,
        note: String,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.reviewed_by = Some(reviewer);
        self.review_note = Some(note);
        self.reviewed_at = Some(now);
        self.revision += 1;
    }

    /// Mark approved, setting the review fields. The caller is
    /// responsible for having already applied the underlying effect.
    pub fn apply_approve(
        &mut self,
        reviewer: UserRef,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.require_pending("approve")?;
        self.resolve(ApprovalStatus::Approved, reviewer, note.unwrap_or_default(), now);
        Ok(())
    }

    /// Mark rejected. The note is mandatory.
    pub fn apply_reject(
        &mut self,
        reviewer: UserRef,
        note: String,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.require_pending("reject")?;
        if note.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "a rejection note is required".to_string(),
            ));
        }
        self.resolve(ApprovalStatus::Rejected, reviewer, note, now);
        Ok(())
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApprovalRequest[{}] {} {} #{} by {} status={}",
            self.id, self.action, self.entity_type, self.entity_id, self.requested_by, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> ApprovalRequest {
        ApprovalRequest::new(
            1,
            UserRef::new(3, "carol"),
            "acme",
            CreateApproval {
                action: ApprovalAction::Delete,
                entity_type: "registration".to_string(),
                entity_id: 7,
                entity_name: "John Smith".to_string(),
                message: "entered twice".to_string(),
                pending_changes: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_requires_message() {
        let result = ApprovalRequest::new(
            1,
            UserRef::new(3, "carol"),
            "acme",
            CreateApproval {
                action: ApprovalAction::Delete,
                entity_type: "enquiry".to_string(),
                entity_id: 1,
                entity_name: "x".to_string(),
                message: "   ".to_string(),
                pending_changes: None,
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
    }

    #[test]
    fn test_review_fields_unset_while_pending() {
        let request = pending();
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.reviewed_by.is_none());
        assert!(request.review_note.is_none());
        assert!(request.reviewed_at.is_none());
    }

    #[test]
    fn test_approve_sets_review_fields_once() {
        let mut request = pending();
        request
            .apply_approve(UserRef::new(9, "ada"), None, Utc::now())
            .unwrap();

        assert_eq!(request.status, ApprovalStatus::Approved);
        assert_eq!(request.reviewed_by.as_ref().unwrap().id, 9);
        // Missing note resolves to the empty string, still "set".
        assert_eq!(request.review_note.as_deref(), Some(""));
        assert!(request.reviewed_at.is_some());

        let again = request.apply_approve(UserRef::new(9, "ada"), None, Utc::now());
        assert!(matches!(again, Err(WorkflowError::InvalidTransition(_))));
    }

    #[test]
    fn test_reject_requires_note() {
        let mut request = pending();
        let result = request.apply_reject(UserRef::new(9, "ada"), "".to_string(), Utc::now());
        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.reviewed_by.is_none());

        request
            .apply_reject(UserRef::new(9, "ada"), "not justified".to_string(), Utc::now())
            .unwrap();
        assert_eq!(request.status, ApprovalStatus::Rejected);
        assert_eq!(request.review_note.as_deref(), Some("not justified"));
    }
}
