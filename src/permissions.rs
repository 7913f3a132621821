//! Permission Resolver
//!
//! Pure, total functions computing the set of transitions an actor may
//! currently trigger on an object. No side effects; safe to call on
//! every re-render. The coordinators enforce the same rules before
//! mutating, so the UI only renders what these return and never
//! re-implements the role logic.

use std::collections::BTreeSet;

use crate::approval::status::ApprovalStatus;
use crate::approval::types::ApprovalRequest;
use crate::core_types::Actor;
use crate::custody::status::CustodyStatus;
use crate::custody::types::{Transfer, TransferKind};

/// Transitions on a custody transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferAction {
    Accept,
    Reject,
    Cancel,
    UpdateStatus,
}

impl TransferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::Accept => "accept",
            TransferAction::Reject => "reject",
            TransferAction::Cancel => "cancel",
            TransferAction::UpdateStatus => "update_status",
        }
    }
}

/// Transitions on an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
        }
    }
}

/// Actions `actor` may currently trigger on `transfer`.
///
/// Union semantics: a sender who is also an admin holds both `Cancel`
/// and `UpdateStatus` while the transfer is Pending; the state machine
/// still lets only one of them commit.
pub fn transfer_actions(actor: &Actor, transfer: &Transfer) -> BTreeSet<TransferAction> {
    let mut actions = BTreeSet::new();

    if transfer.custody_status == CustodyStatus::Pending {
        if actor.id == transfer.receiver.id {
            actions.insert(TransferAction::Accept);
            actions.insert(TransferAction::Reject);
        }
        if actor.id == transfer.sender.id {
            actions.insert(TransferAction::Cancel);
        }
    }

    let is_scoped_admin = actor.is_admin() && actor.can_see_company(&transfer.company_id);
    if transfer.kind == TransferKind::Physical
        && !transfer.is_terminal()
        && (actor.id == transfer.sender.id || is_scoped_admin)
    {
        actions.insert(TransferAction::UpdateStatus);
    }

    actions
}

/// Actions `actor` may currently trigger on `request`.
///
/// Requesters get read-only visibility, never an action.
pub fn approval_actions(actor: &Actor, request: &ApprovalRequest) -> BTreeSet<ReviewAction> {
    let mut actions = BTreeSet::new();
    if request.status == ApprovalStatus::Pending
        && actor.is_admin()
        && actor.can_see_company(&request.company_id)
    {
        actions.insert(ReviewAction::Approve);
        actions.insert(ReviewAction::Reject);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::{ApprovalAction, CreateApproval};
    use crate::core_types::{Role, UserRef};
    use crate::custody::types::CreateTransfer;
    use chrono::Utc;

    fn transfer(kind: TransferKind) -> Transfer {
        Transfer::new(
            UserRef::new(1, "alice"),
            "acme",
            CreateTransfer {
                kind,
                receiver: UserRef::new(2, "bob"),
                documents: vec![1, 2],
                message: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn request() -> ApprovalRequest {
        ApprovalRequest::new(
            1,
            UserRef::new(3, "carol"),
            "acme",
            CreateApproval {
                action: ApprovalAction::Delete,
                entity_type: "enquiry".to_string(),
                entity_id: 42,
                entity_name: "Jane Doe".to_string(),
                message: "duplicate entry".to_string(),
                pending_changes: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_receiver_gets_accept_reject_while_pending() {
        let transfer = transfer(TransferKind::Digital);
        let receiver = Actor::new(2, "bob", Role::Employee, "acme");
        let actions = transfer_actions(&receiver, &transfer);
        assert!(actions.contains(&TransferAction::Accept));
        assert!(actions.contains(&TransferAction::Reject));
        assert!(!actions.contains(&TransferAction::Cancel));
    }

    #[test]
    fn test_sender_gets_cancel_and_update_status() {
        let transfer = transfer(TransferKind::Physical);
        let sender = Actor::new(1, "alice", Role::Employee, "acme");
        let actions = transfer_actions(&sender, &transfer);
        assert!(actions.contains(&TransferAction::Cancel));
        assert!(actions.contains(&TransferAction::UpdateStatus));
        assert!(!actions.contains(&TransferAction::Accept));
    }

    #[test]
    fn test_update_status_needs_physical_kind() {
        let transfer = transfer(TransferKind::Digital);
        let sender = Actor::new(1, "alice", Role::Employee, "acme");
        assert!(!transfer_actions(&sender, &transfer).contains(&TransferAction::UpdateStatus));
    }

    #[test]
    fn test_admin_update_status_is_company_scoped() {
        let transfer = transfer(TransferKind::Physical);
        let local_admin = Actor::new(9, "ada", Role::CompanyAdmin, "acme");
        let foreign_admin = Actor::new(9, "ada", Role::CompanyAdmin, "globex");
        let dev_admin = Actor::new(10, "ops", Role::DevAdmin, "platform");

        assert!(transfer_actions(&local_admin, &transfer).contains(&TransferAction::UpdateStatus));
        assert!(transfer_actions(&foreign_admin, &transfer).is_empty());
        assert!(transfer_actions(&dev_admin, &transfer).contains(&TransferAction::UpdateStatus));
    }

    #[test]
    fn test_terminal_transfer_has_no_actions() {
        let mut transfer = transfer(TransferKind::Physical);
        transfer.apply_cancel(Utc::now()).unwrap();
        let sender = Actor::new(1, "alice", Role::CompanyAdmin, "acme");
        assert!(transfer_actions(&sender, &transfer).is_empty());
    }

    #[test]
    fn test_unrelated_actor_has_no_actions() {
        let transfer = transfer(TransferKind::Digital);
        let stranger = Actor::new(99, "mallory", Role::Employee, "acme");
        assert!(transfer_actions(&stranger, &transfer).is_empty());
    }

    #[test]
    fn test_approval_actions_admin_only() {
        let request = request();
        let admin = Actor::new(9, "ada", Role::CompanyAdmin, "acme");
        let requester = Actor::new(3, "carol", Role::Employee, "acme");

        let admin_actions = approval_actions(&admin, &request);
        assert!(admin_actions.contains(&ReviewAction::Approve));
        assert!(admin_actions.contains(&ReviewAction::Reject));
        assert!(approval_actions(&requester, &request).is_empty());
    }

    #[test]
    fn test_resolved_request_has_no_actions() {
        let mut request = request();
        request
            .apply_reject(UserRef::new(9, "ada"), "not justified".to_string(), Utc::now())
            .unwrap();
        let admin = Actor::new(9, "ada", Role::CompanyAdmin, "acme");
        assert!(approval_actions(&admin, &request).is_empty());
    }
}
