//! End-to-end workflow scenarios
//!
//! Exercises the full coordinator stack with in-memory stores and mock
//! collaborators: custody lifecycles, delivery timelines, approval
//! atomicity and concurrent transition races.

use std::sync::Arc;

use custodyflow::approval::signup::mock::MockProvisioner;
use custodyflow::approval::{
    ApprovalAction, ApprovalCoordinator, ApprovalStatus, CreateApproval, CreateSignup,
    MemoryApprovalStore, MemorySignupStore, SignupCoordinator,
};
use custodyflow::approval::effector::mock::MockEffector;
use custodyflow::custody::coordinator::mock::MockCustodyLedger;
use custodyflow::custody::{
    CreateTransfer, CustodyCoordinator, CustodyStatus, DeliveryStatus, DeliveryUpdate,
    MemoryTransferStore, TICKET_CREATED, TransferKind,
};
use custodyflow::{Actor, Role, UserRef, WorkflowError};
use custodyflow::events::EventBus;

struct TestHarness {
    custody: Arc<CustodyCoordinator>,
    approvals: ApprovalCoordinator,
    signups: SignupCoordinator,
    ledger: Arc<MockCustodyLedger>,
    effector: Arc<MockEffector>,
    provisioner: Arc<MockProvisioner>,
}

impl TestHarness {
    fn new() -> Self {
        let events = EventBus::default();
        let ledger = Arc::new(MockCustodyLedger::new());
        let effector = Arc::new(MockEffector::new());
        let provisioner = Arc::new(MockProvisioner::new());

        Self {
            custody: Arc::new(CustodyCoordinator::new(
                Arc::new(MemoryTransferStore::new()),
                ledger.clone(),
                events.clone(),
            )),
            approvals: ApprovalCoordinator::new(
                Arc::new(MemoryApprovalStore::new()),
                effector.clone(),
                events.clone(),
            ),
            signups: SignupCoordinator::new(
                Arc::new(MemorySignupStore::new()),
                provisioner.clone(),
                events,
            ),
            ledger,
            effector,
            provisioner,
        }
    }
}

fn sender() -> Actor {
    Actor::new(1, "alice", Role::Employee, "acme")
}

fn receiver() -> Actor {
    Actor::new(2, "bob", Role::Employee, "acme")
}

fn admin() -> Actor {
    Actor::new(3, "ada", Role::CompanyAdmin, "acme")
}

fn physical_transfer() -> CreateTransfer {
    CreateTransfer {
        kind: TransferKind::Physical,
        receiver: UserRef::new(2, "bob"),
        documents: vec![11, 12],
        message: Some("originals in the blue folder".to_string()),
    }
}

fn delivery(status: DeliveryStatus) -> DeliveryUpdate {
    DeliveryUpdate {
        status,
        location: None,
        note: None,
        tracking_number: None,
        courier_name: None,
    }
}

// ========================================================================
// Custody lifecycle
// ========================================================================

/// A rejected transfer is terminal: every later action fails and the
/// record is deep-equal to its terminal snapshot.
#[tokio::test]
async fn test_terminal_transfer_is_immutable() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();
    let rejected = h.custody.reject(&receiver(), transfer.id).await.unwrap();

    for result in [
        h.custody.accept(&receiver(), transfer.id).await,
        h.custody.cancel(&sender(), transfer.id).await,
        h.custody
            .update_delivery(&sender(), transfer.id, delivery(DeliveryStatus::Dispatched))
            .await,
    ] {
        assert!(matches!(result, Err(WorkflowError::InvalidTransition(_))));
    }

    let reloaded = h.custody.get(&sender(), transfer.id).await.unwrap();
    assert_eq!(reloaded, rejected);
    assert_eq!(h.ledger.reassign_count(), 0);
}

/// Dispatching a still-pending physical transfer implies acceptance.
#[tokio::test]
async fn test_dispatch_from_pending_implies_acceptance() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();

    let updated = h
        .custody
        .update_delivery(&sender(), transfer.id, delivery(DeliveryStatus::Dispatched))
        .await
        .unwrap();
    assert_eq!(updated.custody_status, CustodyStatus::Accepted);
    assert_eq!(updated.delivery_status, Some(DeliveryStatus::Dispatched));

    // The receiver can no longer reject what is already moving.
    let result = h.custody.reject(&receiver(), transfer.id).await;
    assert!(matches!(result, Err(WorkflowError::InvalidTransition(_))));
}

/// Delivery statuses are unordered observations: a correction from
/// Delivered back to Held is accepted and logged.
#[tokio::test]
async fn test_delivery_updates_are_unordered() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();
    h.custody.accept(&receiver(), transfer.id).await.unwrap();

    for status in [
        DeliveryStatus::Delivered,
        DeliveryStatus::Held,
        DeliveryStatus::OutForDelivery,
    ] {
        h.custody
            .update_delivery(&sender(), transfer.id, delivery(status))
            .await
            .unwrap();
    }

    let reloaded = h.custody.get(&sender(), transfer.id).await.unwrap();
    assert_eq!(reloaded.delivery_status, Some(DeliveryStatus::OutForDelivery));
    assert_eq!(reloaded.checkpoints.len(), 3);
    assert_eq!(reloaded.wire_status(), "Out for Delivery");
}

/// The timeline lists checkpoints newest-first and closes with the
/// synthetic creation event.
#[tokio::test]
async fn test_timeline_merges_creation_and_checkpoints() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();

    h.custody
        .update_delivery(&sender(), transfer.id, delivery(DeliveryStatus::Dispatched))
        .await
        .unwrap();
    h.custody
        .update_delivery(&sender(), transfer.id, delivery(DeliveryStatus::Delivered))
        .await
        .unwrap();

    let events = h.custody.timeline(&sender(), transfer.id).await.unwrap();
    let statuses: Vec<&str> = events.iter().map(|e| e.status.as_str()).collect();
    assert_eq!(statuses, vec!["Delivered", "Dispatched", TICKET_CREATED]);

    let creation = events.last().unwrap();
    assert!(creation.is_system_event);
    assert!(creation.updated_by.is_none());
    assert!(creation.note.as_deref().unwrap().contains("alice"));
    assert!(events.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

/// Accepting moves every document in the transfer to the receiver.
#[tokio::test]
async fn test_accept_reassigns_document_custody() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();
    h.custody.accept(&receiver(), transfer.id).await.unwrap();

    for doc in [11, 12] {
        assert_eq!(h.ledger.holder_of(doc).unwrap().id, 2);
    }
}

/// Two actors race on the same pending transfer: exactly one
/// transition commits.
#[tokio::test]
async fn test_concurrent_accept_and_cancel_single_winner() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();

    let custody_a = h.custody.clone();
    let custody_b = h.custody.clone();
    let id = transfer.id;
    let (accept, cancel) = tokio::join!(
        tokio::spawn(async move { custody_a.accept(&receiver(), id).await }),
        tokio::spawn(async move { custody_b.cancel(&sender(), id).await }),
    );
    let accept = accept.unwrap();
    let cancel = cancel.unwrap();

    assert!(accept.is_ok() != cancel.is_ok(), "exactly one must win");
    let reloaded = h.custody.get(&sender(), transfer.id).await.unwrap();
    if accept.is_ok() {
        assert_eq!(reloaded.custody_status, CustodyStatus::Accepted);
        assert_eq!(h.ledger.reassign_count(), 1);
    } else {
        assert_eq!(reloaded.custody_status, CustodyStatus::Cancelled);
        assert_eq!(h.ledger.reassign_count(), 0);
    }
    assert_eq!(reloaded.revision, 1);
}

// ========================================================================
// Approval workflow
// ========================================================================

fn delete_request() -> CreateApproval {
    CreateApproval {
        action: ApprovalAction::Delete,
        entity_type: "student".to_string(),
        entity_id: 77,
        entity_name: "Sam Lee".to_string(),
        message: "left the program".to_string(),
        pending_changes: None,
    }
}

/// The full approval round trip: employee files, admin approves, the
/// entity effect runs exactly once.
#[tokio::test]
async fn test_approval_round_trip() {
    let h = TestHarness::new();
    let request = h.approvals.create(&sender(), delete_request()).await.unwrap();
    assert_eq!(request.status, ApprovalStatus::Pending);

    let approved = h.approvals.approve(&admin(), request.id, None).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(h.effector.applied_ids(), vec![request.id]);

    // Idempotence: re-approving a resolved request fails cleanly.
    let again = h.approvals.approve(&admin(), request.id, None).await;
    assert!(matches!(again, Err(WorkflowError::InvalidTransition(_))));
    assert_eq!(h.effector.apply_count(), 1);
}

/// If the entity effect fails, no Approved state is ever observable.
#[tokio::test]
async fn test_approve_is_atomic_with_the_effect() {
    let h = TestHarness::new();
    let request = h.approvals.create(&sender(), delete_request()).await.unwrap();
    h.effector.set_fail_apply(true);

    let result = h.approvals.approve(&admin(), request.id, None).await;
    assert!(matches!(result, Err(WorkflowError::DependencyFailure(_))));

    let reloaded = h.approvals.get(&admin(), request.id).await.unwrap();
    assert_eq!(reloaded.status, ApprovalStatus::Pending);
    assert!(reloaded.reviewed_by.is_none());
    assert!(reloaded.reviewed_at.is_none());
    assert!(reloaded.review_note.is_none());
}

/// Two admins race to review: one wins, the effect runs at most twice
/// (both may reach the effector) but only one review is recorded.
#[tokio::test]
async fn test_concurrent_reviews_single_winner() {
    let h = TestHarness::new();
    let request = h.approvals.create(&sender(), delete_request()).await.unwrap();

    let other_admin = Actor::new(4, "abe", Role::CompanyAdmin, "acme");
    let approve = h.approvals.approve(&admin(), request.id, None).await;
    let reject = h
        .approvals
        .reject(&other_admin, request.id, "needs discussion".to_string())
        .await;

    // Sequential here, but the CAS guarantees the second attempt fails
    // even if both had loaded the Pending snapshot.
    assert!(approve.is_ok());
    assert!(matches!(reject, Err(WorkflowError::InvalidTransition(_))));

    let reloaded = h.approvals.get(&admin(), request.id).await.unwrap();
    assert_eq!(reloaded.status, ApprovalStatus::Approved);
    assert_eq!(reloaded.reviewed_by.as_ref().unwrap().id, 3);
}

// ========================================================================
// Signup workflow
// ========================================================================

fn signup() -> CreateSignup {
    CreateSignup {
        company_name: "Brightpath Education".to_string(),
        admin_name: "Ravi Kumar".to_string(),
        email: "ravi@brightpath.example".to_string(),
        phone: Some("+91 98000 00000".to_string()),
        plan: None,
        username: "ravi".to_string(),
    }
}

/// Approving a signup provisions the tenant first; a failed
/// provisioning leaves the signup reviewable.
#[tokio::test]
async fn test_signup_provisioning_gate() {
    let h = TestHarness::new();
    let operator = Actor::new(9, "ops", Role::DevAdmin, "platform");
    let request = h.signups.create(signup()).await.unwrap();

    h.provisioner.set_fail_provision(true);
    let failed = h.signups.approve(&operator, request.id).await;
    assert!(matches!(failed, Err(WorkflowError::DependencyFailure(_))));
    assert!(h.provisioner.provisioned().is_empty());

    h.provisioner.set_fail_provision(false);
    let approved = h.signups.approve(&operator, request.id).await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(h.provisioner.provisioned(), vec!["Brightpath Education"]);
}

// ========================================================================
// Cross-tenant visibility
// ========================================================================

/// Records from one tenant are invisible to another tenant's admin but
/// visible to a platform operator.
#[tokio::test]
async fn test_tenant_isolation() {
    let h = TestHarness::new();
    let transfer = h.custody.create(&sender(), physical_transfer()).await.unwrap();
    let request = h.approvals.create(&sender(), delete_request()).await.unwrap();

    let outsider = Actor::new(50, "olga", Role::CompanyAdmin, "globex");
    assert!(matches!(
        h.custody.get(&outsider, transfer.id).await,
        Err(WorkflowError::NotFound(_))
    ));
    assert!(matches!(
        h.approvals.get(&outsider, request.id).await,
        Err(WorkflowError::NotFound(_))
    ));
    assert!(h.approvals.list(&outsider).await.unwrap().is_empty());

    let operator = Actor::new(9, "ops", Role::DevAdmin, "platform");
    assert!(h.custody.get(&operator, transfer.id).await.is_ok());
    assert_eq!(h.approvals.list(&operator).await.unwrap().len(), 1);
    assert_eq!(
        h.custody.list(&operator, None, None).await.unwrap().len(),
        1
    );
}
