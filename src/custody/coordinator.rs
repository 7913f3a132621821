//! Custody Coordinator
//!
//! Orchestrates transfer transitions: resolves permissions, validates
//! legality against the current status, commits through the store's
//! revision CAS, applies the custody side effect, and publishes
//! invalidation events. A transition either commits fully or leaves the
//! record untouched.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use super::store::{TransferFilter, TransferStore};
use super::timeline::{self, TimelineEvent};
use super::types::{CreateTransfer, DeliveryUpdate, Transfer, TransferId, TransferKind};
use crate::core_types::{Actor, DocumentId, Role, UserId, UserRef};
use crate::error::WorkflowError;
use crate::events::{CacheKey, EventBus};
use crate::permissions::{TransferAction, transfer_actions};

/// External document ledger: tracks who physically/digitally holds each
/// document. Reassignment happens when a transfer is accepted.
#[async_trait]
pub trait DocumentCustody: Send + Sync {
    /// Move the listed documents to a new holder.
    ///
    /// # Idempotency
    /// May be re-invoked for the same transfer id after a failure.
    async fn reassign(
        &self,
        transfer_id: TransferId,
        documents: &[DocumentId],
        new_holder: &UserRef,
    ) -> Result<(), WorkflowError>;
}

pub struct CustodyCoordinator {
    store: Arc<dyn TransferStore>,
    custody: Arc<dyn DocumentCustody>,
    events: EventBus,
}

impl CustodyCoordinator {
    pub fn new(
        store: Arc<dyn TransferStore>,
        custody: Arc<dyn DocumentCustody>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            custody,
            events,
        }
    }

    /// Create a transfer; the actor is the sender.
    pub async fn create(
        &self,
        actor: &Actor,
        req: CreateTransfer,
    ) -> Result<Transfer, WorkflowError> {
        let transfer = Transfer::new(actor.user_ref(), actor.company_id.clone(), req, Utc::now())?;
        self.store.create(&transfer).await?;

        info!(
            transfer_id = %transfer.id,
            kind = %transfer.kind,
            "Transfer created: {} -> {}", transfer.sender, transfer.receiver
        );
        self.events.publish(vec![CacheKey::Transfers]);
        Ok(transfer)
    }

    /// Load a transfer the actor is allowed to see.
    pub async fn get(&self, actor: &Actor, id: TransferId) -> Result<Transfer, WorkflowError> {
        let transfer = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;

        let participant = actor.id == transfer.sender.id || actor.id == transfer.receiver.id;
        if !participant && !actor.can_see_company(&transfer.company_id) {
            // Cross-tenant records are invisible, not forbidden.
            return Err(WorkflowError::NotFound(id.to_string()));
        }
        Ok(transfer)
    }

    /// List transfers visible to the actor, most recent first.
    pub async fn list(
        &self,
        actor: &Actor,
        kind: Option<TransferKind>,
        participant: Option<UserId>,
    ) -> Result<Vec<Transfer>, WorkflowError> {
        let company_id = if actor.role == Role::DevAdmin {
            None
        } else {
            Some(actor.company_id.clone())
        };
        self.store
            .list(&TransferFilter {
                company_id,
                participant,
                kind,
            })
            .await
    }

    /// Merged display timeline for a transfer.
    pub async fn timeline(
        &self,
        actor: &Actor,
        id: TransferId,
    ) -> Result<Vec<TimelineEvent>, WorkflowError> {
        let transfer = self.get(actor, id).await?;
        Ok(timeline::merge_transfer(&transfer))
    }

    /// Receiver acknowledges custody; documents move to the receiver.
    pub async fn accept(&self, actor: &Actor, id: TransferId) -> Result<Transfer, WorkflowError> {
        let transfer = self.get(actor, id).await?;
        if actor.id != transfer.receiver.id {
            return Err(WorkflowError::Unauthorized);
        }

        let mut updated = transfer.clone();
        updated.apply_accept(Utc::now())?;
        self.commit(&transfer, &updated).await?;

        if let Err(e) = self
            .custody
            .reassign(updated.id, &updated.documents, &updated.receiver)
            .await
        {
            // The transfer is Accepted; the ledger call is retried by ops.
            error!(
                transfer_id = %updated.id,
                error = %e,
                "Custody reassignment failed after accept"
            );
            return Err(WorkflowError::DependencyFailure(e.to_string()));
        }

        info!(transfer_id = %updated.id, "Transfer accepted by {}", updated.receiver);
        self.events.publish(vec![
            CacheKey::Transfer(updated.id),
            CacheKey::Transfers,
            CacheKey::Documents,
        ]);
        Ok(updated)
    }

    /// Receiver declines custody; documents stay with the sender.
    pub async fn reject(&self, actor: &Actor, id: TransferId) -> Result<Transfer, WorkflowError> {
        let transfer = self.get(actor, id).await?;
        if actor.id != transfer.receiver.id {
            return Err(WorkflowError::Unauthorized);
        }

        let mut updated = transfer.clone();
        updated.apply_reject(Utc::now())?;
        self.commit(&transfer, &updated).await?;

        info!(transfer_id = %updated.id, "Transfer rejected by {}", updated.receiver);
        self.events.publish(vec![
            CacheKey::Transfer(updated.id),
            CacheKey::Transfers,
            CacheKey::Documents,
        ]);
        Ok(updated)
    }

    /// Sender withdraws a still-pending transfer.
    pub async fn cancel(&self, actor: &Actor, id: TransferId) -> Result<Transfer, WorkflowError> {
        let transfer = self.get(actor, id).await?;
        if actor.id != transfer.sender.id {
            return Err(WorkflowError::Unauthorized);
        }

        let mut updated = transfer.clone();
        updated.apply_cancel(Utc::now())?;
        self.commit(&transfer, &updated).await?;

        info!(transfer_id = %updated.id, "Transfer cancelled by {}", updated.sender);
        self.events.publish(vec![
            CacheKey::Transfer(updated.id),
            CacheKey::Transfers,
            CacheKey::Documents,
        ]);
        Ok(updated)
    }

    /// Log a courier checkpoint on a physical transfer.
    pub async fn update_delivery(
        &self,
        actor: &Actor,
        id: TransferId,
        update: DeliveryUpdate,
    ) -> Result<Transfer, WorkflowError> {
        let transfer = self.get(actor, id).await?;
        if !transfer_actions(actor, &transfer).contains(&TransferAction::UpdateStatus) {
            // Distinguish role failure from state failure: a sender or
            // scoped admin on a wrong-kind/terminal transfer should see
            // InvalidTransition from apply_delivery below.
            let authorized = actor.id == transfer.sender.id
                || (actor.is_admin() && actor.can_see_company(&transfer.company_id));
            if !authorized {
                return Err(WorkflowError::Unauthorized);
            }
        }

        let mut updated = transfer.clone();
        updated.apply_delivery(update, actor.user_ref(), Utc::now())?;
        self.commit(&transfer, &updated).await?;

        info!(
            transfer_id = %updated.id,
            status = updated.wire_status(),
            checkpoints = updated.checkpoints.len(),
            "Delivery status updated"
        );
        self.events
            .publish(vec![CacheKey::Transfer(updated.id), CacheKey::Transfers]);
        Ok(updated)
    }

    /// Commit a validated transition through the revision CAS.
    async fn commit(&self, before: &Transfer, after: &Transfer) -> Result<(), WorkflowError> {
        if self.store.update_if(before.revision, after).await? {
            return Ok(());
        }
        // Another writer transitioned the record first; this attempt
        // loses without mutating anything.
        warn!(transfer_id = %after.id, "Lost transition race on transfer");
        Err(WorkflowError::InvalidTransition(
            "transfer was modified concurrently".to_string(),
        ))
    }
}

/// Mock custody ledger for tests.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct MockCustodyLedger {
        holders: Mutex<HashMap<DocumentId, UserRef>>,
        reassign_count: AtomicUsize,
        fail_reassign: AtomicBool,
    }

    impl MockCustodyLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_reassign(&self, fail: bool) {
            self.fail_reassign.store(fail, Ordering::SeqCst);
        }

        pub fn reassign_count(&self) -> usize {
            self.reassign_count.load(Ordering::SeqCst)
        }

        pub fn holder_of(&self, document: DocumentId) -> Option<UserRef> {
            self.holders.lock().unwrap().get(&document).cloned()
        }
    }

    #[async_trait]
    impl DocumentCustody for MockCustodyLedger {
        async fn reassign(
            &self,
            _transfer_id: TransferId,
            documents: &[DocumentId],
            new_holder: &UserRef,
        ) -> Result<(), WorkflowError> {
            self.reassign_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_reassign.load(Ordering::SeqCst) {
                return Err(WorkflowError::DependencyFailure(
                    "document ledger unavailable".to_string(),
                ));
            }
            let mut holders = self.holders.lock().unwrap();
            for &document in documents {
                holders.insert(document, new_holder.clone());
            }
            Ok(())
        }
    }
}
