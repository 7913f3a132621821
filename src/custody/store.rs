//! Transfer Store
//!
//! Persistence seam for custody transfers. Every committed transition
//! goes through `update_if`, a compare-and-swap on the record revision:
//! of two concurrent transition attempts exactly one wins, the other
//! observes a CAS miss and reports `InvalidTransition`.

use async_trait::async_trait;
use dashmap::DashMap;

use super::types::{Transfer, TransferId, TransferKind};
use crate::core_types::UserId;
use crate::error::WorkflowError;

/// List filter; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub company_id: Option<String>,
    /// Matches sender or receiver
    pub participant: Option<UserId>,
    pub kind: Option<TransferKind>,
}

impl TransferFilter {
    pub fn matches(&self, transfer: &Transfer) -> bool {
        if let Some(ref company) = self.company_id {
            if transfer.company_id != *company {
                return false;
            }
        }
        if let Some(user) = self.participant {
            if transfer.sender.id != user && transfer.receiver.id != user {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if transfer.kind != kind {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn create(&self, transfer: &Transfer) -> Result<(), WorkflowError>;

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>, WorkflowError>;

    /// Most recent first.
    async fn list(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, WorkflowError>;

    /// Persist `updated` only if the stored revision equals
    /// `expected_revision`. Returns false when another writer got there
    /// first; the store is left unchanged in that case.
    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &Transfer,
    ) -> Result<bool, WorkflowError>;
}

/// In-memory store used by tests and the default server mode.
#[derive(Default)]
pub struct MemoryTransferStore {
    inner: DashMap<TransferId, Transfer>,
}

impl MemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn create(&self, transfer: &Transfer) -> Result<(), WorkflowError> {
        if self.inner.contains_key(&transfer.id) {
            return Err(WorkflowError::StorageError(format!(
                "duplicate transfer id {}",
                transfer.id
            )));
        }
        self.inner.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn get(&self, id: TransferId) -> Result<Option<Transfer>, WorkflowError> {
        Ok(self.inner.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &TransferFilter) -> Result<Vec<Transfer>, WorkflowError> {
        let mut transfers: Vec<Transfer> = self
            .inner
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        transfers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transfers)
    }

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &Transfer,
    ) -> Result<bool, WorkflowError> {
        match self.inner.get_mut(&updated.id) {
            Some(mut entry) => {
                if entry.revision != expected_revision {
                    return Ok(false);
                }
                *entry = updated.clone();
                Ok(true)
            }
            None => Err(WorkflowError::NotFound(updated.id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::UserRef;
    use crate::custody::types::CreateTransfer;
    use chrono::Utc;

    fn sample(kind: TransferKind, company: &str) -> Transfer {
        Transfer::new(
            UserRef::new(1, "alice"),
            company,
            CreateTransfer {
                kind,
                receiver: UserRef::new(2, "bob"),
                documents: vec![1],
                message: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryTransferStore::new();
        let transfer = sample(TransferKind::Digital, "acme");
        store.create(&transfer).await.unwrap();

        let loaded = store.get(transfer.id).await.unwrap().unwrap();
        assert_eq!(loaded, transfer);
        assert!(store.create(&transfer).await.is_err());
    }

    #[tokio::test]
    async fn test_cas_single_winner() {
        let store = MemoryTransferStore::new();
        let transfer = sample(TransferKind::Digital, "acme");
        store.create(&transfer).await.unwrap();

        let mut first = transfer.clone();
        first.apply_accept(Utc::now()).unwrap();
        let mut second = transfer.clone();
        second.apply_cancel(Utc::now()).unwrap();

        // Both writers read revision 0; only one may commit.
        assert!(store.update_if(transfer.revision, &first).await.unwrap());
        assert!(!store.update_if(transfer.revision, &second).await.unwrap());

        let stored = store.get(transfer.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryTransferStore::new();
        let acme = sample(TransferKind::Digital, "acme");
        let globex = sample(TransferKind::Physical, "globex");
        store.create(&acme).await.unwrap();
        store.create(&globex).await.unwrap();

        let filter = TransferFilter {
            company_id: Some("acme".to_string()),
            ..Default::default()
        };
        let listed = store.list(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, acme.id);

        let by_kind = TransferFilter {
            kind: Some(TransferKind::Physical),
            ..Default::default()
        };
        assert_eq!(store.list(&by_kind).await.unwrap().len(), 1);

        let by_participant = TransferFilter {
            participant: Some(999),
            ..Default::default()
        };
        assert!(store.list(&by_participant).await.unwrap().is_empty());
    }
}
