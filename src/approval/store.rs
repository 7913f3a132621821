//! Approval Request Store
//!
//! Same CAS-on-revision contract as the transfer store; ids are
//! assigned by the store on create (serial keys in the original
//! backend).

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::status::ApprovalStatus;
use super::types::ApprovalRequest;
use crate::core_types::UserId;
use crate::error::WorkflowError;

/// List filter; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ApprovalFilter {
    pub company_id: Option<String>,
    pub requested_by: Option<UserId>,
    pub status: Option<ApprovalStatus>,
}

impl ApprovalFilter {
    pub fn matches(&self, request: &ApprovalRequest) -> bool {
        if let Some(ref company) = self.company_id {
            if request.company_id != *company {
                return false;
            }
        }
        if let Some(user) = self.requested_by {
            if request.requested_by.id != user {
                return false;
            }
        }
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Persist a new request, assigning its id.
    async fn create(&self, request: ApprovalRequest) -> Result<ApprovalRequest, WorkflowError>;

    async fn get(&self, id: i64) -> Result<Option<ApprovalRequest>, WorkflowError>;

    /// Most recent first.
    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<ApprovalRequest>, WorkflowError>;

    /// CAS on revision; false when another writer won.
    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &ApprovalRequest,
    ) -> Result<bool, WorkflowError>;
}

/// In-memory store used by tests and the default server mode.
#[derive(Default)]
pub struct MemoryApprovalStore {
    inner: DashMap<i64, ApprovalRequest>,
    next_id: AtomicI64,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ApprovalStore for MemoryApprovalStore {
    async fn create(&self, mut request: ApprovalRequest) -> Result<ApprovalRequest, WorkflowError> {
        request.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: i64) -> Result<Option<ApprovalRequest>, WorkflowError> {
        Ok(self.inner.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        let mut requests: Vec<ApprovalRequest> = self
            .inner
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &ApprovalRequest,
    ) -> Result<bool, WorkflowError> {
        match self.inner.get_mut(&updated.id) {
            Some(mut entry) => {
                if entry.revision != expected_revision {
                    return Ok(false);
                }
                *entry = updated.clone();
                Ok(true)
            }
            None => Err(WorkflowError::NotFound(format!("request #{}", updated.id))),
        }
    }
}
