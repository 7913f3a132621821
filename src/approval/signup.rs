//! Signup Requests
//!
//! Self-service tenant signups reuse the approval lifecycle: a request
//! sits Pending until a platform operator reviews it. Approval
//! provisions the tenant (company, admin account) BEFORE the Approved
//! status is committed, mirroring the entity-effect ordering of
//! [`super::coordinator::ApprovalCoordinator`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::status::ApprovalStatus;
use crate::core_types::{Actor, Role, UserRef};
use crate::error::WorkflowError;
use crate::events::{CacheKey, EventBus};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSignup {
    pub company_name: String,
    pub admin_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub id: i64,
    pub company_name: String,
    pub admin_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub plan: Option<String>,
    pub username: String,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl SignupRequest {
    pub fn new(id: i64, req: CreateSignup, now: DateTime<Utc>) -> Result<Self, WorkflowError> {
        for (field, value) in [
            ("company_name", &req.company_name),
            ("admin_name", &req.admin_name),
            ("email", &req.email),
            ("username", &req.username),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::ValidationError(format!(
                    "{field} is required"
                )));
            }
        }
        Ok(Self {
            id,
            company_name: req.company_name,
            admin_name: req.admin_name,
            email: req.email,
            phone: req.phone,
            plan: req.plan,
            username: req.username,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            reviewed_by: None,
            created_at: now,
            reviewed_at: None,
            revision: 0,
        })
    }

    fn require_pending(&self, action: &str) -> Result<(), WorkflowError> {
        if self.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidTransition(format!(
                "cannot {} a signup already {}",
                action, self.status
            )));
        }
        Ok(())
    }

    pub fn apply_approve(
        &mut self,
        reviewer: UserRef,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.require_pending("approve")?;
        self.status = ApprovalStatus::Approved;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.revision += 1;
        Ok(())
    }

    pub fn apply_reject(
        &mut self,
        reviewer: UserRef,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        self.require_pending("reject")?;
        if reason.trim().is_empty() {
            return Err(WorkflowError::ValidationError(
                "a rejection reason is required".to_string(),
            ));
        }
        self.status = ApprovalStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.revision += 1;
        Ok(())
    }
}

/// Creates the tenant behind an approved signup: the company record and
/// its first admin account.
#[async_trait]
pub trait TenantProvisioner: Send + Sync {
    async fn provision(&self, signup: &SignupRequest) -> Result<(), WorkflowError>;
}

#[async_trait]
pub trait SignupStore: Send + Sync {
    async fn create(&self, request: SignupRequest) -> Result<SignupRequest, WorkflowError>;

    async fn get(&self, id: i64) -> Result<Option<SignupRequest>, WorkflowError>;

    /// Most recent first.
    async fn list(&self) -> Result<Vec<SignupRequest>, WorkflowError>;

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &SignupRequest,
    ) -> Result<bool, WorkflowError>;
}

#[derive(Default)]
pub struct MemorySignupStore {
    requests: DashMap<i64, SignupRequest>,
    next_id: AtomicI64,
}

impl MemorySignupStore {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SignupStore for MemorySignupStore {
    async fn create(&self, mut request: SignupRequest) -> Result<SignupRequest, WorkflowError> {
        request.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: i64) -> Result<Option<SignupRequest>, WorkflowError> {
        Ok(self.requests.get(&id).map(|r| r.clone()))
    }

    async fn list(&self) -> Result<Vec<SignupRequest>, WorkflowError> {
        let mut all: Vec<SignupRequest> = self.requests.iter().map(|r| r.clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn update_if(
        &self,
        expected_revision: u64,
        updated: &SignupRequest,
    ) -> Result<bool, WorkflowError> {
        match self.requests.get_mut(&updated.id) {
            Some(mut entry) if entry.revision == expected_revision => {
                *entry = updated.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(WorkflowError::NotFound(format!("signup request {}", updated.id))),
        }
    }
}

pub struct SignupCoordinator {
    store: Arc<dyn SignupStore>,
    provisioner: Arc<dyn TenantProvisioner>,
    events: EventBus,
}

impl SignupCoordinator {
    pub fn new(
        store: Arc<dyn SignupStore>,
        provisioner: Arc<dyn TenantProvisioner>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            provisioner,
            events,
        }
    }

    /// File a signup. Unauthenticated: there is no tenant yet.
    pub async fn create(&self, req: CreateSignup) -> Result<SignupRequest, WorkflowError> {
        let request = SignupRequest::new(0, req, Utc::now())?;
        let request = self.store.create(request).await?;

        info!(
            signup_id = request.id,
            company = %request.company_name,
            "Signup request filed"
        );
        self.events.publish(vec![CacheKey::SignupRequests]);
        Ok(request)
    }

    pub async fn get(&self, actor: &Actor, id: i64) -> Result<SignupRequest, WorkflowError> {
        self.require_operator(actor)?;
        self.store
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("signup request {id}")))
    }

    /// Signups predate any tenant, so only platform operators see them.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<SignupRequest>, WorkflowError> {
        self.require_operator(actor)?;
        self.store.list().await
    }

    /// Provision the tenant, then commit Approved.
    pub async fn approve(&self, actor: &Actor, id: i64) -> Result<SignupRequest, WorkflowError> {
        let request = self.get(actor, id).await?;
        let mut updated = request.clone();
        updated.apply_approve(actor.user_ref(), Utc::now())?;

        if let Err(e) = self.provisioner.provision(&request).await {
            error!(signup_id = id, error = %e, "Tenant provisioning failed; signup stays pending");
            return Err(WorkflowError::DependencyFailure(e.to_string()));
        }

        self.commit(&request, &updated).await?;
        info!(signup_id = id, company = %updated.company_name, "Signup approved");
        self.events
            .publish(vec![CacheKey::SignupRequest(id), CacheKey::SignupRequests]);
        Ok(updated)
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        id: i64,
        reason: String,
    ) -> Result<SignupRequest, WorkflowError> {
        let request = self.get(actor, id).await?;
        let mut updated = request.clone();
        updated.apply_reject(actor.user_ref(), reason, Utc::now())?;
        self.commit(&request, &updated).await?;

        info!(signup_id = id, "Signup rejected");
        self.events
            .publish(vec![CacheKey::SignupRequest(id), CacheKey::SignupRequests]);
        Ok(updated)
    }

    fn require_operator(&self, actor: &Actor) -> Result<(), WorkflowError> {
        if actor.role != Role::DevAdmin {
            return Err(WorkflowError::Unauthorized);
        }
        Ok(())
    }

    async fn commit(
        &self,
        before: &SignupRequest,
        after: &SignupRequest,
    ) -> Result<(), WorkflowError> {
        if self.store.update_if(before.revision, after).await? {
            return Ok(());
        }
        warn!(signup_id = after.id, "Lost review race on signup request");
        Err(WorkflowError::InvalidTransition(
            "signup was reviewed concurrently".to_string(),
        ))
    }
}

/// Mock provisioner for tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;

    #[derive(Default)]
    pub struct MockProvisioner {
        provisioned: Mutex<Vec<String>>,
        fail_provision: AtomicBool,
    }

    impl MockProvisioner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_provision(&self, fail: bool) {
            self.fail_provision.store(fail, Ordering::SeqCst);
        }

        pub fn provisioned(&self) -> Vec<String> {
            self.provisioned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TenantProvisioner for MockProvisioner {
        async fn provision(&self, signup: &SignupRequest) -> Result<(), WorkflowError> {
            if self.fail_provision.load(Ordering::SeqCst) {
                return Err(WorkflowError::DependencyFailure(
                    "identity service unavailable".to_string(),
                ));
            }
            self.provisioned
                .lock()
                .unwrap()
                .push(signup.company_name.clone());
            Ok(())
        }
    }
}
