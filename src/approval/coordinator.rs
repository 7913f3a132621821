//! Approval Coordinator
//!
//! Reviews destructive-change requests. Approval applies the requested
//! entity effect BEFORE committing the Approved status: if the effect
//! fails, the request stays Pending and can be retried, so an Approved
//! record always means the effect actually happened.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::effector::EntityEffector;
use super::store::{ApprovalFilter, ApprovalStore};
use super::types::{ApprovalRequest, CreateApproval};
use crate::core_types::{Actor, Role};
use crate::error::WorkflowError;
use crate::events::{CacheKey, EventBus};
use crate::permissions::{ReviewAction, approval_actions};

pub struct ApprovalCoordinator {
    store: Arc<dyn ApprovalStore>,
    effector: Arc<dyn EntityEffector>,
    events: EventBus,
}

impl ApprovalCoordinator {
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        effector: Arc<dyn EntityEffector>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            effector,
            events,
        }
    }

    /// File a request; the actor is the requester.
    pub async fn create(
        &self,
        actor: &Actor,
        req: CreateApproval,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let request = ApprovalRequest::new(
            0, // assigned by the store
            actor.user_ref(),
            actor.company_id.clone(),
            req,
            Utc::now(),
        )?;
        let request = self.store.create(request).await?;

        info!(request_id = request.id, "Approval request filed: {}", request);
        self.events.publish(vec![CacheKey::ApprovalRequests]);
        Ok(request)
    }

    /// Load a request the actor is allowed to see.
    pub async fn get(&self, actor: &Actor, id: i64) -> Result<ApprovalRequest, WorkflowError> {
        let request = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("approval request {id}")))?;

        let own = actor.id == request.requested_by.id;
        if !own && !(actor.is_admin() && actor.can_see_company(&request.company_id)) {
            return Err(WorkflowError::NotFound(format!("approval request {id}")));
        }
        Ok(request)
    }

    /// List requests visible to the actor: admins see their tenant's
    /// queue (dev admins all tenants), employees only their own filings.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        let filter = match actor.role {
            Role::DevAdmin => ApprovalFilter::default(),
            Role::CompanyAdmin => ApprovalFilter {
                company_id: Some(actor.company_id.clone()),
                ..Default::default()
            },
            Role::Employee => ApprovalFilter {
                company_id: Some(actor.company_id.clone()),
                requested_by: Some(actor.id),
                ..Default::default()
            },
        };
        self.store.list(&filter).await
    }

    /// Number of Pending requests in the actor's review queue.
    pub async fn pending_count(&self, actor: &Actor) -> Result<usize, WorkflowError> {
        let pending = self
            .list(actor)
            .await?
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .count();
        Ok(pending)
    }

    /// Approve: apply the entity effect, then commit the status.
    pub async fn approve(
        &self,
        actor: &Actor,
        id: i64,
        note: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let request = self.get(actor, id).await?;
        self.authorize_review(actor, &request, ReviewAction::Approve)?;
        // Reject illegal states before touching the effector.
        let mut updated = request.clone();
        updated.apply_approve(actor.user_ref(), note, Utc::now())?;

        if let Err(e) = self.effector.apply(&request).await {
            // Effect failed, so the request must remain Pending.
            error!(request_id = id, error = %e, "Entity effect failed; request stays pending");
            return Err(WorkflowError::DependencyFailure(e.to_string()));
        }

        self.commit(&request, &updated).await?;
        info!(request_id = id, reviewer = %actor.name, "Approval request approved");
        self.events
            .publish(vec![CacheKey::ApprovalRequest(id), CacheKey::ApprovalRequests]);
        Ok(updated)
    }

    /// Reject with a mandatory note; no entity effect runs.
    pub async fn reject(
        &self,
        actor: &Actor,
        id: i64,
        note: String,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let request = self.get(actor, id).await?;
        self.authorize_review(actor, &request, ReviewAction::Reject)?;

        let mut updated = request.clone();
        updated.apply_reject(actor.user_ref(), note, Utc::now())?;
        self.commit(&request, &updated).await?;

        info!(request_id = id, reviewer = %actor.name, "Approval request rejected");
        self.events
            .publish(vec![CacheKey::ApprovalRequest(id), CacheKey::ApprovalRequests]);
        Ok(updated)
    }

    fn authorize_review(
        &self,
        actor: &Actor,
        request: &ApprovalRequest,
        action: ReviewAction,
    ) -> Result<(), WorkflowError> {
        if approval_actions(actor, request).contains(&action) {
            return Ok(());
        }
        // Non-admins (including the requester) may never review; an
        // admin on an already-resolved request falls through to the
        // state check in apply_approve/apply_reject.
        if actor.is_admin() && actor.can_see_company(&request.company_id) {
            return Ok(());
        }
        Err(WorkflowError::Unauthorized)
    }

    async fn commit(
        &self,
        before: &ApprovalRequest,
        after: &ApprovalRequest,
    ) -> Result<(), WorkflowError> {
        if self.store.update_if(before.revision, after).await? {
            return Ok(());
        }
        warn!(request_id = after.id, "Lost review race on approval request");
        Err(WorkflowError::InvalidTransition(
            "request was reviewed concurrently".to_string(),
        ))
    }
}
