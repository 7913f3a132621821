//! Gateway Handlers
//!
//! HTTP handlers for the custody, approval and signup workflows. The
//! acting user arrives as an [`Actor`] extension injected by the auth
//! middleware.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::types::{ApiResult, fail, ok};
use crate::approval::{ApprovalRequest, CreateApproval, CreateSignup, SignupRequest};
use crate::core_types::{Actor, UserId};
use crate::custody::{
    CreateTransfer, DeliveryUpdate, Transfer, TransferId, TransferKind, TimelineEvent,
};

/// Transfer plus the single status label clients display.
#[derive(Debug, Serialize)]
pub struct TransferView {
    pub status: &'static str,
    #[serde(flatten)]
    pub transfer: Transfer,
}

impl From<Transfer> for TransferView {
    fn from(transfer: Transfer) -> Self {
        Self {
            status: transfer.wire_status(),
            transfer,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferListParams {
    pub kind: Option<TransferKind>,
    pub participant: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub pending: usize,
}

// ============================================================================
// Transfers
// ============================================================================

/// POST /api/v1/transfers
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateTransfer>,
) -> ApiResult<TransferView> {
    match state.custody.create(&actor, payload).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/transfers
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<TransferListParams>,
) -> ApiResult<Vec<TransferView>> {
    match state
        .custody
        .list(&actor, params.kind, params.participant)
        .await
    {
        Ok(transfers) => ok(transfers.into_iter().map(TransferView::from).collect()),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/transfers/{id}
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
) -> ApiResult<TransferView> {
    match state.custody.get(&actor, id).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/transfers/{id}/timeline
pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
) -> ApiResult<Vec<TimelineEvent>> {
    match state.custody.timeline(&actor, id).await {
        Ok(events) => ok(events),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/transfers/{id}/accept
pub async fn accept_transfer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
) -> ApiResult<TransferView> {
    match state.custody.accept(&actor, id).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/transfers/{id}/reject
pub async fn reject_transfer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
) -> ApiResult<TransferView> {
    match state.custody.reject(&actor, id).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/transfers/{id}/cancel
pub async fn cancel_transfer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
) -> ApiResult<TransferView> {
    match state.custody.cancel(&actor, id).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/transfers/{id}/delivery
pub async fn update_delivery(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TransferId>,
    Json(payload): Json<DeliveryUpdate>,
) -> ApiResult<TransferView> {
    match state.custody.update_delivery(&actor, id, payload).await {
        Ok(transfer) => ok(transfer.into()),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Approval Requests
// ============================================================================

/// POST /api/v1/approval-requests
pub async fn create_approval(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateApproval>,
) -> ApiResult<ApprovalRequest> {
    match state.approvals.create(&actor, payload).await {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/approval-requests
pub async fn list_approvals(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Vec<ApprovalRequest>> {
    match state.approvals.list(&actor).await {
        Ok(requests) => ok(requests),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/approval-requests/pending-count
pub async fn pending_approvals(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<PendingCount> {
    match state.approvals.pending_count(&actor).await {
        Ok(pending) => ok(PendingCount { pending }),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/approval-requests/{id}
pub async fn get_approval(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<ApprovalRequest> {
    match state.approvals.get(&actor, id).await {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/approval-requests/{id}/approve
pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> ApiResult<ApprovalRequest> {
    match state.approvals.approve(&actor, id, payload.note).await {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/approval-requests/{id}/reject
pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> ApiResult<ApprovalRequest> {
    match state
        .approvals
        .reject(&actor, id, payload.note.unwrap_or_default())
        .await
    {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Signup Requests
// ============================================================================

/// POST /api/v1/signup-requests (unauthenticated)
pub async fn create_signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSignup>,
) -> ApiResult<SignupRequest> {
    match state.signups.create(payload).await {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/signup-requests
pub async fn list_signups(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Vec<SignupRequest>> {
    match state.signups.list(&actor).await {
        Ok(requests) => ok(requests),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/signup-requests/{id}/approve
pub async fn approve_signup(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> ApiResult<SignupRequest> {
    match state.signups.approve(&actor, id).await {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// POST /api/v1/signup-requests/{id}/reject
pub async fn reject_signup(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewPayload>,
) -> ApiResult<SignupRequest> {
    match state
        .signups
        .reject(&actor, id, payload.note.unwrap_or_default())
        .await
    {
        Ok(request) => ok(request),
        Err(e) => fail(e),
    }
}

/// GET /api/v1/health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
