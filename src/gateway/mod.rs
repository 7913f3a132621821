//! HTTP Gateway
//!
//! Axum router over the workflow coordinators. Handlers expect an
//! [`Actor`](crate::core_types::Actor) extension describing the acting
//! user; in dev mode [`crate::main`] injects a fixed actor, in
//! production an auth middleware resolves it from the session.

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::approval::{ApprovalCoordinator, SignupCoordinator};
use crate::custody::CustodyCoordinator;

pub use types::ApiResponse;

/// Shared handler state: one coordinator per workflow.
pub struct AppState {
    pub custody: CustodyCoordinator,
    pub approvals: ApprovalCoordinator,
    pub signups: SignupCoordinator,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let transfer_routes = Router::new()
        .route("/", post(handlers::create_transfer).get(handlers::list_transfers))
        .route("/{id}", get(handlers::get_transfer))
        .route("/{id}/timeline", get(handlers::get_timeline))
        .route("/{id}/accept", post(handlers::accept_transfer))
        .route("/{id}/reject", post(handlers::reject_transfer))
        .route("/{id}/cancel", post(handlers::cancel_transfer))
        .route("/{id}/delivery", post(handlers::update_delivery));

    let approval_routes = Router::new()
        .route("/", post(handlers::create_approval).get(handlers::list_approvals))
        .route("/pending-count", get(handlers::pending_approvals))
        .route("/{id}", get(handlers::get_approval))
        .route("/{id}/approve", post(handlers::approve_request))
        .route("/{id}/reject", post(handlers::reject_request));

    let signup_routes = Router::new()
        .route("/", post(handlers::create_signup).get(handlers::list_signups))
        .route("/{id}/approve", post(handlers::approve_signup))
        .route("/{id}/reject", post(handlers::reject_signup));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/transfers", transfer_routes)
        .nest("/api/v1/approval-requests", approval_routes)
        .nest("/api/v1/signup-requests", signup_routes)
        .with_state(state)
}
