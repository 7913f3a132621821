//! CustodyFlow server entry point.
//!
//! Wires the workflow coordinators to either in-memory stores (dev) or
//! PostgreSQL (when `postgres_url` is configured) and serves the HTTP
//! gateway. Dev mode injects a fixed platform-operator actor; real
//! deployments replace that layer with session auth.

use std::sync::Arc;

use axum::Extension;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};

use custodyflow::approval::{
    ApprovalCoordinator, ApprovalRequest, MemoryApprovalStore, MemorySignupStore, PgApprovalStore,
    SignupCoordinator, SignupRequest, TenantProvisioner,
};
use custodyflow::config::AppConfig;
use custodyflow::core_types::{Actor, DocumentId, Role, UserRef};
use custodyflow::custody::{
    CustodyCoordinator, DocumentCustody, MemoryTransferStore, PgTransferStore, TransferId,
};
use custodyflow::error::WorkflowError;
use custodyflow::events::EventBus;
use custodyflow::gateway::{self, AppState};
use custodyflow::logging::init_logging;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Dev-mode document ledger: logs reassignments instead of calling the
/// document service.
struct LoggingCustody;

#[async_trait::async_trait]
impl DocumentCustody for LoggingCustody {
    async fn reassign(
        &self,
        transfer_id: TransferId,
        documents: &[DocumentId],
        new_holder: &UserRef,
    ) -> Result<(), WorkflowError> {
        info!(
            transfer_id = %transfer_id,
            count = documents.len(),
            "Documents reassigned to {}", new_holder
        );
        Ok(())
    }
}

/// Dev-mode effector: logs the entity change instead of applying it.
struct LoggingEffector;

#[async_trait::async_trait]
impl custodyflow::approval::EntityEffector for LoggingEffector {
    async fn apply(&self, request: &ApprovalRequest) -> Result<(), WorkflowError> {
        info!(request_id = request.id, "Entity effect applied: {}", request);
        Ok(())
    }
}

/// Dev-mode provisioner: logs the tenant instead of creating it.
struct LoggingProvisioner;

#[async_trait::async_trait]
impl TenantProvisioner for LoggingProvisioner {
    async fn provision(&self, signup: &SignupRequest) -> Result<(), WorkflowError> {
        info!(
            signup_id = signup.id,
            company = %signup.company_name,
            "Tenant provisioned"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = init_logging(&config);

    info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "CustodyFlow starting"
    );

    let events = EventBus::new(config.event_capacity);

    let (custody, approvals, signups) = match &config.postgres_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .unwrap_or_else(|e| panic!("Failed to connect to PostgreSQL: {}", e));
            custodyflow::custody::pg::ensure_schema(&pool)
                .await
                .unwrap_or_else(|e| panic!("Failed to ensure custody schema: {}", e));
            custodyflow::approval::pg::ensure_schema(&pool)
                .await
                .unwrap_or_else(|e| panic!("Failed to ensure approval schema: {}", e));
            info!("PostgreSQL stores initialized");

            (
                CustodyCoordinator::new(
                    Arc::new(PgTransferStore::new(pool.clone())),
                    Arc::new(LoggingCustody),
                    events.clone(),
                ),
                ApprovalCoordinator::new(
                    Arc::new(PgApprovalStore::new(pool)),
                    Arc::new(LoggingEffector),
                    events.clone(),
                ),
                SignupCoordinator::new(
                    // Signups stay in memory until the identity service lands.
                    Arc::new(MemorySignupStore::new()),
                    Arc::new(LoggingProvisioner),
                    events.clone(),
                ),
            )
        }
        None => {
            warn!("No postgres_url configured; using in-memory stores");
            (
                CustodyCoordinator::new(
                    Arc::new(MemoryTransferStore::new()),
                    Arc::new(LoggingCustody),
                    events.clone(),
                ),
                ApprovalCoordinator::new(
                    Arc::new(MemoryApprovalStore::new()),
                    Arc::new(LoggingEffector),
                    events.clone(),
                ),
                SignupCoordinator::new(
                    Arc::new(MemorySignupStore::new()),
                    Arc::new(LoggingProvisioner),
                    events.clone(),
                ),
            )
        }
    };

    let state = Arc::new(AppState {
        custody,
        approvals,
        signups,
    });

    // Dev actor; production swaps this for session auth middleware.
    let dev_actor = Actor::new(1, "dev", Role::DevAdmin, "platform");
    let app = gateway::router(state).layer(Extension(dev_actor));

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));
    info!("Gateway listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("FATAL: Server error: {}", e);
        std::process::exit(1);
    }
}
