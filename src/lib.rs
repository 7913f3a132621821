//! CustodyFlow - Document Workflow Engine
//!
//! State machines for a multi-tenant document management backend:
//! custody transfers between users and approval-gated destructive
//! changes.
//!
//! # Modules
//!
//! - [`core_types`] - Actors, roles and id types
//! - [`error`] - Workflow error kinds and their API mapping
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup
//! - [`events`] - Cache invalidation broadcast bus
//! - [`permissions`] - Pure action-set resolution per actor and record
//! - [`custody`] - Document transfer FSM, delivery log and timeline
//! - [`approval`] - Approval request FSM and tenant signups
//! - [`gateway`] - HTTP API over the coordinators

pub mod config;
pub mod core_types;
pub mod error;
pub mod events;
pub mod logging;
pub mod permissions;

pub mod approval;
pub mod custody;
pub mod gateway;

// Convenient re-exports at crate root
pub use core_types::{Actor, DocumentId, Role, UserId, UserRef};
pub use error::WorkflowError;
pub use events::{CacheKey, EventBus, Invalidation};
