//! Approval Workflow Module
//!
//! Destructive changes (deletes, sensitive edits) are not applied
//! directly: they are filed as requests that an admin reviews.
//!
//! ```text
//!        Pending
//!        /     \
//!   Approved  Rejected   (both terminal)
//! ```
//!
//! Approval applies the entity effect BEFORE committing the status, so
//! an Approved record always means the effect actually happened. Tenant
//! signups ([`signup`]) reuse the same lifecycle with provisioning as
//! the effect.

pub mod coordinator;
pub mod effector;
pub mod pg;
pub mod signup;
pub mod status;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use coordinator::ApprovalCoordinator;
pub use effector::EntityEffector;
pub use pg::PgApprovalStore;
pub use signup::{
    CreateSignup, MemorySignupStore, SignupCoordinator, SignupRequest, SignupStore,
    TenantProvisioner,
};
pub use status::ApprovalStatus;
pub use store::{ApprovalFilter, ApprovalStore, MemoryApprovalStore};
pub use types::{ApprovalAction, ApprovalRequest, CreateApproval};
