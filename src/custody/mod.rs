//! Document Custody Module
//!
//! Tracks handovers of physical and digital documents between users.
//! A transfer is a small FSM:
//!
//! ```text
//!              Pending
//!             /   |   \
//!      Accepted Rejected Cancelled
//!         |
//!   (physical only, unordered delivery log)
//!   Dispatched / InTransit / OutForDelivery / Delivered / Returned / Held
//! ```
//!
//! Rejected and Cancelled are terminal. Dispatching a still-pending
//! physical transfer implies acceptance. Every committed transition
//! bumps the record's revision; concurrent writers race through a CAS
//! and exactly one wins.

pub mod coordinator;
pub mod pg;
pub mod status;
pub mod store;
pub mod timeline;
pub mod types;

// Re-exports for convenience
pub use coordinator::{CustodyCoordinator, DocumentCustody};
pub use pg::PgTransferStore;
pub use status::{CustodyStatus, DeliveryStatus};
pub use store::{MemoryTransferStore, TransferFilter, TransferStore};
pub use timeline::{TICKET_CREATED, TimelineEvent};
pub use types::{
    Checkpoint, CreateTransfer, DeliveryUpdate, Transfer, TransferId, TransferKind,
};
