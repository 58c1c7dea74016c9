//! Append-only audit trail.
//!
//! Exactly one record per status transition (`created`, `committed`,
//! `rejected`, `rolled_back`), written in the same store write as the
//! transition. Records are never updated or deleted.

pub mod recorder;
pub mod trail;
pub mod types;

pub use recorder::AuditRecorder;
pub use trail::AuditTrail;
pub use types::{AuditEventType, AuditRecord};
