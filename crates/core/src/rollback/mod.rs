//! Rollback by compensation.
//!
//! Committed postings are never edited or deleted. A rollback commits a
//! mirrored transaction and links it to the original.

pub mod compensation;
pub mod service;

#[cfg(test)]
mod compensation_props;

pub use compensation::{Compensation, CompensationBuilder, REVERSAL_PREFIX};
pub use service::{RollbackEngine, RollbackOutcome};
