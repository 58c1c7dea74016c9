//! Atomic transaction coordination.
//!
//! Turns a validated request into one atomic store write, retrying bounded
//! times on optimistic-concurrency conflicts.

mod config;
mod service;
mod staging;
mod types;


pub use config::CoordinatorConfig;
pub use service::{Prepared, TransactionCoordinator};
pub use staging::stage;
pub use types::{CommitOutcome, Compensates, Submission};
