//! Core ledger engine for Accord.
//!
//! Everything that decides whether money moves lives here: posting
//! validation, the commit coordinator, rollback by compensation, transaction
//! groups and the audit trail. Persistence sits behind the [`store::LedgerStore`]
//! trait; an in-memory implementation ships with the crate and the PostgreSQL
//! one lives in `accord-db`.
//!
//! # Modules
//!
//! - `ledger` - Domain types, validation rules and balance arithmetic
//! - `coordinator` - Atomic commit with optimistic-concurrency retry
//! - `rollback` - Compensating transactions
//! - `group` - Non-atomic transaction groups
//! - `audit` - Append-only audit records
//! - `store` - Storage abstraction and the in-memory store
//! - `engine` - Facade over all of the above

pub mod audit;
pub mod coordinator;
pub mod engine;
pub mod group;
pub mod ledger;
pub mod rollback;
pub mod store;

pub use engine::LedgerEngine;
pub use ledger::error::LedgerError;
pub use store::{LedgerStore, MemoryLedgerStore, StoreError};
