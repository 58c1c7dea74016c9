//! Public ledger engine.
//!
//! [`LedgerEngine`] is the single entry point callers use: it authorizes the
//! caller's company, routes creates through the coordinator, rollbacks
//! through the rollback engine, and exposes group, audit and balance queries.

mod service;
mod types;

#[cfg(test)]
mod tests;

pub use service::LedgerEngine;
pub use types::{
    BalanceVerification, BatchResult, CreateTransactionResponse, GroupSummary, RollbackResponse,
    TransactionDetails,
};
