//! Double-entry bookkeeping logic.
//!
//! This module implements the pure ledger rules:
//! - Domain types for transactions, journal entries and postings
//! - Typed transaction metadata
//! - Posting validation (structure, balance, authorization)
//! - Balance calculations
//! - The transaction status state machine
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod lifecycle;
pub mod metadata;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, RunningBalance, derive_balances};
pub use error::{ErrorKind, LedgerError};
pub use lifecycle::{StatusChange, TransactionLifecycle};
pub use metadata::{CrossCompanyTransfer, TransactionMetadata};
pub use types::{
    AccountSnapshot, CallerContext, CreateTransactionInput, JournalEntry, JournalEntryInput,
    LedgerTransaction, NewAccount, Posting, PostingInput, TransactionStatus, TransactionTotals,
};
pub use validation::{EntryValidationResult, PostingValidator, ValidatedTransaction, ValidationReport};
