//! Store error types.

use accord_shared::types::{AccountId, GroupId, TransactionId};
use thiserror::Error;

use crate::ledger::error::LedgerError;
use crate::ledger::types::TransactionStatus;

/// Errors returned by a [`LedgerStore`](super::LedgerStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An account changed since it was read (optimistic concurrency).
    #[error("account {account_id} was modified concurrently")]
    Conflict {
        /// The account whose version did not match.
        account_id: AccountId,
    },

    /// A transaction was not in the status the write required.
    #[error("transaction {transaction_id} is {actual}, expected {expected}")]
    StatusMismatch {
        /// The transaction checked.
        transaction_id: TransactionId,
        /// The required status.
        expected: TransactionStatus,
        /// The status found.
        actual: TransactionStatus,
    },

    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The group is closed to new members.
    #[error("group {0} is closed")]
    GroupClosed(GroupId),

    /// A unique constraint was violated.
    #[error("{0} already exists")]
    Duplicate(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true for optimistic-concurrency conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::GroupClosed(id) => LedgerError::GroupClosed(id),
            other => LedgerError::Storage(other.to_string()),
        }
    }
}
