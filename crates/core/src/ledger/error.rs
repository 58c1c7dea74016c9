//! Ledger error types.
//!
//! This module defines all errors that can occur during ledger operations:
//! validation, authorization, concurrency, storage, rollback and lookup.

use std::time::Duration;

use accord_shared::AppError;
use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::TransactionStatus;

/// Coarse error category, used for reporting and mapping to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unbalanced request.
    Validation,
    /// Account or company outside the caller's authority.
    Authorization,
    /// Concurrent write collision.
    Conflict,
    /// Store unavailable, failed, or timed out.
    Storage,
    /// Rollback precondition not met.
    Rollback,
    /// Referenced entity does not exist.
    NotFound,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction has no journal entries.
    #[error("Transaction must have at least one journal entry")]
    NoEntries,

    /// Journal entry has no posting lines.
    #[error("Journal entry {entry} must have at least one posting")]
    EmptyEntry {
        /// Index of the journal entry.
        entry: usize,
    },

    /// Posting amount is negative.
    #[error("Posting {line} of journal entry {entry} has a negative amount")]
    NegativeAmount {
        /// Index of the journal entry.
        entry: usize,
        /// Index of the line within the entry.
        line: usize,
    },

    /// Posting has neither a debit nor a credit.
    #[error("Posting {line} of journal entry {entry} has neither a debit nor a credit")]
    ZeroPosting {
        /// Index of the journal entry.
        entry: usize,
        /// Index of the line within the entry.
        line: usize,
    },

    /// Posting has both a debit and a credit.
    #[error("Posting {line} of journal entry {entry} has both a debit and a credit")]
    BothSidesPosted {
        /// Index of the journal entry.
        entry: usize,
        /// Index of the line within the entry.
        line: usize,
    },

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Journal entry is not balanced (debits != credits).
    #[error(
        "Journal entry {entry} is not balanced. Debit: {total_debit}, Credit: {total_credit}"
    )]
    Unbalanced {
        /// Index of the journal entry.
        entry: usize,
        /// Total debit amount of the entry.
        total_debit: Decimal,
        /// Total credit amount of the entry.
        total_credit: Decimal,
    },

    /// A journal entry's debit or credit sum exceeds the representable range.
    #[error("Amounts of journal entry {entry} exceed the supported range")]
    AmountOverflow {
        /// Index of the journal entry.
        entry: usize,
    },

    /// Applying the postings would push an account balance out of range.
    #[error("Balance of account {0} would exceed the supported range")]
    BalanceOverflow(AccountId),

    // ========== Authorization Errors ==========
    /// Caller acted for a company other than its own.
    #[error("Caller for company {caller} cannot act for company {requested}")]
    Forbidden {
        /// The caller's company.
        caller: CompanyId,
        /// The company named in the request.
        requested: CompanyId,
    },

    /// Account belongs to another company and no cross-company transfer is authorized.
    #[error("Account {account_id} belongs to company {account_company}, not {request_company}")]
    CompanyMismatch {
        /// The offending account.
        account_id: AccountId,
        /// The account's owning company.
        account_company: CompanyId,
        /// The company named in the request.
        request_company: CompanyId,
    },

    /// Cross-company transfer is authorized, but not for this account's company.
    #[error("Company {company_id} (account {account_id}) is not in the cross-company allow-list")]
    CrossCompanyNotAllowed {
        /// The offending account.
        account_id: AccountId,
        /// The account's owning company.
        company_id: CompanyId,
    },

    // ========== Concurrency Errors ==========
    /// Write conflict persisted after all retries.
    #[error("Concurrent modification detected after {attempts} attempts, please retry")]
    Conflict {
        /// Number of commit attempts made.
        attempts: u32,
    },

    // ========== Storage Errors ==========
    /// Store failed or is unavailable.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Commit attempt exceeded the configured timeout.
    #[error("Commit timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    // ========== Rollback Errors ==========
    /// Transaction was already rolled back.
    #[error("Transaction {0} has already been rolled back")]
    AlreadyRolledBack(TransactionId),

    /// Transaction is not completed and cannot be rolled back.
    #[error("Transaction {id} is {status}, only completed transactions can be rolled back")]
    NotCompleted {
        /// The transaction ID.
        id: TransactionId,
        /// Its current status.
        status: TransactionStatus,
    },

    /// Compensating transactions are not themselves reversible.
    #[error("Transaction {0} is a compensating transaction and cannot be rolled back")]
    CompensationNotReversible(TransactionId),

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: TransactionStatus,
        /// The attempted target status.
        to: TransactionStatus,
    },

    // ========== Lookup Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction group not found.
    #[error("Transaction group not found: {0}")]
    GroupNotFound(GroupId),

    /// A group with this name already exists for the company.
    #[error("Transaction group '{0}' already exists")]
    DuplicateGroup(String),

    /// Group is closed to new members.
    #[error("Transaction group {0} is closed")]
    GroupClosed(GroupId),

    /// Group name is empty.
    #[error("Transaction group name is required")]
    GroupNameRequired,

    /// Time range is empty or inverted.
    #[error("Invalid time range: start must be before end")]
    InvalidTimeRange,
}

impl LedgerError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoEntries
            | Self::EmptyEntry { .. }
            | Self::NegativeAmount { .. }
            | Self::ZeroPosting { .. }
            | Self::BothSidesPosted { .. }
            | Self::AccountNotFound(_)
            | Self::Unbalanced { .. }
            | Self::AmountOverflow { .. }
            | Self::BalanceOverflow(_)
            | Self::DuplicateGroup(_)
            | Self::GroupClosed(_)
            | Self::GroupNameRequired
            | Self::InvalidTimeRange => ErrorKind::Validation,
            Self::Forbidden { .. }
            | Self::CompanyMismatch { .. }
            | Self::CrossCompanyNotAllowed { .. } => ErrorKind::Authorization,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage(_) | Self::Timeout(_) => ErrorKind::Storage,
            Self::AlreadyRolledBack(_)
            | Self::NotCompleted { .. }
            | Self::CompensationNotReversible(_)
            | Self::InvalidTransition { .. } => ErrorKind::Rollback,
            Self::TransactionNotFound(_) | Self::GroupNotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoEntries => "NO_ENTRIES",
            Self::EmptyEntry { .. } => "EMPTY_ENTRY",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::ZeroPosting { .. } => "ZERO_POSTING",
            Self::BothSidesPosted { .. } => "BOTH_SIDES_POSTED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Unbalanced { .. } => "UNBALANCED_TRANSACTION",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::CompanyMismatch { .. } => "COMPANY_MISMATCH",
            Self::CrossCompanyNotAllowed { .. } => "CROSS_COMPANY_NOT_ALLOWED",
            Self::Conflict { .. } => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Timeout(_) => "COMMIT_TIMEOUT",
            Self::AlreadyRolledBack(_) => "ALREADY_ROLLED_BACK",
            Self::NotCompleted { .. } => "NOT_COMPLETED",
            Self::CompensationNotReversible(_) => "COMPENSATION_NOT_REVERSIBLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::DuplicateGroup(_) => "DUPLICATE_GROUP",
            Self::GroupClosed(_) => "GROUP_CLOSED",
            Self::GroupNameRequired => "GROUP_NAME_REQUIRED",
            Self::InvalidTimeRange => "INVALID_TIME_RANGE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) | Self::GroupNotFound(_) => {
                404
            }

            // 400 Bad Request - validation errors
            _ if self.kind() == ErrorKind::Validation => 400,

            // 403 Forbidden - authorization errors
            Self::Forbidden { .. }
            | Self::CompanyMismatch { .. }
            | Self::CrossCompanyNotAllowed { .. } => 403,

            // 409 Conflict - concurrency and state errors
            Self::Conflict { .. }
            | Self::AlreadyRolledBack(_)
            | Self::NotCompleted { .. }
            | Self::CompensationNotReversible(_)
            | Self::InvalidTransition { .. } => 409,

            // 503 / 504 - storage
            Self::Timeout(_) => 504,
            _ => 503,
        }
    }

    /// Returns true if this error is retried inside the coordinator.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the debit/credit totals carried by an unbalanced error.
    #[must_use]
    pub fn unbalanced_totals(&self) -> Option<(Decimal, Decimal)> {
        match self {
            Self::Unbalanced {
                total_debit,
                total_credit,
                ..
            } => Some((*total_debit, *total_credit)),
            _ => None,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Authorization => Self::Forbidden(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Storage => Self::Storage(message),
            ErrorKind::Rollback => Self::BusinessRule(message),
            ErrorKind::NotFound => Self::NotFound(message),
        }
    }
}
