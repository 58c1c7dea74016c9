//! Write-side types handed to the store.

use accord_shared::types::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::audit::types::AuditRecord;
use crate::ledger::types::{JournalEntry, TransactionTotals};

/// New version and balance for one account, guarded by the version read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    /// The account to update.
    pub account_id: AccountId,
    /// Version the staging was computed against.
    pub expected_version: i64,
    /// Version after this commit.
    pub new_version: i64,
    /// Balance after this commit.
    pub new_balance: Decimal,
}

/// Rollback linkage applied in the same write as a compensation commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationLink {
    /// The transaction being rolled back. Must still be `completed`.
    pub original_id: TransactionId,
    /// Timestamp recorded as the original's `rolled_back_at`.
    pub rolled_back_at: DateTime<Utc>,
    /// The original's `rolled_back` audit record.
    pub audit: AuditRecord,
}

/// Everything a commit writes, as one atomic unit.
///
/// A store applies all of it or none of it. Preconditions, checked before
/// anything is written:
/// 1. the transaction is `pending`
/// 2. for compensations, the original is `completed`
/// 3. every account's version equals `expected_version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCommit {
    /// The pending transaction to commit.
    pub transaction_id: TransactionId,
    /// Commit timestamp.
    pub completed_at: DateTime<Utc>,
    /// Journal entries with their postings, versions and running balances.
    pub entries: Vec<JournalEntry>,
    /// One update per touched account.
    pub balance_updates: Vec<BalanceUpdate>,
    /// Transaction totals.
    pub totals: TransactionTotals,
    /// The `committed` audit record.
    pub audit: AuditRecord,
    /// Set when the transaction compensates another one.
    pub compensation: Option<CompensationLink>,
}

impl StagedCommit {
    /// Number of postings across all entries.
    #[must_use]
    pub fn posting_count(&self) -> usize {
        self.entries.iter().map(|e| e.postings.len()).sum()
    }
}
