//! Coordinator input and output.

use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};

use crate::ledger::metadata::TransactionMetadata;
use crate::ledger::types::{JournalEntryInput, TransactionTotals};

/// A transaction handed to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Id assigned to the new transaction.
    pub id: TransactionId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Group recorded on the transaction header.
    pub group_id: Option<GroupId>,
    /// Optional description.
    pub description: Option<String>,
    /// Typed metadata.
    pub metadata: TransactionMetadata,
    /// Journal entries, committed together.
    pub entries: Vec<JournalEntryInput>,
    /// Set when this submission reverses another transaction.
    pub compensates: Option<Compensates>,
}

/// The original side of a compensation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensates {
    /// The transaction being rolled back.
    pub original_id: TransactionId,
    /// Its totals, snapshotted into the `rolled_back` audit record.
    pub original_totals: TransactionTotals,
    /// Why it is rolled back.
    pub reason: Option<String>,
}

impl Submission {
    /// Creates a submission with a fresh transaction id.
    #[must_use]
    pub fn new(company_id: CompanyId, entries: Vec<JournalEntryInput>) -> Self {
        Self {
            id: TransactionId::new(),
            company_id,
            group_id: None,
            description: None,
            metadata: TransactionMetadata::default(),
            entries,
            compensates: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: TransactionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group_id: Option<GroupId>) -> Self {
        self.group_id = group_id;
        self
    }

    /// Marks the submission as the compensation of another transaction.
    #[must_use]
    pub fn compensating(mut self, compensates: Compensates) -> Self {
        self.compensates = Some(compensates);
        self
    }

    /// Distinct accounts referenced, in order of first appearance.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = Vec::new();
        for line in self.entries.iter().flat_map(|e| e.lines.iter()) {
            if !ids.contains(&line.account_id) {
                ids.push(line.account_id);
            }
        }
        ids
    }

    /// Raw debit/credit sums of every line, whether or not they validate.
    /// Sums that overflow are clamped to the `Decimal` range.
    #[must_use]
    pub fn raw_totals(&self) -> TransactionTotals {
        self.entries
            .iter()
            .map(|e| TransactionTotals::saturating_of_lines(&e.lines))
            .fold(TransactionTotals::zero(), TransactionTotals::saturating_add)
    }
}

/// Result of a committed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The committed transaction.
    pub transaction_id: TransactionId,
    /// Its totals.
    pub totals: TransactionTotals,
    /// Number of journal entries committed.
    pub entry_count: usize,
    /// Commit timestamp.
    pub completed_at: DateTime<Utc>,
    /// Commit attempts used (1 when no conflict occurred).
    pub attempts: u32,
}
