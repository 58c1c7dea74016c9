//! Ledger domain types for transaction creation, staging and storage.
//!
//! A [`LedgerTransaction`] is the atomic unit: it owns one or more balanced
//! [`JournalEntry`] values, each made of [`Posting`] lines. Input types
//! (`*Input`) describe what a caller proposes; the other types describe what
//! the store holds.

use std::fmt;

use accord_shared::types::{
    AccountId, CompanyId, GroupId, JournalEntryId, PostingId, TransactionId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::metadata::TransactionMetadata;

/// Already-authorized identity supplied with every engine call.
///
/// The engine never consults an ambient "current company"; every operation
/// receives the company and user explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// The company the caller is acting for.
    pub company_id: CompanyId,
    /// The user performing the action (recorded as the audit actor).
    pub user_id: UserId,
}

impl CallerContext {
    /// Creates a new caller context.
    #[must_use]
    pub const fn new(company_id: CompanyId, user_id: UserId) -> Self {
        Self {
            company_id,
            user_id,
        }
    }

    /// Checks that the caller acts for `company_id`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for any other company.
    pub fn authorize(&self, company_id: CompanyId) -> Result<(), LedgerError> {
        if self.company_id != company_id {
            return Err(LedgerError::Forbidden {
                caller: self.company_id,
                requested: company_id,
            });
        }
        Ok(())
    }
}

/// Transaction status.
///
/// The valid transitions are:
/// - Pending → Completed (commit)
/// - Pending → Failed (staging failure)
/// - Completed → RolledBack (rollback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Persisted but not yet committed; no posting is visible.
    Pending,
    /// All postings are committed.
    Completed,
    /// Nothing was committed (terminal).
    Failed,
    /// Reversed by a compensating transaction (terminal).
    RolledBack,
}

impl TransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "rolled_back" => Some(Self::RolledBack),
            _ => None,
        }
    }

    /// Returns true once the transaction has left `pending`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the transaction's postings affect account balances.
    #[must_use]
    pub fn has_balance_effect(&self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for a single posting line.
///
/// Exactly one of `debit_amount` / `credit_amount` must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero for a credit line).
    pub debit_amount: Decimal,
    /// Credit amount (zero for a debit line).
    pub credit_amount: Decimal,
    /// Human-readable description of the line.
    #[serde(default)]
    pub description: String,
}

impl PostingInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit_amount: amount,
            credit_amount: Decimal::ZERO,
            description: description.into(),
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit_amount: Decimal::ZERO,
            credit_amount: amount,
            description: description.into(),
        }
    }
}

/// Input for one balanced journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryInput {
    /// Description of the entry.
    #[serde(default)]
    pub description: String,
    /// The posting lines (must be non-empty and balanced).
    pub lines: Vec<PostingInput>,
}

impl JournalEntryInput {
    /// Creates a journal entry input.
    #[must_use]
    pub fn new(description: impl Into<String>, lines: Vec<PostingInput>) -> Self {
        Self {
            description: description.into(),
            lines,
        }
    }
}

/// Input for creating a new atomic transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionInput {
    /// The company that owns the transaction.
    pub company_id: CompanyId,
    /// Optional group to file the transaction under (created on first use).
    #[serde(default)]
    pub group_name: Option<String>,
    /// Optional description of the whole transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// Typed metadata (cross-company allow-list, notes, extension).
    #[serde(default)]
    pub metadata: TransactionMetadata,
    /// The journal entries; all commit together or not at all.
    pub transactions: Vec<JournalEntryInput>,
}

/// Debit and credit sums, exact decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotals {
    /// Total debit amount.
    pub total_debit: Decimal,
    /// Total credit amount.
    pub total_credit: Decimal,
    /// Whether the totals are balanced (debits == credits).
    pub is_balanced: bool,
}

impl TransactionTotals {
    /// Creates new totals from debit and credit sums.
    #[must_use]
    pub fn new(total_debit: Decimal, total_credit: Decimal) -> Self {
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Zero totals.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    /// Sums the lines of one journal entry.
    ///
    /// Returns `None` if either sum leaves the `Decimal` range.
    #[must_use]
    pub fn of_lines(lines: &[PostingInput]) -> Option<Self> {
        lines
            .iter()
            .try_fold(Self::zero(), |acc, l| {
                acc.checked_add(Self::new(l.debit_amount, l.credit_amount))
            })
    }

    /// Sums the lines of one journal entry, clamping at the `Decimal` range.
    #[must_use]
    pub fn saturating_of_lines(lines: &[PostingInput]) -> Self {
        lines.iter().fold(Self::zero(), |acc, l| {
            acc.saturating_add(Self::new(l.debit_amount, l.credit_amount))
        })
    }

    /// Adds two totals, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self::new(
            self.total_debit.checked_add(rhs.total_debit)?,
            self.total_credit.checked_add(rhs.total_credit)?,
        ))
    }

    /// Adds two totals, clamping at the `Decimal` range.
    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self::new(
            self.total_debit.saturating_add(rhs.total_debit),
            self.total_credit.saturating_add(rhs.total_credit),
        )
    }

    /// Returns the difference between debits and credits, or `None` on overflow.
    #[must_use]
    pub fn difference(&self) -> Option<Decimal> {
        self.total_debit.checked_sub(self.total_credit)
    }
}

/// Point-in-time view of an account as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// The account ID.
    pub id: AccountId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Display name.
    pub name: String,
    /// Running balance (Σ debit − Σ credit of committed postings).
    pub balance: Decimal,
    /// Optimistic-concurrency version, incremented once per committed posting.
    pub version: i64,
}

/// Input for opening an account (used by seeding and the account collaborator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// The account ID.
    pub id: AccountId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Display name.
    pub name: String,
}

impl NewAccount {
    /// Creates a new account input with a fresh ID.
    #[must_use]
    pub fn new(company_id: CompanyId, name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(),
            company_id,
            name: name.into(),
        }
    }
}

/// A committed posting line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier.
    pub id: PostingId,
    /// The owning transaction.
    pub transaction_id: TransactionId,
    /// The owning journal entry.
    pub journal_entry_id: JournalEntryId,
    /// Position of the line inside its journal entry.
    pub line_number: u32,
    /// The account posted to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit_amount: Decimal,
    /// Credit amount.
    pub credit_amount: Decimal,
    /// Line description.
    pub description: String,
    /// Account version after this posting.
    pub account_version: i64,
    /// Account balance after this posting.
    pub balance_after: Decimal,
}

impl Posting {
    /// Returns the signed effect on the account balance (debit − credit).
    #[must_use]
    pub fn net_amount(&self) -> Decimal {
        self.debit_amount - self.credit_amount
    }
}

/// A journal entry with its postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// The owning transaction.
    pub transaction_id: TransactionId,
    /// Position of the entry inside the transaction (submission order).
    pub sequence: u32,
    /// Entry description.
    pub description: String,
    /// The committed postings.
    pub postings: Vec<Posting>,
}

impl JournalEntry {
    /// Returns the entry's debit/credit totals.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        self.postings.iter().fold(TransactionTotals::zero(), |acc, p| {
            acc.saturating_add(TransactionTotals::new(p.debit_amount, p.credit_amount))
        })
    }
}

/// An atomic ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier (the atomic transaction id).
    pub id: TransactionId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Group the transaction was filed under, if any.
    pub group_id: Option<GroupId>,
    /// Optional description.
    pub description: Option<String>,
    /// Current status.
    pub status: TransactionStatus,
    /// Typed metadata.
    pub metadata: TransactionMetadata,
    /// Total debit over all entries.
    pub total_debit: Decimal,
    /// Total credit over all entries.
    pub total_credit: Decimal,
    /// User who submitted the transaction.
    pub created_by: UserId,
    /// When the transaction was persisted as pending.
    pub created_at: DateTime<Utc>,
    /// When the transaction was committed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the transaction was rolled back.
    pub rolled_back_at: Option<DateTime<Utc>>,
    /// Why the transaction failed.
    pub failure_reason: Option<String>,
    /// The compensating transaction that reversed this one.
    pub compensated_by: Option<TransactionId>,
    /// The transaction this one compensates, for reversal transactions.
    pub compensates: Option<TransactionId>,
    /// Journal entries (empty unless committed).
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

impl LedgerTransaction {
    /// Iterates over every posting of every entry, in order.
    pub fn postings(&self) -> impl Iterator<Item = &Posting> {
        self.entries.iter().flat_map(|e| e.postings.iter())
    }

    /// Returns the transaction totals.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals::new(self.total_debit, self.total_credit)
    }

    /// Returns true if this transaction is a compensation for another one.
    #[must_use]
    pub fn is_compensation(&self) -> bool {
        self.compensates.is_some()
    }
}
