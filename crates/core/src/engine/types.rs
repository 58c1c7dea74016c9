//! Engine request and response types.

use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::group::types::{GroupStatus, TransactionGroup};
use crate::ledger::error::LedgerError;
use crate::ledger::metadata::TransactionMetadata;
use crate::ledger::types::{LedgerTransaction, Posting, TransactionStatus};

/// Response of a committed create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransactionResponse {
    /// Id of the atomic transaction.
    pub atomic_transaction_id: TransactionId,
    /// Group the transaction was filed under, if any.
    pub transaction_group_id: Option<GroupId>,
    /// Final status (`completed`).
    pub status: TransactionStatus,
    /// Total debit over all journal entries.
    pub total_debit: Decimal,
    /// Total credit over all journal entries.
    pub total_credit: Decimal,
    /// Number of journal entries committed.
    pub transaction_count: usize,
}

/// Per-request results of a batch, in submission order.
pub type BatchResult = Vec<Result<CreateTransactionResponse, LedgerError>>;

/// A transaction with its postings flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// Id of the atomic transaction.
    pub atomic_transaction_id: TransactionId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Group the transaction was filed under.
    pub transaction_group_id: Option<GroupId>,
    /// Current status.
    pub status: TransactionStatus,
    /// Optional description.
    pub description: Option<String>,
    /// When the transaction was persisted.
    pub created_at: DateTime<Utc>,
    /// When it committed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When it was rolled back.
    pub rolled_back_at: Option<DateTime<Utc>>,
    /// Why it failed.
    pub failure_reason: Option<String>,
    /// Compensating transaction, once rolled back.
    pub compensated_by: Option<TransactionId>,
    /// Original transaction, for compensations.
    pub compensates: Option<TransactionId>,
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Number of journal entries.
    pub transaction_count: usize,
    /// Every posting, in entry then line order.
    pub postings: Vec<Posting>,
    /// Typed metadata.
    pub metadata: TransactionMetadata,
}

impl From<LedgerTransaction> for TransactionDetails {
    fn from(transaction: LedgerTransaction) -> Self {
        let postings = transaction.postings().cloned().collect();
        Self {
            atomic_transaction_id: transaction.id,
            company_id: transaction.company_id,
            transaction_group_id: transaction.group_id,
            status: transaction.status,
            description: transaction.description,
            created_at: transaction.created_at,
            completed_at: transaction.completed_at,
            rolled_back_at: transaction.rolled_back_at,
            failure_reason: transaction.failure_reason,
            compensated_by: transaction.compensated_by,
            compensates: transaction.compensates,
            total_debit: transaction.total_debit,
            total_credit: transaction.total_credit,
            transaction_count: transaction.entries.len(),
            postings,
            metadata: transaction.metadata,
        }
    }
}

/// Response of a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResponse {
    /// Always true; failures are returned as errors.
    pub success: bool,
    /// The rolled back transaction.
    pub atomic_transaction_id: TransactionId,
    /// The compensating transaction.
    pub compensating_transaction_id: TransactionId,
}

/// A group as returned by list/create/close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group id.
    pub group_id: GroupId,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Status.
    pub status: GroupStatus,
    /// Member transactions.
    pub member_transaction_ids: Vec<TransactionId>,
}

impl From<TransactionGroup> for GroupSummary {
    fn from(group: TransactionGroup) -> Self {
        Self {
            group_id: group.id,
            name: group.name,
            description: group.description,
            status: group.status,
            member_transaction_ids: group.member_transaction_ids,
        }
    }
}

/// Materialized balance checked against the balance derived from postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceVerification {
    /// The account checked.
    pub account_id: AccountId,
    /// Balance stored on the account.
    pub materialized_balance: Decimal,
    /// Σ(debit − credit) over committed postings.
    pub derived_balance: Decimal,
    /// Account version.
    pub version: i64,
    /// Committed postings on the account.
    pub posting_count: u64,
    /// Whether the two balances agree and the version equals the posting count.
    pub is_consistent: bool,
}
