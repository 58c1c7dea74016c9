//! Audit record types.

use std::fmt;

use accord_shared::types::{AuditRecordId, CompanyId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::types::TransactionTotals;

/// The status transition an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Transaction persisted as pending.
    Created,
    /// Transaction committed.
    Committed,
    /// Request or transaction rejected (validation or staging failure).
    Rejected,
    /// Transaction reversed by a compensating transaction.
    RolledBack,
}

impl AuditEventType {
    /// Returns the string representation of the event type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Parses an event type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "committed" => Some(Self::Committed),
            "rejected" => Some(Self::Rejected),
            "rolled_back" => Some(Self::RolledBack),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier.
    pub id: AuditRecordId,
    /// The transaction the record describes.
    pub transaction_id: TransactionId,
    /// The owning company.
    pub company_id: CompanyId,
    /// What happened.
    pub event: AuditEventType,
    /// Who caused it.
    pub actor: UserId,
    /// When it happened.
    pub at: DateTime<Utc>,
    /// Total debit snapshot.
    pub total_debit: Decimal,
    /// Total credit snapshot.
    pub total_credit: Decimal,
    /// Why, for rejections and rollbacks.
    pub reason: Option<String>,
    /// Linked transaction (compensation link).
    pub related_transaction_id: Option<TransactionId>,
}

impl AuditRecord {
    /// Returns the totals snapshot.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals::new(self.total_debit, self.total_credit)
    }
}
