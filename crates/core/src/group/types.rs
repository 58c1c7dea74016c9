//! Transaction group types.

use accord_shared::types::{CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Group lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Accepts new members.
    Active,
    /// Accepts no new members.
    Closed,
}

impl GroupStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

/// A named collection of transactions.
///
/// Membership is bookkeeping only: it never widens the atomicity boundary of
/// its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionGroup {
    /// Unique identifier.
    pub id: GroupId,
    /// The owning company.
    pub company_id: CompanyId,
    /// Name, unique within the company.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: GroupStatus,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
    /// Member transactions, in the order they joined.
    #[serde(default)]
    pub member_transaction_ids: Vec<TransactionId>,
}

impl TransactionGroup {
    /// Creates a new active group with no members.
    #[must_use]
    pub fn new(company_id: CompanyId, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: GroupId::new(),
            company_id,
            name: name.into(),
            description,
            status: GroupStatus::Active,
            created_at: Utc::now(),
            member_transaction_ids: Vec::new(),
        }
    }

    /// Returns true if the group accepts new members.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GroupStatus::Active
    }
}
