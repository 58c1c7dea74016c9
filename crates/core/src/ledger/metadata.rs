//! Typed transaction metadata.
//!
//! Known fields are closed and typed so invariant checks never depend on
//! untyped lookups; anything else lives in the opaque `extension` value.

use accord_shared::types::CompanyId;
use serde::{Deserialize, Serialize};

/// Metadata carried by a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// Cross-company transfer authorization, if the transaction spans companies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_company: Option<CrossCompanyTransfer>,
    /// Free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Opaque caller-defined data. Never inspected by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<serde_json::Value>,
}

/// Explicit authorization for postings against other companies' accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCompanyTransfer {
    /// Must be true for the allow-list to take effect.
    pub authorized: bool,
    /// Companies whose accounts may be referenced.
    #[serde(default)]
    pub allowed_company_ids: Vec<CompanyId>,
}

impl CrossCompanyTransfer {
    /// Creates an authorized transfer over the given companies.
    #[must_use]
    pub fn authorized(allowed_company_ids: Vec<CompanyId>) -> Self {
        Self {
            authorized: true,
            allowed_company_ids,
        }
    }
}

impl TransactionMetadata {
    /// Metadata authorizing a cross-company transfer.
    #[must_use]
    pub fn cross_company(allowed_company_ids: Vec<CompanyId>) -> Self {
        Self {
            cross_company: Some(CrossCompanyTransfer::authorized(allowed_company_ids)),
            ..Self::default()
        }
    }

    /// Returns true if the request is marked as an authorized cross-company transfer.
    #[must_use]
    pub fn is_cross_company(&self) -> bool {
        self.cross_company.as_ref().is_some_and(|t| t.authorized)
    }

    /// Returns true if a request made by `request_company` may touch an
    /// account owned by `account_company`.
    #[must_use]
    pub fn permits(&self, request_company: CompanyId, account_company: CompanyId) -> bool {
        if request_company == account_company {
            return true;
        }
        match &self.cross_company {
            Some(transfer) if transfer.authorized => {
                transfer.allowed_company_ids.contains(&account_company)
            }
            _ => false,
        }
    }

    /// Adds a note, appending to existing notes.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note,
        });
        self
    }
}
