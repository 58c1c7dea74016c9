//! Audit trail queries.

use std::sync::Arc;

use accord_shared::types::{CompanyId, TransactionId};
use chrono::{DateTime, Utc};

use super::types::AuditRecord;
use crate::ledger::error::LedgerError;
use crate::ledger::types::CallerContext;
use crate::store::LedgerStore;

/// Read side of the audit trail.
pub struct AuditTrail<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditTrail<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> AuditTrail<S> {
    /// Creates an audit trail reader.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records of one transaction in append order.
    ///
    /// Rejected requests never get a transaction row, so their history is
    /// authorized against the records themselves.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the records belong to another company.
    pub async fn history(
        &self,
        ctx: &CallerContext,
        transaction_id: TransactionId,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        let records = self.store.audit_for_transaction(transaction_id).await?;
        if let Some(foreign) = records.iter().find(|r| r.company_id != ctx.company_id) {
            return Err(LedgerError::Forbidden {
                caller: ctx.company_id,
                requested: foreign.company_id,
            });
        }
        Ok(records)
    }

    /// Records of a company with `from <= at < to`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller acts for another company
    /// - `InvalidTimeRange` unless `from < to`
    pub async fn company_history(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        ctx.authorize(company_id)?;
        if from >= to {
            return Err(LedgerError::InvalidTimeRange);
        }
        Ok(self.store.audit_for_company(company_id, from, to).await?)
    }
}
