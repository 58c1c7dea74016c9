//! Rollback engine.
//!
//! A rollback never edits the original's postings. It commits a mirrored
//! compensating transaction through the coordinator; the same store write
//! flips the original to `rolled_back`, guarded by the original still being
//! `completed`. If that write fails the original is left untouched and the
//! caller may retry.

use std::sync::Arc;

use accord_shared::types::TransactionId;
use chrono::{DateTime, Utc};
use tracing::info;

use super::compensation::CompensationBuilder;
use crate::coordinator::{Compensates, Submission, TransactionCoordinator};
use crate::ledger::error::LedgerError;
use crate::ledger::lifecycle::TransactionLifecycle;
use crate::ledger::types::CallerContext;
use crate::store::LedgerStore;

/// Result of a successful rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    /// The transaction that was rolled back.
    pub original_id: TransactionId,
    /// The compensating transaction.
    pub compensating_transaction_id: TransactionId,
    /// When the compensation committed.
    pub rolled_back_at: DateTime<Utc>,
}

/// Rolls back completed transactions by compensation.
pub struct RollbackEngine<S> {
    store: Arc<S>,
    coordinator: TransactionCoordinator<S>,
}

impl<S> Clone for RollbackEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: LedgerStore> RollbackEngine<S> {
    /// Creates a rollback engine sharing the coordinator's store.
    #[must_use]
    pub fn new(store: Arc<S>, coordinator: TransactionCoordinator<S>) -> Self {
        Self { store, coordinator }
    }

    /// Rolls back a completed transaction.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is unknown
    /// - `Forbidden` if the transaction belongs to another company
    /// - `CompensationNotReversible` for compensating transactions
    /// - `AlreadyRolledBack` / `NotCompleted` from the status check, or from
    ///   the commit if another rollback won the race
    /// - storage, conflict and timeout errors from the coordinator
    pub async fn rollback(
        &self,
        ctx: &CallerContext,
        id: TransactionId,
        reason: Option<String>,
    ) -> Result<RollbackOutcome, LedgerError> {
        let original = self
            .store
            .get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;

        ctx.authorize(original.company_id)?;
        if original.is_compensation() {
            return Err(LedgerError::CompensationNotReversible(id));
        }
        TransactionLifecycle::roll_back(id, original.status, ctx.user_id, reason.clone())?;

        let compensation = CompensationBuilder::build(&original, reason.as_deref());
        let submission = Submission::new(original.company_id, compensation.entries)
            .with_description(Some(compensation.description))
            .with_metadata(original.metadata.clone())
            .compensating(Compensates {
                original_id: id,
                original_totals: original.totals(),
                reason,
            });

        let outcome = self.coordinator.execute(ctx, submission).await?;

        info!(
            transaction_id = %id,
            compensating_transaction_id = %outcome.transaction_id,
            company_id = %ctx.company_id,
            "Transaction rolled back"
        );

        Ok(RollbackOutcome {
            original_id: id,
            compensating_transaction_id: outcome.transaction_id,
            rolled_back_at: outcome.completed_at,
        })
    }
}
