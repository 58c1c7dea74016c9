//! Transaction status state machine.
//!
//! ```text
//! pending -> completed -> rolled_back
//! pending -> failed
//! ```
//!
//! Every other transition is rejected. Each accepted transition yields a
//! [`StatusChange`] carrying the audit data (who, when, why) that the
//! coordinator persists alongside the new status.

use accord_shared::types::{TransactionId, UserId};
use chrono::{DateTime, Utc};

use super::error::LedgerError;
use super::types::TransactionStatus;

/// An accepted status transition with its audit trail information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Status before the transition.
    pub from: TransactionStatus,
    /// Status after the transition.
    pub to: TransactionStatus,
    /// Who caused the transition.
    pub actor: UserId,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// Why, for failures and rollbacks.
    pub reason: Option<String>,
}

/// Stateless validator for transaction status transitions.
pub struct TransactionLifecycle;

impl TransactionLifecycle {
    /// Commit a pending transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the transaction is pending. A second
    /// commit of a completed transaction is rejected this way.
    pub fn complete(
        current: TransactionStatus,
        actor: UserId,
    ) -> Result<StatusChange, LedgerError> {
        Self::transition(current, TransactionStatus::Completed, actor, None)
    }

    /// Mark a pending transaction as failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the transaction is pending.
    pub fn fail(
        current: TransactionStatus,
        actor: UserId,
        reason: impl Into<String>,
    ) -> Result<StatusChange, LedgerError> {
        Self::transition(
            current,
            TransactionStatus::Failed,
            actor,
            Some(reason.into()),
        )
    }

    /// Check that a transaction may be rolled back.
    ///
    /// # Errors
    ///
    /// - `AlreadyRolledBack` if the transaction was already rolled back
    /// - `NotCompleted` for pending or failed transactions
    pub fn roll_back(
        id: TransactionId,
        current: TransactionStatus,
        actor: UserId,
        reason: Option<String>,
    ) -> Result<StatusChange, LedgerError> {
        match current {
            TransactionStatus::Completed => Ok(StatusChange {
                from: current,
                to: TransactionStatus::RolledBack,
                actor,
                at: Utc::now(),
                reason,
            }),
            TransactionStatus::RolledBack => Err(LedgerError::AlreadyRolledBack(id)),
            TransactionStatus::Pending | TransactionStatus::Failed => {
                Err(LedgerError::NotCompleted {
                    id,
                    status: current,
                })
            }
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
        matches!(
            (from, to),
            (
                TransactionStatus::Pending,
                TransactionStatus::Completed | TransactionStatus::Failed
            ) | (TransactionStatus::Completed, TransactionStatus::RolledBack)
        )
    }

    fn transition(
        from: TransactionStatus,
        to: TransactionStatus,
        actor: UserId,
        reason: Option<String>,
    ) -> Result<StatusChange, LedgerError> {
        if !Self::is_valid_transition(from, to) {
            return Err(LedgerError::InvalidTransition { from, to });
        }
        Ok(StatusChange {
            from,
            to,
            actor,
            at: Utc::now(),
            reason,
        })
    }
}
