//! Atomic transaction coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use accord_shared::types::{AccountId, GroupId};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use super::staging::stage;
use super::types::{CommitOutcome, Submission};
use crate::audit::recorder::AuditRecorder;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    AccountSnapshot, CallerContext, LedgerTransaction, TransactionStatus, TransactionTotals,
};
use crate::ledger::validation::{PostingValidator, ValidatedTransaction};
use crate::store::{LedgerStore, StoreError};

/// A submission that passed validation and has not been persisted yet.
///
/// Produced by [`TransactionCoordinator::prepare`] and consumed by
/// [`TransactionCoordinator::commit`].
#[derive(Debug)]
pub struct Prepared {
    submission: Submission,
    account_ids: Vec<AccountId>,
    accounts: HashMap<AccountId, AccountSnapshot>,
    validated: ValidatedTransaction,
}

impl Prepared {
    /// The validated submission.
    #[must_use]
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Records a group on the transaction header.
    #[must_use]
    pub fn with_group(mut self, group_id: Option<GroupId>) -> Self {
        self.submission.group_id = group_id;
        self
    }
}

/// Executes submissions with all-or-nothing semantics.
///
/// 1. Load accounts and validate. Rejections leave only a `rejected` audit
///    record behind.
/// 2. Persist the transaction as `pending` with its `created` record.
/// 3. Stage and commit as one store write. Conflicts reload, re-validate and
///    retry with linear backoff, up to `max_conflict_retries` times.
/// 4. Any other failure marks the transaction `failed`.
pub struct TransactionCoordinator<S> {
    store: Arc<S>,
    config: CoordinatorConfig,
}

impl<S> Clone for TransactionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: LedgerStore> TransactionCoordinator<S> {
    /// Creates a coordinator over a store.
    #[must_use]
    pub fn new(store: Arc<S>, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Validates, persists and commits a submission.
    ///
    /// # Errors
    ///
    /// - validation and authorization errors from [`PostingValidator`]
    /// - `Conflict` once retries are exhausted
    /// - `Storage` / `Timeout` when the store fails
    /// - `AlreadyRolledBack` / `NotCompleted` when a compensation's original
    ///   changed status before the commit
    pub async fn execute(
        &self,
        ctx: &CallerContext,
        submission: Submission,
    ) -> Result<CommitOutcome, LedgerError> {
        let prepared = self.prepare(ctx, submission).await?;
        self.commit(ctx, prepared).await
    }

    /// Loads the referenced accounts and validates the submission. Nothing is
    /// written except the `rejected` audit record of a failed validation.
    ///
    /// # Errors
    ///
    /// Validation and authorization errors, or a storage error while loading
    /// accounts.
    pub async fn prepare(
        &self,
        ctx: &CallerContext,
        submission: Submission,
    ) -> Result<Prepared, LedgerError> {
        let account_ids = submission.account_ids();
        let accounts = self.load_accounts(&account_ids).await?;

        match Self::validate(&submission, &accounts) {
            Ok(validated) => Ok(Prepared {
                submission,
                account_ids,
                accounts,
                validated,
            }),
            Err(err) => {
                self.reject(ctx, &submission, &err).await;
                Err(err)
            }
        }
    }

    /// Persists a prepared submission as `pending` and commits it.
    ///
    /// # Errors
    ///
    /// As for [`Self::execute`], minus validation failures caught by
    /// [`Self::prepare`].
    pub async fn commit(
        &self,
        ctx: &CallerContext,
        prepared: Prepared,
    ) -> Result<CommitOutcome, LedgerError> {
        let Prepared {
            submission,
            account_ids,
            accounts,
            validated,
        } = prepared;

        let created_at = Utc::now();
        let header = LedgerTransaction {
            id: submission.id,
            company_id: submission.company_id,
            group_id: submission.group_id,
            description: submission.description.clone(),
            status: TransactionStatus::Pending,
            metadata: submission.metadata.clone(),
            total_debit: validated.totals.total_debit,
            total_credit: validated.totals.total_credit,
            created_by: ctx.user_id,
            created_at,
            completed_at: None,
            rolled_back_at: None,
            failure_reason: None,
            compensated_by: None,
            compensates: submission.compensates.as_ref().map(|c| c.original_id),
            entries: Vec::new(),
        };
        let created = AuditRecorder::created(
            submission.id,
            submission.company_id,
            ctx.user_id,
            validated.totals,
            created_at,
        );
        if let Err(e) = self.store.insert_pending(&header, &created).await {
            error!(
                error = %e,
                transaction_id = %submission.id,
                company_id = %submission.company_id,
                "Failed to persist pending transaction"
            );
            return Err(e.into());
        }
        debug!(transaction_id = %submission.id, "Transaction pending");

        match self
            .commit_with_retry(ctx, &submission, &account_ids, accounts, validated)
            .await
        {
            Ok(outcome) => {
                info!(
                    transaction_id = %outcome.transaction_id,
                    company_id = %submission.company_id,
                    attempt = outcome.attempts,
                    entries = outcome.entry_count,
                    "Transaction committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.mark_failed(ctx, &submission, header.totals(), &err).await;
                Err(err)
            }
        }
    }

    async fn commit_with_retry(
        &self,
        ctx: &CallerContext,
        submission: &Submission,
        account_ids: &[AccountId],
        mut accounts: HashMap<AccountId, AccountSnapshot>,
        mut validated: ValidatedTransaction,
    ) -> Result<CommitOutcome, LedgerError> {
        let mut attempt: u32 = 1;
        loop {
            let completed_at = Utc::now();
            let staged = stage(
                submission,
                ctx.user_id,
                &accounts,
                validated.totals,
                completed_at,
            )?;

            let result =
                tokio::time::timeout(self.config.commit_timeout, self.store.commit(&staged)).await;

            let outcome = CommitOutcome {
                transaction_id: submission.id,
                totals: validated.totals,
                entry_count: submission.entries.len(),
                completed_at,
                attempts: attempt,
            };

            match result {
                Ok(Ok(())) => return Ok(outcome),
                Err(_elapsed) => {
                    // The write may have landed just before the deadline.
                    if self.is_committed(submission).await {
                        return Ok(outcome);
                    }
                    warn!(
                        transaction_id = %submission.id,
                        attempt,
                        timeout_ms = self.config.commit_timeout.as_millis(),
                        "Commit timed out"
                    );
                    return Err(LedgerError::Timeout(self.config.commit_timeout));
                }
                Ok(Err(StoreError::Conflict { account_id })) => {
                    if attempt > self.config.max_conflict_retries {
                        warn!(
                            transaction_id = %submission.id,
                            attempt,
                            "Conflict retries exhausted"
                        );
                        return Err(LedgerError::Conflict { attempts: attempt });
                    }
                    warn!(
                        transaction_id = %submission.id,
                        account_id = %account_id,
                        attempt,
                        "Write conflict, retrying"
                    );
                    tokio::time::sleep(self.config.backoff_for(attempt)).await;

                    accounts = self.load_accounts(account_ids).await?;
                    validated = Self::validate(submission, &accounts)?;
                    attempt += 1;
                }
                Ok(Err(StoreError::StatusMismatch {
                    transaction_id,
                    actual,
                    ..
                })) if submission
                    .compensates
                    .as_ref()
                    .is_some_and(|c| c.original_id == transaction_id) =>
                {
                    return Err(match actual {
                        TransactionStatus::RolledBack => {
                            LedgerError::AlreadyRolledBack(transaction_id)
                        }
                        status => LedgerError::NotCompleted {
                            id: transaction_id,
                            status,
                        },
                    });
                }
                Ok(Err(e)) => {
                    error!(
                        error = %e,
                        transaction_id = %submission.id,
                        attempt,
                        "Commit failed"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    fn validate(
        submission: &Submission,
        accounts: &HashMap<AccountId, AccountSnapshot>,
    ) -> Result<ValidatedTransaction, LedgerError> {
        PostingValidator::validate(
            submission.company_id,
            &submission.metadata,
            &submission.entries,
            |id| accounts.get(&id).map(|a| a.company_id),
        )
    }

    async fn load_accounts(
        &self,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, LedgerError> {
        self.store.load_accounts(ids).await.map_err(|e| {
            error!(error = %e, "Failed to load accounts");
            LedgerError::from(e)
        })
    }

    async fn is_committed(&self, submission: &Submission) -> bool {
        matches!(
            self.store.get_transaction(submission.id).await,
            Ok(Some(t)) if t.status == TransactionStatus::Completed
        )
    }

    /// Records a validation rejection. Nothing but the audit record is written.
    async fn reject(&self, ctx: &CallerContext, submission: &Submission, err: &LedgerError) {
        warn!(
            transaction_id = %submission.id,
            company_id = %submission.company_id,
            code = err.error_code(),
            "Transaction rejected: {err}"
        );
        let record = AuditRecorder::rejected(
            submission.id,
            submission.company_id,
            ctx.user_id,
            submission.raw_totals(),
            Utc::now(),
            err.to_string(),
        );
        if let Err(e) = self.store.append_audit(&record).await {
            error!(
                error = %e,
                transaction_id = %submission.id,
                "Failed to record rejection"
            );
        }
    }

    /// Marks a pending transaction failed. The cause is already being
    /// returned to the caller, so a failure here is only logged.
    async fn mark_failed(
        &self,
        ctx: &CallerContext,
        submission: &Submission,
        totals: TransactionTotals,
        err: &LedgerError,
    ) {
        let reason = err.to_string();
        let record = AuditRecorder::rejected(
            submission.id,
            submission.company_id,
            ctx.user_id,
            totals,
            Utc::now(),
            reason.clone(),
        );
        match self.store.mark_failed(submission.id, &reason, &record).await {
            Ok(()) => warn!(
                transaction_id = %submission.id,
                company_id = %submission.company_id,
                code = err.error_code(),
                "Transaction failed: {reason}"
            ),
            Err(e) => error!(
                error = %e,
                transaction_id = %submission.id,
                "Failed to mark transaction as failed"
            ),
        }
    }
}
