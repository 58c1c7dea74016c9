//! Ledger engine facade.

use std::sync::Arc;

use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::types::{
    BalanceVerification, BatchResult, CreateTransactionResponse, GroupSummary, RollbackResponse,
    TransactionDetails,
};
use crate::audit::trail::AuditTrail;
use crate::audit::types::AuditRecord;
use crate::coordinator::{CoordinatorConfig, Submission, TransactionCoordinator};
use crate::group::service::GroupManager;
use crate::ledger::balance::{AccountBalance, derive_balances};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    AccountSnapshot, CallerContext, CreateTransactionInput, TransactionStatus,
};
use crate::ledger::validation::{PostingValidator, ValidationReport};
use crate::rollback::service::RollbackEngine;
use crate::store::{LedgerStore, StoreError};

/// Entry point for every ledger operation.
///
/// Cheap to clone; clones share the store.
pub struct LedgerEngine<S> {
    store: Arc<S>,
    coordinator: TransactionCoordinator<S>,
    rollback: RollbackEngine<S>,
    groups: GroupManager<S>,
    audit: AuditTrail<S>,
}

impl<S> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: self.coordinator.clone(),
            rollback: self.rollback.clone(),
            groups: self.groups.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an engine over a store.
    #[must_use]
    pub fn new(store: Arc<S>, config: CoordinatorConfig) -> Self {
        let coordinator = TransactionCoordinator::new(Arc::clone(&store), config);
        Self {
            rollback: RollbackEngine::new(Arc::clone(&store), coordinator.clone()),
            groups: GroupManager::new(Arc::clone(&store)),
            audit: AuditTrail::new(Arc::clone(&store)),
            coordinator,
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates and commits one atomic transaction.
    ///
    /// A named group is resolved (or created) once the request has passed
    /// validation, and the membership recorded after the commit, both
    /// best-effort. A rejected request therefore never creates a group.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller acts for another company, otherwise
    /// any error from the coordinator.
    pub async fn create_transaction(
        &self,
        ctx: &CallerContext,
        input: CreateTransactionInput,
    ) -> Result<CreateTransactionResponse, LedgerError> {
        ctx.authorize(input.company_id)?;

        let submission = Submission::new(input.company_id, input.transactions)
            .with_description(input.description)
            .with_metadata(input.metadata);
        let prepared = self.coordinator.prepare(ctx, submission).await?;

        let group_id = match input.group_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                self.groups
                    .resolve_for_submission(input.company_id, name)
                    .await
            }
            _ => None,
        };
        let outcome = self
            .coordinator
            .commit(ctx, prepared.with_group(group_id))
            .await?;

        if let Some(group_id) = group_id {
            self.groups
                .record_membership(group_id, outcome.transaction_id)
                .await;
        }

        Ok(CreateTransactionResponse {
            atomic_transaction_id: outcome.transaction_id,
            transaction_group_id: group_id,
            status: TransactionStatus::Completed,
            total_debit: outcome.totals.total_debit,
            total_credit: outcome.totals.total_credit,
            transaction_count: outcome.entry_count,
        })
    }

    /// Creates independent transactions in submission order.
    ///
    /// Each request is its own atomic unit; a failure never affects requests
    /// committed before it, and later requests still run.
    pub async fn create_transaction_batch(
        &self,
        ctx: &CallerContext,
        inputs: Vec<CreateTransactionInput>,
    ) -> BatchResult {
        let mut results = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let result = self.create_transaction(ctx, input).await;
            if let Err(e) = &result {
                debug!(index, code = e.error_code(), "Batch request failed");
            }
            results.push(result);
        }
        results
    }

    /// Reads a transaction with its postings.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` or `Forbidden`.
    pub async fn get_transaction(
        &self,
        ctx: &CallerContext,
        id: TransactionId,
    ) -> Result<TransactionDetails, LedgerError> {
        let transaction = self
            .store
            .get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;
        ctx.authorize(transaction.company_id)?;
        Ok(transaction.into())
    }

    /// Rolls back a completed transaction.
    ///
    /// # Errors
    ///
    /// See [`RollbackEngine::rollback`].
    pub async fn rollback_transaction(
        &self,
        ctx: &CallerContext,
        id: TransactionId,
        reason: Option<String>,
    ) -> Result<RollbackResponse, LedgerError> {
        let outcome = self.rollback.rollback(ctx, id, reason).await?;
        Ok(RollbackResponse {
            success: true,
            atomic_transaction_id: outcome.original_id,
            compensating_transaction_id: outcome.compensating_transaction_id,
        })
    }

    /// Dry-runs validation without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller acts for another company, or a
    /// storage error if accounts cannot be read.
    pub async fn validate_transactions(
        &self,
        ctx: &CallerContext,
        input: &CreateTransactionInput,
    ) -> Result<ValidationReport, LedgerError> {
        ctx.authorize(input.company_id)?;
        let mut ids: Vec<AccountId> = input
            .transactions
            .iter()
            .flat_map(|e| e.lines.iter().map(|l| l.account_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let accounts = self.store.load_accounts(&ids).await?;

        Ok(PostingValidator::dry_run(
            input.company_id,
            &input.metadata,
            &input.transactions,
            |id| accounts.get(&id).map(|a| a.company_id),
        ))
    }

    /// Lists the company's groups with member ids.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller acts for another company.
    pub async fn list_transaction_groups(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
    ) -> Result<Vec<GroupSummary>, LedgerError> {
        let groups = self.groups.list_groups(ctx, company_id).await?;
        Ok(groups.into_iter().map(GroupSummary::from).collect())
    }

    /// Creates a group.
    ///
    /// # Errors
    ///
    /// See [`GroupManager::create_group`].
    pub async fn create_transaction_group(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
        name: &str,
        description: Option<String>,
    ) -> Result<GroupSummary, LedgerError> {
        let group = self
            .groups
            .create_group(ctx, company_id, name, description)
            .await?;
        Ok(group.into())
    }

    /// Closes a group to new members.
    ///
    /// # Errors
    ///
    /// See [`GroupManager::close_group`].
    pub async fn close_transaction_group(
        &self,
        ctx: &CallerContext,
        group_id: GroupId,
    ) -> Result<GroupSummary, LedgerError> {
        Ok(self.groups.close_group(ctx, group_id).await?.into())
    }

    /// Audit records of one transaction in append order.
    ///
    /// # Errors
    ///
    /// See [`AuditTrail::history`].
    pub async fn audit_history(
        &self,
        ctx: &CallerContext,
        id: TransactionId,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        self.audit.history(ctx, id).await
    }

    /// Audit records of a company in `[from, to)`.
    ///
    /// # Errors
    ///
    /// See [`AuditTrail::company_history`].
    pub async fn company_audit_history(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        self.audit.company_history(ctx, company_id, from, to).await
    }

    /// Reads an account's current balance and version.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `Forbidden`.
    pub async fn account_balance(
        &self,
        ctx: &CallerContext,
        account_id: AccountId,
    ) -> Result<AccountSnapshot, LedgerError> {
        let account = match self.store.get_account(account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Err(LedgerError::AccountNotFound(account_id)),
            Err(e) => return Err(e.into()),
        };
        ctx.authorize(account.company_id)?;
        Ok(account)
    }

    /// Recomputes an account's balance from its postings and compares it to
    /// the materialized balance.
    ///
    /// # Errors
    ///
    /// Same as [`Self::account_balance`], plus `BalanceOverflow` when the
    /// posting history cannot be summed.
    pub async fn verify_account_balance(
        &self,
        ctx: &CallerContext,
        account_id: AccountId,
    ) -> Result<BalanceVerification, LedgerError> {
        let account = self.account_balance(ctx, account_id).await?;
        let postings = self.store.account_postings(account_id).await?;
        let derived = derive_balances(&postings)?
            .remove(&account_id)
            .unwrap_or_else(|| AccountBalance::new(account_id));

        let is_consistent = derived.balance == account.balance
            && i64::try_from(derived.posting_count).is_ok_and(|n| n == account.version);

        Ok(BalanceVerification {
            account_id,
            materialized_balance: account.balance,
            derived_balance: derived.balance,
            version: account.version,
            posting_count: derived.posting_count,
            is_consistent,
        })
    }
}
