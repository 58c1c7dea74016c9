//! Transaction group manager.
//!
//! Groups are bookkeeping only. Resolving a group and recording membership
//! for a submitted transaction are best-effort: failures are logged and never
//! fail or undo the transaction itself.

use std::sync::Arc;

use accord_shared::types::{CompanyId, GroupId, TransactionId};
use tracing::{info, warn};

use super::types::{GroupStatus, TransactionGroup};
use crate::ledger::error::LedgerError;
use crate::ledger::types::CallerContext;
use crate::store::{LedgerStore, StoreError};

/// Creates, lists and closes transaction groups.
pub struct GroupManager<S> {
    store: Arc<S>,
}

impl<S> Clone for GroupManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> GroupManager<S> {
    /// Creates a group manager over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a group for `company_id`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller acts for another company
    /// - `GroupNameRequired` for a blank name
    /// - `DuplicateGroup` if the company already has a group with this name
    pub async fn create_group(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
        name: &str,
        description: Option<String>,
    ) -> Result<TransactionGroup, LedgerError> {
        ctx.authorize(company_id)?;
        let group = self.insert(company_id, name, description).await?;
        info!(
            group_id = %group.id,
            company_id = %company_id,
            name = %group.name,
            "Transaction group created"
        );
        Ok(group)
    }

    /// Finds the company's group by name, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `GroupNameRequired` for a blank name, or a storage error.
    pub async fn resolve_or_create(
        &self,
        company_id: CompanyId,
        name: &str,
    ) -> Result<TransactionGroup, LedgerError> {
        let name = name.trim();
        if let Some(group) = self.store.find_group_by_name(company_id, name).await? {
            return Ok(group);
        }
        match self.insert(company_id, name, None).await {
            Ok(group) => {
                info!(group_id = %group.id, company_id = %company_id, "Transaction group created on first use");
                Ok(group)
            }
            // Lost a creation race: the winner's group is the one to use.
            Err(LedgerError::DuplicateGroup(_)) => self
                .store
                .find_group_by_name(company_id, name)
                .await?
                .ok_or_else(|| LedgerError::DuplicateGroup(name.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Resolves the group a submission names. Returns `None`, after logging,
    /// when the group cannot be resolved or is closed.
    pub async fn resolve_for_submission(
        &self,
        company_id: CompanyId,
        name: &str,
    ) -> Option<GroupId> {
        match self.resolve_or_create(company_id, name).await {
            Ok(group) if group.is_active() => Some(group.id),
            Ok(group) => {
                warn!(
                    error = %LedgerError::GroupClosed(group.id),
                    group_id = %group.id,
                    company_id = %company_id,
                    "Group is closed, membership skipped"
                );
                None
            }
            Err(e) => {
                warn!(
                    error = %e,
                    company_id = %company_id,
                    group = name,
                    "Failed to resolve transaction group, membership skipped"
                );
                None
            }
        }
    }

    /// Records a committed transaction as a group member. Failures, including
    /// a group closed since it was resolved, are logged.
    pub async fn record_membership(&self, group_id: GroupId, transaction_id: TransactionId) {
        if let Err(e) = self.store.add_group_member(group_id, transaction_id).await {
            warn!(
                error = %e,
                group_id = %group_id,
                transaction_id = %transaction_id,
                "Failed to record group membership"
            );
        }
    }

    /// Lists the company's groups with their members.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller acts for another company.
    pub async fn list_groups(
        &self,
        ctx: &CallerContext,
        company_id: CompanyId,
    ) -> Result<Vec<TransactionGroup>, LedgerError> {
        ctx.authorize(company_id)?;
        Ok(self.store.list_groups(company_id).await?)
    }

    /// Reads one group.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for unknown ids and `Forbidden` for groups of
    /// other companies.
    pub async fn get_group(
        &self,
        ctx: &CallerContext,
        group_id: GroupId,
    ) -> Result<TransactionGroup, LedgerError> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or(LedgerError::GroupNotFound(group_id))?;
        ctx.authorize(group.company_id)?;
        Ok(group)
    }

    /// Closes a group to new members. Closing a closed group is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` or `Forbidden` as for [`Self::get_group`].
    pub async fn close_group(
        &self,
        ctx: &CallerContext,
        group_id: GroupId,
    ) -> Result<TransactionGroup, LedgerError> {
        let mut group = self.get_group(ctx, group_id).await?;
        if group.status == GroupStatus::Closed {
            return Ok(group);
        }
        self.store
            .set_group_status(group_id, GroupStatus::Closed)
            .await?;
        group.status = GroupStatus::Closed;
        info!(group_id = %group_id, company_id = %group.company_id, "Transaction group closed");
        Ok(group)
    }

    async fn insert(
        &self,
        company_id: CompanyId,
        name: &str,
        description: Option<String>,
    ) -> Result<TransactionGroup, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::GroupNameRequired);
        }
        let group = TransactionGroup::new(company_id, name, description);
        match self.store.insert_group(&group).await {
            Ok(()) => Ok(group),
            Err(StoreError::Duplicate(_)) => Err(LedgerError::DuplicateGroup(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
