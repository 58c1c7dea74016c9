//! Account ledger store.
//!
//! The engine depends on storage only through [`LedgerStore`]. Implementations
//! must make every method that writes more than one row atomic; in particular
//! [`LedgerStore::commit`] applies a [`StagedCommit`] entirely or not at all.
//!
//! [`MemoryLedgerStore`] is an in-process implementation with fault injection
//! for tests. The PostgreSQL implementation lives in `accord-db`.

mod error;
mod memory;
mod types;

use std::collections::HashMap;

use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};

pub use error::StoreError;
pub use memory::{Fault, MemoryLedgerStore};
pub use types::{BalanceUpdate, CompensationLink, StagedCommit};

use crate::audit::types::AuditRecord;
use crate::group::types::{GroupStatus, TransactionGroup};
use crate::ledger::types::{AccountSnapshot, LedgerTransaction, NewAccount, Posting};

/// Storage operations required by the engine.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    // ========== Accounts ==========

    /// Opens a new account with zero balance and version zero.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the account id is taken.
    async fn open_account(&self, account: NewAccount) -> Result<AccountSnapshot, StoreError>;

    /// Reads one account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    async fn get_account(&self, id: AccountId) -> Result<AccountSnapshot, StoreError>;

    /// Reads a set of accounts. Missing accounts are omitted from the result.
    async fn load_accounts(
        &self,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, StoreError>;

    /// Committed postings on an account, ordered by account version.
    async fn account_postings(&self, account_id: AccountId) -> Result<Vec<Posting>, StoreError>;

    // ========== Transactions ==========

    /// Persists a `pending` transaction header with its `created` audit record.
    async fn insert_pending(
        &self,
        transaction: &LedgerTransaction,
        audit: &AuditRecord,
    ) -> Result<(), StoreError>;

    /// Applies a staged commit atomically.
    ///
    /// # Errors
    ///
    /// - `StatusMismatch` if the transaction is not pending, or the original
    ///   of a compensation is not completed
    /// - `Conflict` if any account version moved
    async fn commit(&self, staged: &StagedCommit) -> Result<(), StoreError>;

    /// Marks a pending transaction `failed` with its `rejected` audit record.
    ///
    /// # Errors
    ///
    /// Returns `StatusMismatch` if the transaction is not pending.
    async fn mark_failed(
        &self,
        id: TransactionId,
        reason: &str,
        audit: &AuditRecord,
    ) -> Result<(), StoreError>;

    /// Reads a transaction with its journal entries and postings.
    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError>;

    // ========== Audit ==========

    /// Appends a standalone audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// Audit records of one transaction in append order.
    async fn audit_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    /// Audit records of a company with `from <= at < to`, in append order.
    async fn audit_for_company(
        &self,
        company_id: CompanyId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError>;

    // ========== Groups ==========

    /// Inserts a new group.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the company already has a group with this name.
    async fn insert_group(&self, group: &TransactionGroup) -> Result<(), StoreError>;

    /// Finds a group by company and name.
    async fn find_group_by_name(
        &self,
        company_id: CompanyId,
        name: &str,
    ) -> Result<Option<TransactionGroup>, StoreError>;

    /// Reads a group with its members.
    async fn get_group(&self, id: GroupId) -> Result<Option<TransactionGroup>, StoreError>;

    /// Adds a member. Adding an existing member is a no-op.
    ///
    /// The group's status is checked in the same write, so a group closed
    /// after it was resolved gains no new members.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group does not exist and `GroupClosed` if it
    /// is closed.
    async fn add_group_member(
        &self,
        group_id: GroupId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError>;

    /// Groups of a company with their members, ordered by creation.
    async fn list_groups(&self, company_id: CompanyId) -> Result<Vec<TransactionGroup>, StoreError>;

    /// Updates a group's status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group does not exist.
    async fn set_group_status(&self, id: GroupId, status: GroupStatus) -> Result<(), StoreError>;
}
