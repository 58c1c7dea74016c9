//! In-memory ledger store.
//!
//! All state lives behind one `RwLock`, so every write is atomic with
//! respect to readers. Commit faults can be queued to exercise the
//! coordinator's failure paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::error::StoreError;
use super::types::StagedCommit;
use super::LedgerStore;
use crate::audit::types::AuditRecord;
use crate::group::types::{GroupStatus, TransactionGroup};
use crate::ledger::types::{
    AccountSnapshot, LedgerTransaction, NewAccount, Posting, TransactionStatus,
};

/// A failure injected into the next commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The commit fails with `Unavailable` before touching state.
    Unavailable,
    /// The commit fails with `Conflict` as if an account had moved.
    Conflict,
    /// The commit sleeps before running.
    Delay(Duration),
    /// The commit fails after writing part of its postings.
    FailMidWrite,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, AccountSnapshot>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
    postings: HashMap<AccountId, Vec<Posting>>,
    audit: Vec<AuditRecord>,
    groups: Vec<TransactionGroup>,
}

impl State {
    fn transaction_status(&self, id: TransactionId) -> Result<TransactionStatus, StoreError> {
        self.transactions
            .get(&id)
            .map(|t| t.status)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))
    }

    fn require_status(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
    ) -> Result<(), StoreError> {
        let actual = self.transaction_status(id)?;
        if actual != expected {
            return Err(StoreError::StatusMismatch {
                transaction_id: id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut TransactionGroup, StoreError> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))
    }
}

/// In-memory [`LedgerStore`].
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<State>,
    faults: Mutex<VecDeque<Fault>>,
    commit_attempts: AtomicU32,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a fault for an upcoming commit. Faults fire in FIFO order, one
    /// per commit call.
    pub async fn inject_fault(&self, fault: Fault) {
        self.faults.lock().await.push_back(fault);
    }

    /// Number of times `commit` has been called.
    #[must_use]
    pub fn commit_attempts(&self) -> u32 {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    async fn next_fault(&self) -> Option<Fault> {
        self.faults.lock().await.pop_front()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn open_account(&self, account: NewAccount) -> Result<AccountSnapshot, StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate(format!("account {}", account.id)));
        }
        let snapshot = AccountSnapshot {
            id: account.id,
            company_id: account.company_id,
            name: account.name,
            balance: rust_decimal::Decimal::ZERO,
            version: 0,
        };
        state.accounts.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    async fn get_account(&self, id: AccountId) -> Result<AccountSnapshot, StoreError> {
        self.state
            .read()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    async fn load_accounts(
        &self,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.accounts.get(id).map(|a| (*id, a.clone())))
            .collect())
    }

    async fn account_postings(&self, account_id: AccountId) -> Result<Vec<Posting>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .postings
            .get(&account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_pending(
        &self,
        transaction: &LedgerTransaction,
        audit: &AuditRecord,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.transactions.contains_key(&transaction.id) {
            return Err(StoreError::Duplicate(format!("transaction {}", transaction.id)));
        }
        let mut header = transaction.clone();
        header.status = TransactionStatus::Pending;
        header.entries.clear();
        state.transactions.insert(header.id, header);
        state.audit.push(audit.clone());
        Ok(())
    }

    async fn commit(&self, staged: &StagedCommit) -> Result<(), StoreError> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);

        let mut fail_mid_write = false;
        match self.next_fault().await {
            Some(Fault::Unavailable) => {
                return Err(StoreError::Unavailable("injected fault".to_string()));
            }
            Some(Fault::Conflict) => {
                let account_id = staged
                    .balance_updates
                    .first()
                    .map_or_else(AccountId::new, |u| u.account_id);
                return Err(StoreError::Conflict { account_id });
            }
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(Fault::FailMidWrite) => fail_mid_write = true,
            None => {}
        }

        let mut state = self.state.write().await;

        // Preconditions, checked before anything is written.
        state.require_status(staged.transaction_id, TransactionStatus::Pending)?;
        if let Some(link) = &staged.compensation {
            state.require_status(link.original_id, TransactionStatus::Completed)?;
        }
        for update in &staged.balance_updates {
            let account = state
                .accounts
                .get(&update.account_id)
                .ok_or_else(|| StoreError::NotFound(format!("account {}", update.account_id)))?;
            if account.version != update.expected_version {
                return Err(StoreError::Conflict {
                    account_id: update.account_id,
                });
            }
        }

        // Build every change on the side; state is only touched once all of
        // it has been produced.
        let half = staged.posting_count() / 2;
        let mut written = 0usize;
        let mut new_postings: HashMap<AccountId, Vec<Posting>> = HashMap::new();
        for posting in staged.entries.iter().flat_map(|e| e.postings.iter()) {
            if fail_mid_write && written >= half {
                return Err(StoreError::Backend(format!(
                    "write interrupted after {written} postings"
                )));
            }
            new_postings
                .entry(posting.account_id)
                .or_default()
                .push(posting.clone());
            written += 1;
        }
        if fail_mid_write {
            return Err(StoreError::Backend("write interrupted".to_string()));
        }

        for update in &staged.balance_updates {
            if let Some(account) = state.accounts.get_mut(&update.account_id) {
                account.version = update.new_version;
                account.balance = update.new_balance;
            }
        }
        for (account_id, postings) in new_postings {
            state.postings.entry(account_id).or_default().extend(postings);
        }
        if let Some(transaction) = state.transactions.get_mut(&staged.transaction_id) {
            transaction.status = TransactionStatus::Completed;
            transaction.completed_at = Some(staged.completed_at);
            transaction.total_debit = staged.totals.total_debit;
            transaction.total_credit = staged.totals.total_credit;
            transaction.entries = staged.entries.clone();
        }
        state.audit.push(staged.audit.clone());

        if let Some(link) = &staged.compensation {
            if let Some(original) = state.transactions.get_mut(&link.original_id) {
                original.status = TransactionStatus::RolledBack;
                original.rolled_back_at = Some(link.rolled_back_at);
                original.compensated_by = Some(staged.transaction_id);
            }
            state.audit.push(link.audit.clone());
        }

        Ok(())
    }

    async fn mark_failed(
        &self,
        id: TransactionId,
        reason: &str,
        audit: &AuditRecord,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.require_status(id, TransactionStatus::Pending)?;
        if let Some(transaction) = state.transactions.get_mut(&id) {
            transaction.status = TransactionStatus::Failed;
            transaction.failure_reason = Some(reason.to_string());
        }
        state.audit.push(audit.clone());
        Ok(())
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.state.write().await.audit.push(record.clone());
        Ok(())
    }

    async fn audit_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .audit
            .iter()
            .filter(|r| r.transaction_id == id)
            .cloned()
            .collect())
    }

    async fn audit_for_company(
        &self,
        company_id: CompanyId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .audit
            .iter()
            .filter(|r| r.company_id == company_id && r.at >= from && r.at < to)
            .cloned()
            .collect())
    }

    async fn insert_group(&self, group: &TransactionGroup) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state
            .groups
            .iter()
            .any(|g| g.company_id == group.company_id && g.name == group.name)
        {
            return Err(StoreError::Duplicate(format!("group '{}'", group.name)));
        }
        state.groups.push(group.clone());
        Ok(())
    }

    async fn find_group_by_name(
        &self,
        company_id: CompanyId,
        name: &str,
    ) -> Result<Option<TransactionGroup>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .iter()
            .find(|g| g.company_id == company_id && g.name == name)
            .cloned())
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<TransactionGroup>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn add_group_member(
        &self,
        group_id: GroupId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let group = state.group_mut(group_id)?;
        if group.status == GroupStatus::Closed {
            return Err(StoreError::GroupClosed(group_id));
        }
        if !group.member_transaction_ids.contains(&transaction_id) {
            group.member_transaction_ids.push(transaction_id);
        }
        Ok(())
    }

    async fn list_groups(&self, company_id: CompanyId) -> Result<Vec<TransactionGroup>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .iter()
            .filter(|g| g.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn set_group_status(&self, id: GroupId, status: GroupStatus) -> Result<(), StoreError> {
        self.state.write().await.group_mut(id)?.status = status;
        Ok(())
    }
}
