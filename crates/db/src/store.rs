//! PostgreSQL implementation of the ledger store.
//!
//! Every multi-row write runs in one database transaction. A commit locks
//! the pending transaction row (and the original, for compensations) with
//! `SELECT ... FOR UPDATE`, then moves each account with a version-guarded
//! `UPDATE`; zero affected rows means another commit won and the whole
//! database transaction is dropped, which rolls it back.

use std::collections::HashMap;

use accord_core::audit::AuditRecord;
use accord_core::group::{GroupStatus, TransactionGroup};
use accord_core::ledger::{AccountSnapshot, LedgerTransaction, NewAccount, Posting, TransactionStatus};
use accord_core::store::{LedgerStore, StagedCommit, StoreError};
use accord_shared::types::{AccountId, CompanyId, GroupId, TransactionId};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::convert::{self, metadata_json, to_i32};
use crate::entities::{
    accounts, audit_records, journal_entries, postings, transaction_group_members,
    transaction_groups, transactions,
};
use crate::error::{corrupt, map_db_err};

/// Ledger store backed by PostgreSQL through `SeaORM`.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Locks a transaction row and checks its status.
async fn require_status<C: ConnectionTrait>(
    conn: &C,
    id: TransactionId,
    expected: TransactionStatus,
) -> Result<transactions::Model, StoreError> {
    let row = transactions::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;
    let actual =
        TransactionStatus::parse(&row.status).ok_or_else(|| corrupt("transaction status", &row.status))?;
    if actual != expected {
        return Err(StoreError::StatusMismatch {
            transaction_id: id,
            expected,
            actual,
        });
    }
    Ok(row)
}

async fn insert_audit<C: ConnectionTrait>(conn: &C, record: &AuditRecord) -> Result<(), StoreError> {
    audit_records::ActiveModel {
        id: Set(record.id.into_inner()),
        transaction_id: Set(record.transaction_id.into_inner()),
        company_id: Set(record.company_id.into_inner()),
        event: Set(record.event.as_str().to_string()),
        actor: Set(record.actor.into_inner()),
        at: Set(record.at.into()),
        total_debit: Set(record.total_debit),
        total_credit: Set(record.total_credit),
        reason: Set(record.reason.clone()),
        related_transaction_id: Set(record.related_transaction_id.map(TransactionId::into_inner)),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(map_db_err)?;
    Ok(())
}

async fn group_members<C: ConnectionTrait>(
    conn: &C,
    group_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<TransactionId>>, StoreError> {
    let rows = transaction_group_members::Entity::find()
        .filter(transaction_group_members::Column::GroupId.is_in(group_ids))
        .order_by_asc(transaction_group_members::Column::JoinedAt)
        .order_by_asc(transaction_group_members::Column::TransactionId)
        .all(conn)
        .await
        .map_err(map_db_err)?;

    let mut members: HashMap<Uuid, Vec<TransactionId>> = HashMap::new();
    for row in rows {
        members
            .entry(row.group_id)
            .or_default()
            .push(TransactionId::from_uuid(row.transaction_id));
    }
    Ok(members)
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    async fn open_account(&self, account: NewAccount) -> Result<AccountSnapshot, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            company_id: Set(account.company_id.into_inner()),
            name: Set(account.name),
            balance: Set(rust_decimal::Decimal::ZERO),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;
        Ok(convert::account(model))
    }

    async fn get_account(&self, id: AccountId) -> Result<AccountSnapshot, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(convert::account)
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    async fn load_accounts(
        &self,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows
            .into_iter()
            .map(convert::account)
            .map(|a| (a.id, a))
            .collect())
    }

    async fn account_postings(&self, account_id: AccountId) -> Result<Vec<Posting>, StoreError> {
        postings::Entity::find()
            .filter(postings::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(postings::Column::AccountVersion)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::posting)
            .collect()
    }

    async fn insert_pending(
        &self,
        transaction: &LedgerTransaction,
        audit: &AuditRecord,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        transactions::ActiveModel {
            id: Set(transaction.id.into_inner()),
            company_id: Set(transaction.company_id.into_inner()),
            group_id: Set(transaction.group_id.map(GroupId::into_inner)),
            description: Set(transaction.description.clone()),
            status: Set(TransactionStatus::Pending.as_str().to_string()),
            metadata: Set(metadata_json(&transaction.metadata)?),
            total_debit: Set(transaction.total_debit),
            total_credit: Set(transaction.total_credit),
            created_by: Set(transaction.created_by.into_inner()),
            created_at: Set(transaction.created_at.into()),
            completed_at: Set(None),
            rolled_back_at: Set(None),
            failure_reason: Set(None),
            compensated_by: Set(None),
            compensates: Set(transaction.compensates.map(TransactionId::into_inner)),
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;
        insert_audit(&txn, audit).await?;

        txn.commit().await.map_err(map_db_err)
    }

    async fn commit(&self, staged: &StagedCommit) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let completed_at: DateTimeWithTimeZone = staged.completed_at.into();

        // Preconditions. Returning early drops `txn`, rolling it back.
        require_status(&txn, staged.transaction_id, TransactionStatus::Pending).await?;
        if let Some(link) = &staged.compensation {
            require_status(&txn, link.original_id, TransactionStatus::Completed).await?;
        }

        // Accounts are updated in id order so concurrent commits lock rows in
        // the same order.
        let mut updates: Vec<_> = staged.balance_updates.iter().collect();
        updates.sort_by_key(|u| u.account_id);
        for update in updates {
            let result = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(update.new_balance))
                .col_expr(accounts::Column::Version, Expr::value(update.new_version))
                .col_expr(accounts::Column::UpdatedAt, Expr::value(completed_at))
                .filter(accounts::Column::Id.eq(update.account_id.into_inner()))
                .filter(accounts::Column::Version.eq(update.expected_version))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
            if result.rows_affected == 0 {
                let exists = accounts::Entity::find_by_id(update.account_id.into_inner())
                    .one(&txn)
                    .await
                    .map_err(map_db_err)?
                    .is_some();
                return Err(if exists {
                    StoreError::Conflict {
                        account_id: update.account_id,
                    }
                } else {
                    StoreError::NotFound(format!("account {}", update.account_id))
                });
            }
        }

        let mut entry_rows = Vec::with_capacity(staged.entries.len());
        let mut posting_rows = Vec::with_capacity(staged.posting_count());
        for entry in &staged.entries {
            entry_rows.push(journal_entries::ActiveModel {
                id: Set(entry.id.into_inner()),
                transaction_id: Set(entry.transaction_id.into_inner()),
                sequence: Set(to_i32(entry.sequence, "journal entry sequence")?),
                description: Set(entry.description.clone()),
                created_at: Set(completed_at),
            });
            for posting in &entry.postings {
                posting_rows.push(postings::ActiveModel {
                    id: Set(posting.id.into_inner()),
                    transaction_id: Set(posting.transaction_id.into_inner()),
                    journal_entry_id: Set(posting.journal_entry_id.into_inner()),
                    line_number: Set(to_i32(posting.line_number, "posting line number")?),
                    account_id: Set(posting.account_id.into_inner()),
                    debit_amount: Set(posting.debit_amount),
                    credit_amount: Set(posting.credit_amount),
                    description: Set(posting.description.clone()),
                    account_version: Set(posting.account_version),
                    balance_after: Set(posting.balance_after),
                    created_at: Set(completed_at),
                });
            }
        }
        if !entry_rows.is_empty() {
            journal_entries::Entity::insert_many(entry_rows)
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }
        if !posting_rows.is_empty() {
            postings::Entity::insert_many(posting_rows)
                .exec_without_returning(&txn)
                .await
                .map_err(map_db_err)?;
        }

        transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                Expr::value(TransactionStatus::Completed.as_str()),
            )
            .col_expr(transactions::Column::CompletedAt, Expr::value(completed_at))
            .col_expr(
                transactions::Column::TotalDebit,
                Expr::value(staged.totals.total_debit),
            )
            .col_expr(
                transactions::Column::TotalCredit,
                Expr::value(staged.totals.total_credit),
            )
            .filter(transactions::Column::Id.eq(staged.transaction_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        insert_audit(&txn, &staged.audit).await?;

        if let Some(link) = &staged.compensation {
            let rolled_back_at: DateTimeWithTimeZone = link.rolled_back_at.into();
            transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(TransactionStatus::RolledBack.as_str()),
                )
                .col_expr(transactions::Column::RolledBackAt, Expr::value(rolled_back_at))
                .col_expr(
                    transactions::Column::CompensatedBy,
                    Expr::value(staged.transaction_id.into_inner()),
                )
                .filter(transactions::Column::Id.eq(link.original_id.into_inner()))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
            insert_audit(&txn, &link.audit).await?;
        }

        txn.commit().await.map_err(map_db_err)?;
        debug!(
            transaction_id = %staged.transaction_id,
            postings = staged.posting_count(),
            accounts = staged.balance_updates.len(),
            "Commit applied"
        );
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: TransactionId,
        reason: &str,
        audit: &AuditRecord,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        require_status(&txn, id, TransactionStatus::Pending).await?;

        transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                Expr::value(TransactionStatus::Failed.as_str()),
            )
            .col_expr(transactions::Column::FailureReason, Expr::value(reason))
            .filter(transactions::Column::Id.eq(id.into_inner()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        insert_audit(&txn, audit).await?;

        txn.commit().await.map_err(map_db_err)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<LedgerTransaction>, StoreError> {
        let Some(header) = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let entries = journal_entries::Entity::find()
            .filter(journal_entries::Column::TransactionId.eq(header.id))
            .order_by_asc(journal_entries::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        let lines = postings::Entity::find()
            .filter(postings::Column::TransactionId.eq(header.id))
            .order_by_asc(postings::Column::LineNumber)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        convert::transaction(header, entries, lines).map(Some)
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        insert_audit(&self.db, record).await
    }

    async fn audit_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        audit_records::Entity::find()
            .filter(audit_records::Column::TransactionId.eq(id.into_inner()))
            .order_by_asc(audit_records::Column::Seq)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::audit)
            .collect()
    }

    async fn audit_for_company(
        &self,
        company_id: CompanyId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let from: DateTimeWithTimeZone = from.into();
        let to: DateTimeWithTimeZone = to.into();
        audit_records::Entity::find()
            .filter(audit_records::Column::CompanyId.eq(company_id.into_inner()))
            .filter(audit_records::Column::At.gte(from))
            .filter(audit_records::Column::At.lt(to))
            .order_by_asc(audit_records::Column::Seq)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(convert::audit)
            .collect()
    }

    async fn insert_group(&self, group: &TransactionGroup) -> Result<(), StoreError> {
        transaction_groups::ActiveModel {
            id: Set(group.id.into_inner()),
            company_id: Set(group.company_id.into_inner()),
            name: Set(group.name.clone()),
            description: Set(group.description.clone()),
            status: Set(group.status.as_str().to_string()),
            created_at: Set(group.created_at.into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find_group_by_name(
        &self,
        company_id: CompanyId,
        name: &str,
    ) -> Result<Option<TransactionGroup>, StoreError> {
        let Some(row) = transaction_groups::Entity::find()
            .filter(transaction_groups::Column::CompanyId.eq(company_id.into_inner()))
            .filter(transaction_groups::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };
        let mut members = group_members(&self.db, vec![row.id]).await?;
        let ids = members.remove(&row.id).unwrap_or_default();
        convert::group(row, ids).map(Some)
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<TransactionGroup>, StoreError> {
        let Some(row) = transaction_groups::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };
        let mut members = group_members(&self.db, vec![row.id]).await?;
        let ids = members.remove(&row.id).unwrap_or_default();
        convert::group(row, ids).map(Some)
    }

    async fn add_group_member(
        &self,
        group_id: GroupId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        // FOR SHARE holds off a concurrent close until the member is written.
        let group = transaction_groups::Entity::find_by_id(group_id.into_inner())
            .lock_shared()
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))?;
        if convert::group_status(&group.status)? == GroupStatus::Closed {
            return Err(StoreError::GroupClosed(group_id));
        }

        let member = transaction_group_members::ActiveModel {
            group_id: Set(group_id.into_inner()),
            transaction_id: Set(transaction_id.into_inner()),
            joined_at: Set(Utc::now().into()),
        };
        transaction_group_members::Entity::insert(member)
            .on_conflict(
                OnConflict::columns([
                    transaction_group_members::Column::GroupId,
                    transaction_group_members::Column::TransactionId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)
    }

    async fn list_groups(&self, company_id: CompanyId) -> Result<Vec<TransactionGroup>, StoreError> {
        let rows = transaction_groups::Entity::find()
            .filter(transaction_groups::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(transaction_groups::Column::CreatedAt)
            .order_by_asc(transaction_groups::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut members = group_members(&self.db, rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|row| {
                let ids = members.remove(&row.id).unwrap_or_default();
                convert::group(row, ids)
            })
            .collect()
    }

    async fn set_group_status(&self, id: GroupId, status: GroupStatus) -> Result<(), StoreError> {
        let result = transaction_groups::Entity::update_many()
            .col_expr(transaction_groups::Column::Status, Expr::value(status.as_str()))
            .filter(transaction_groups::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("group {id}")));
        }
        Ok(())
    }
}
