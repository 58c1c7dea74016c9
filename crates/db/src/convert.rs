//! Conversions between database rows and ledger domain types.

use std::collections::HashMap;

use accord_core::audit::AuditRecord;
use accord_core::audit::AuditEventType;
use accord_core::group::{GroupStatus, TransactionGroup};
use accord_core::ledger::{
    AccountSnapshot, JournalEntry, LedgerTransaction, Posting, TransactionMetadata,
    TransactionStatus,
};
use accord_core::store::StoreError;
use accord_shared::types::{
    AccountId, AuditRecordId, CompanyId, GroupId, JournalEntryId, PostingId, TransactionId,
    UserId,
};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use crate::entities::{
    accounts, audit_records, journal_entries, postings, transaction_groups, transactions,
};
use crate::error::corrupt;

pub(crate) fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn to_i32(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| corrupt(what, value))
}

fn to_u32(value: i32, what: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt(what, value))
}

pub(crate) fn account(model: accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        id: AccountId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        name: model.name,
        balance: model.balance,
        version: model.version,
    }
}

pub(crate) fn posting(model: postings::Model) -> Result<Posting, StoreError> {
    Ok(Posting {
        id: PostingId::from_uuid(model.id),
        transaction_id: TransactionId::from_uuid(model.transaction_id),
        journal_entry_id: JournalEntryId::from_uuid(model.journal_entry_id),
        line_number: to_u32(model.line_number, "posting line number")?,
        account_id: AccountId::from_uuid(model.account_id),
        debit_amount: model.debit_amount,
        credit_amount: model.credit_amount,
        description: model.description,
        account_version: model.account_version,
        balance_after: model.balance_after,
    })
}

pub(crate) fn metadata_json(metadata: &TransactionMetadata) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(metadata).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Builds a transaction from its header row, entry rows and posting rows.
///
/// Entries come back in `sequence` order and postings in `line_number`
/// order regardless of the order the rows were read in.
pub(crate) fn transaction(
    header: transactions::Model,
    entries: Vec<journal_entries::Model>,
    posting_rows: Vec<postings::Model>,
) -> Result<LedgerTransaction, StoreError> {
    let status = TransactionStatus::parse(&header.status)
        .ok_or_else(|| corrupt("transaction status", &header.status))?;
    let metadata: TransactionMetadata = serde_json::from_value(header.metadata)
        .map_err(|e| corrupt("transaction metadata", e))?;

    let mut by_entry: HashMap<Uuid, Vec<Posting>> = HashMap::new();
    for row in posting_rows {
        by_entry
            .entry(row.journal_entry_id)
            .or_default()
            .push(posting(row)?);
    }

    let mut journal = entries
        .into_iter()
        .map(|entry| {
            let mut lines = by_entry.remove(&entry.id).unwrap_or_default();
            lines.sort_by_key(|p| p.line_number);
            Ok(JournalEntry {
                id: JournalEntryId::from_uuid(entry.id),
                transaction_id: TransactionId::from_uuid(entry.transaction_id),
                sequence: to_u32(entry.sequence, "journal entry sequence")?,
                description: entry.description,
                postings: lines,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    journal.sort_by_key(|e| e.sequence);

    Ok(LedgerTransaction {
        id: TransactionId::from_uuid(header.id),
        company_id: CompanyId::from_uuid(header.company_id),
        group_id: header.group_id.map(GroupId::from_uuid),
        description: header.description,
        status,
        metadata,
        total_debit: header.total_debit,
        total_credit: header.total_credit,
        created_by: UserId::from_uuid(header.created_by),
        created_at: utc(header.created_at),
        completed_at: header.completed_at.map(utc),
        rolled_back_at: header.rolled_back_at.map(utc),
        failure_reason: header.failure_reason,
        compensated_by: header.compensated_by.map(TransactionId::from_uuid),
        compensates: header.compensates.map(TransactionId::from_uuid),
        entries: journal,
    })
}

pub(crate) fn audit(model: audit_records::Model) -> Result<AuditRecord, StoreError> {
    Ok(AuditRecord {
        id: AuditRecordId::from_uuid(model.id),
        transaction_id: TransactionId::from_uuid(model.transaction_id),
        company_id: CompanyId::from_uuid(model.company_id),
        event: AuditEventType::parse(&model.event)
            .ok_or_else(|| corrupt("audit event", &model.event))?,
        actor: UserId::from_uuid(model.actor),
        at: utc(model.at),
        total_debit: model.total_debit,
        total_credit: model.total_credit,
        reason: model.reason,
        related_transaction_id: model.related_transaction_id.map(TransactionId::from_uuid),
    })
}

pub(crate) fn group_status(s: &str) -> Result<GroupStatus, StoreError> {
    match s {
        "active" => Ok(GroupStatus::Active),
        "closed" => Ok(GroupStatus::Closed),
        other => Err(corrupt("group status", other)),
    }
}

pub(crate) fn group(
    model: transaction_groups::Model,
    members: Vec<TransactionId>,
) -> Result<TransactionGroup, StoreError> {
    Ok(TransactionGroup {
        id: GroupId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        name: model.name,
        description: model.description,
        status: group_status(&model.status)?,
        created_at: utc(model.created_at),
        member_transaction_ids: members,
    })
}
