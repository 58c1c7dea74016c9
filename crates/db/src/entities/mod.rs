//! `SeaORM` entities for the ledger schema.

pub mod accounts;
pub mod audit_records;
pub mod journal_entries;
pub mod postings;
pub mod transaction_group_members;
pub mod transaction_groups;
pub mod transactions;
