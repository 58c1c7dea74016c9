//! End-to-end engine tests against the in-memory store.

use std::sync::Arc;

use accord_shared::types::{AccountId, CompanyId, TransactionId, UserId};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::LedgerEngine;
use crate::audit::types::AuditEventType;
use crate::coordinator::CoordinatorConfig;
use crate::group::types::GroupStatus;
use crate::ledger::error::LedgerError;
use crate::ledger::metadata::TransactionMetadata;
use crate::ledger::types::{
    CallerContext, CreateTransactionInput, JournalEntryInput, NewAccount, PostingInput,
    TransactionStatus,
};
use crate::store::{LedgerStore, MemoryLedgerStore};

struct Books {
    engine: LedgerEngine<MemoryLedgerStore>,
    ctx: CallerContext,
    cash: AccountId,
    revenue: AccountId,
    expense: AccountId,
}

impl Books {
    async fn open() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let company = CompanyId::new();
        let mut ids = Vec::new();
        for name in ["Cash", "Revenue", "Office Expense"] {
            ids.push(
                store
                    .open_account(NewAccount::new(company, name))
                    .await
                    .unwrap()
                    .id,
            );
        }
        Self {
            engine: LedgerEngine::new(store, CoordinatorConfig::default()),
            ctx: CallerContext::new(company, UserId::new()),
            cash: ids[0],
            revenue: ids[1],
            expense: ids[2],
        }
    }

    fn sale(&self, debit: Decimal, credit: Decimal) -> CreateTransactionInput {
        CreateTransactionInput {
            company_id: self.ctx.company_id,
            description: Some("Sale".to_string()),
            transactions: vec![JournalEntryInput::new(
                "cash sale",
                vec![
                    PostingInput::debit(self.cash, debit, "cash in"),
                    PostingInput::credit(self.revenue, credit, "revenue"),
                ],
            )],
            ..Default::default()
        }
    }

    async fn balance(&self, account: AccountId) -> Decimal {
        self.engine
            .account_balance(&self.ctx, account)
            .await
            .unwrap()
            .balance
    }
}

#[tokio::test]
async fn test_simple_balanced_transaction() {
    let books = Books::open().await;

    let response = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(1000.00), dec!(1000.00)))
        .await
        .unwrap();

    assert_eq!(response.status, TransactionStatus::Completed);
    assert_eq!(response.total_debit, dec!(1000.00));
    assert_eq!(response.total_credit, dec!(1000.00));
    assert_eq!(response.transaction_count, 1);
    assert_eq!(response.transaction_group_id, None);

    assert_eq!(books.balance(books.cash).await, dec!(1000.00));
    assert_eq!(books.balance(books.revenue).await, dec!(-1000.00));

    let details = books
        .engine
        .get_transaction(&books.ctx, response.atomic_transaction_id)
        .await
        .unwrap();
    assert_eq!(details.status, TransactionStatus::Completed);
    assert_eq!(details.postings.len(), 2);
    assert!(details.completed_at.is_some());
}

#[tokio::test]
async fn test_unbalanced_transaction_rejected_with_totals() {
    let books = Books::open().await;

    let err = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(1000), dec!(900)))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "UNBALANCED_TRANSACTION");
    assert_eq!(err.unbalanced_totals(), Some((dec!(1000), dec!(900))));
    assert_eq!(books.balance(books.cash).await, Decimal::ZERO);
    assert_eq!(books.balance(books.revenue).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_multi_entry_is_all_or_nothing() {
    let books = Books::open().await;
    let mut input = books.sale(dec!(50), dec!(50));
    input.transactions.push(JournalEntryInput::new(
        "broken",
        vec![
            PostingInput::debit(books.expense, dec!(10), "supplies"),
            PostingInput::credit(books.cash, dec!(9), "paid"),
        ],
    ));

    let err = books
        .engine
        .create_transaction(&books.ctx, input)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unbalanced { entry: 1, .. }));
    assert_eq!(books.balance(books.cash).await, Decimal::ZERO);
    assert_eq!(books.balance(books.expense).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_rollback_through_engine() {
    let books = Books::open().await;
    let created = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(250.50), dec!(250.50)))
        .await
        .unwrap();

    let rollback = books
        .engine
        .rollback_transaction(
            &books.ctx,
            created.atomic_transaction_id,
            Some("duplicate invoice".to_string()),
        )
        .await
        .unwrap();

    assert!(rollback.success);
    assert_eq!(rollback.atomic_transaction_id, created.atomic_transaction_id);
    assert_eq!(books.balance(books.cash).await, Decimal::ZERO);
    assert_eq!(books.balance(books.revenue).await, Decimal::ZERO);

    let original = books
        .engine
        .get_transaction(&books.ctx, created.atomic_transaction_id)
        .await
        .unwrap();
    assert_eq!(original.status, TransactionStatus::RolledBack);
    assert_eq!(
        original.compensated_by,
        Some(rollback.compensating_transaction_id)
    );

    let compensation = books
        .engine
        .get_transaction(&books.ctx, rollback.compensating_transaction_id)
        .await
        .unwrap();
    assert_eq!(compensation.compensates, Some(created.atomic_transaction_id));
    assert!(
        compensation
            .description
            .as_deref()
            .is_some_and(|d| d.contains("duplicate invoice"))
    );

    assert!(matches!(
        books
            .engine
            .rollback_transaction(&books.ctx, created.atomic_transaction_id, None)
            .await,
        Err(LedgerError::AlreadyRolledBack(_))
    ));
}

#[tokio::test]
async fn test_cross_company_transfer_requires_allow_list() {
    let books = Books::open().await;
    let subsidiary = CompanyId::new();
    let due_from_parent = books
        .engine
        .store()
        .open_account(NewAccount::new(subsidiary, "Due from parent"))
        .await
        .unwrap()
        .id;

    let transfer = |metadata: TransactionMetadata| CreateTransactionInput {
        company_id: books.ctx.company_id,
        metadata,
        transactions: vec![JournalEntryInput::new(
            "intercompany loan",
            vec![
                PostingInput::debit(due_from_parent, dec!(5000), "receivable"),
                PostingInput::credit(books.cash, dec!(5000), "cash out"),
            ],
        )],
        ..Default::default()
    };

    let err = books
        .engine
        .create_transaction(&books.ctx, transfer(TransactionMetadata::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CompanyMismatch { .. }));

    let err = books
        .engine
        .create_transaction(
            &books.ctx,
            transfer(TransactionMetadata::cross_company(vec![CompanyId::new()])),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CrossCompanyNotAllowed { .. }));

    books
        .engine
        .create_transaction(
            &books.ctx,
            transfer(TransactionMetadata::cross_company(vec![
                books.ctx.company_id,
                subsidiary,
            ])),
        )
        .await
        .unwrap();

    let snapshot = books
        .engine
        .store()
        .get_account(due_from_parent)
        .await
        .unwrap();
    assert_eq!(snapshot.balance, dec!(5000));
    assert_eq!(books.balance(books.cash).await, dec!(-5000));
}

#[tokio::test]
async fn test_named_group_collects_members() {
    let books = Books::open().await;
    let mut first = books.sale(dec!(10), dec!(10));
    first.group_name = Some("month-end".to_string());
    let mut second = books.sale(dec!(20), dec!(20));
    second.group_name = Some("month-end".to_string());

    let a = books
        .engine
        .create_transaction(&books.ctx, first)
        .await
        .unwrap();
    let b = books
        .engine
        .create_transaction(&books.ctx, second)
        .await
        .unwrap();
    assert!(a.transaction_group_id.is_some());
    assert_eq!(a.transaction_group_id, b.transaction_group_id);

    let groups = books
        .engine
        .list_transaction_groups(&books.ctx, books.ctx.company_id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "month-end");
    assert_eq!(
        groups[0].member_transaction_ids,
        vec![a.atomic_transaction_id, b.atomic_transaction_id]
    );
}

#[tokio::test]
async fn test_closed_group_does_not_block_transaction() {
    let books = Books::open().await;
    let group = books
        .engine
        .create_transaction_group(&books.ctx, books.ctx.company_id, "q1", None)
        .await
        .unwrap();
    let closed = books
        .engine
        .close_transaction_group(&books.ctx, group.group_id)
        .await
        .unwrap();
    assert_eq!(closed.status, GroupStatus::Closed);

    let mut input = books.sale(dec!(5), dec!(5));
    input.group_name = Some("q1".to_string());
    let response = books
        .engine
        .create_transaction(&books.ctx, input)
        .await
        .unwrap();

    assert_eq!(response.transaction_group_id, None);
    assert_eq!(books.balance(books.cash).await, dec!(5));
    let groups = books
        .engine
        .list_transaction_groups(&books.ctx, books.ctx.company_id)
        .await
        .unwrap();
    assert!(groups[0].member_transaction_ids.is_empty());
}

#[tokio::test]
async fn test_batch_failure_keeps_earlier_commits() {
    let books = Books::open().await;

    let results = books
        .engine
        .create_transaction_batch(
            &books.ctx,
            vec![
                books.sale(dec!(100), dec!(100)),
                books.sale(dec!(100), dec!(1)),
                books.sale(dec!(7), dec!(7)),
            ],
        )
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(LedgerError::Unbalanced { .. })));
    assert!(results[2].is_ok());
    assert_eq!(books.balance(books.cash).await, dec!(107));
}

#[tokio::test]
async fn test_validate_transactions_writes_nothing() {
    let books = Books::open().await;
    let mut input = books.sale(dec!(30), dec!(30));
    input.transactions.push(JournalEntryInput::new(
        "off by one",
        vec![
            PostingInput::debit(books.expense, dec!(11), ""),
            PostingInput::credit(books.cash, dec!(10), ""),
        ],
    ));

    let report = books
        .engine
        .validate_transactions(&books.ctx, &input)
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(!report.is_balanced);
    assert_eq!(report.total_debit, dec!(41));
    assert_eq!(report.total_credit, dec!(40));
    assert_eq!(report.per_transaction_results.len(), 2);
    assert!(report.per_transaction_results[0].is_valid);
    assert!(!report.per_transaction_results[1].is_balanced);

    assert_eq!(books.balance(books.cash).await, Decimal::ZERO);
    let history = books
        .engine
        .company_audit_history(
            &books.ctx,
            books.ctx.company_id,
            Utc::now() - Duration::hours(1),
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_get_transaction_unknown_and_foreign() {
    let books = Books::open().await;
    let unknown = TransactionId::new();
    assert!(matches!(
        books.engine.get_transaction(&books.ctx, unknown).await,
        Err(LedgerError::TransactionNotFound(id)) if id == unknown
    ));

    let created = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(1), dec!(1)))
        .await
        .unwrap();
    let stranger = CallerContext::new(CompanyId::new(), UserId::new());
    assert!(matches!(
        books
            .engine
            .get_transaction(&stranger, created.atomic_transaction_id)
            .await,
        Err(LedgerError::Forbidden { .. })
    ));
    assert!(matches!(
        books
            .engine
            .create_transaction(&stranger, books.sale(dec!(1), dec!(1)))
            .await,
        Err(LedgerError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn test_verify_account_balance_after_activity() {
    let books = Books::open().await;
    for amount in [dec!(12.34), dec!(0.66), dec!(87)] {
        books
            .engine
            .create_transaction(&books.ctx, books.sale(amount, amount))
            .await
            .unwrap();
    }
    let created = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(3), dec!(3)))
        .await
        .unwrap();
    books
        .engine
        .rollback_transaction(&books.ctx, created.atomic_transaction_id, None)
        .await
        .unwrap();

    let check = books
        .engine
        .verify_account_balance(&books.ctx, books.cash)
        .await
        .unwrap();
    assert!(check.is_consistent);
    assert_eq!(check.materialized_balance, dec!(100.00));
    assert_eq!(check.derived_balance, dec!(100.00));
    assert_eq!(check.posting_count, 5);
    assert_eq!(check.version, 5);

    assert!(matches!(
        books
            .engine
            .verify_account_balance(&books.ctx, AccountId::new())
            .await,
        Err(LedgerError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_audit_history_through_engine() {
    let books = Books::open().await;
    let before = Utc::now() - Duration::seconds(1);

    let created = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(9), dec!(9)))
        .await
        .unwrap();
    books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(9), dec!(8)))
        .await
        .unwrap_err();

    let events: Vec<AuditEventType> = books
        .engine
        .audit_history(&books.ctx, created.atomic_transaction_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.event)
        .collect();
    assert_eq!(
        events,
        vec![AuditEventType::Created, AuditEventType::Committed]
    );

    let company = books
        .engine
        .company_audit_history(
            &books.ctx,
            books.ctx.company_id,
            before,
            Utc::now() + Duration::seconds(1),
        )
        .await
        .unwrap();
    assert_eq!(company.len(), 3);
    assert_eq!(
        company
            .iter()
            .filter(|r| r.event == AuditEventType::Rejected)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_rejected_create_leaves_no_group() {
    let books = Books::open().await;
    let mut input = books.sale(dec!(1000.00), dec!(900.00));
    input.group_name = Some("End of Day".to_string());

    let err = books
        .engine
        .create_transaction(&books.ctx, input)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unbalanced { .. }));

    let groups = books
        .engine
        .list_transaction_groups(&books.ctx, books.ctx.company_id)
        .await
        .unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_entry_amount_overflow_is_rejected_without_writes() {
    let books = Books::open().await;
    let before = Utc::now() - Duration::seconds(1);
    let input = CreateTransactionInput {
        company_id: books.ctx.company_id,
        transactions: vec![JournalEntryInput::new(
            "too large",
            vec![
                PostingInput::debit(books.cash, Decimal::MAX, "a"),
                PostingInput::debit(books.cash, Decimal::MAX, "b"),
                PostingInput::credit(books.revenue, Decimal::MAX, "c"),
                PostingInput::credit(books.revenue, Decimal::MAX, "d"),
            ],
        )],
        ..Default::default()
    };

    let err = books
        .engine
        .create_transaction(&books.ctx, input)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AmountOverflow { entry: 0 }));
    assert_eq!(err.error_code(), "AMOUNT_OVERFLOW");

    assert_eq!(books.balance(books.cash).await, Decimal::ZERO);
    assert_eq!(books.balance(books.revenue).await, Decimal::ZERO);
    let events: Vec<AuditEventType> = books
        .engine
        .company_audit_history(
            &books.ctx,
            books.ctx.company_id,
            before,
            Utc::now() + Duration::seconds(1),
        )
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.event)
        .collect();
    assert_eq!(events, vec![AuditEventType::Rejected]);
}

#[tokio::test]
async fn test_balance_overflow_marks_transaction_failed() {
    let books = Books::open().await;
    let before = Utc::now() - Duration::seconds(1);
    books
        .engine
        .create_transaction(&books.ctx, books.sale(Decimal::MAX, Decimal::MAX))
        .await
        .unwrap();

    let err = books
        .engine
        .create_transaction(&books.ctx, books.sale(dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::BalanceOverflow(id) if id == books.cash));

    let cash = books
        .engine
        .account_balance(&books.ctx, books.cash)
        .await
        .unwrap();
    assert_eq!(cash.balance, Decimal::MAX);
    assert_eq!(cash.version, 1);

    let records = books
        .engine
        .company_audit_history(
            &books.ctx,
            books.ctx.company_id,
            before,
            Utc::now() + Duration::seconds(1),
        )
        .await
        .unwrap();
    let failed_id = records
        .iter()
        .find(|r| r.event == AuditEventType::Rejected)
        .map(|r| r.transaction_id)
        .unwrap();
    let failed = books
        .engine
        .get_transaction(&books.ctx, failed_id)
        .await
        .unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert!(failed.postings.is_empty());
}
