//! Property-based tests for compensating entries.

use accord_shared::types::{AccountId, CompanyId, JournalEntryId, PostingId, TransactionId, UserId};
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::compensation::{CompensationBuilder, REVERSAL_PREFIX};
use crate::ledger::balance::derive_balances;
use crate::ledger::metadata::TransactionMetadata;
use crate::ledger::types::{
    JournalEntry, LedgerTransaction, Posting, TransactionStatus, TransactionTotals,
};

/// Strategy for generating positive amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for balanced journal entries: each is a set of debit/credit
/// pairs over a small pool of accounts.
fn arb_entries() -> impl Strategy<Value = Vec<Vec<(usize, usize, Decimal)>>> {
    prop::collection::vec(
        prop::collection::vec((0usize..4, 0usize..4, arb_amount()), 1..4),
        1..4,
    )
}

fn build_transaction(accounts: &[AccountId], layout: &[Vec<(usize, usize, Decimal)>]) -> LedgerTransaction {
    let id = TransactionId::new();
    let entries: Vec<JournalEntry> = (0u32..)
        .zip(layout)
        .map(|(sequence, pairs)| {
            let entry_id = JournalEntryId::new();
            let mut postings = Vec::new();
            for (debit, credit, amount) in pairs {
                for (account, dr, cr) in [
                    (accounts[*debit], *amount, Decimal::ZERO),
                    (accounts[*credit], Decimal::ZERO, *amount),
                ] {
                    postings.push(Posting {
                        id: PostingId::new(),
                        transaction_id: id,
                        journal_entry_id: entry_id,
                        line_number: u32::try_from(postings.len()).unwrap_or(u32::MAX),
                        account_id: account,
                        debit_amount: dr,
                        credit_amount: cr,
                        description: "line".to_string(),
                        account_version: 0,
                        balance_after: Decimal::ZERO,
                    });
                }
            }
            JournalEntry {
                id: entry_id,
                transaction_id: id,
                sequence,
                description: "entry".to_string(),
                postings,
            }
        })
        .collect();
    let totals = entries
        .iter()
        .fold(TransactionTotals::zero(), |acc, e| acc.saturating_add(e.totals()));

    LedgerTransaction {
        id,
        company_id: CompanyId::new(),
        group_id: None,
        description: None,
        status: TransactionStatus::Completed,
        metadata: TransactionMetadata::default(),
        total_debit: totals.total_debit,
        total_credit: totals.total_credit,
        created_by: UserId::new(),
        created_at: Utc::now(),
        completed_at: Some(Utc::now()),
        rolled_back_at: None,
        failure_reason: None,
        compensated_by: None,
        compensates: None,
        entries,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every compensating line mirrors its original: same account, sides
    /// swapped, description prefixed.
    #[test]
    fn prop_compensation_mirrors_original(layout in arb_entries()) {
        let accounts: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
        let original = build_transaction(&accounts, &layout);

        let compensation = CompensationBuilder::build(&original, None);

        prop_assert_eq!(compensation.entries.len(), original.entries.len());
        for (mirror, entry) in compensation.entries.iter().zip(&original.entries) {
            prop_assert_eq!(mirror.lines.len(), entry.postings.len());
            for (line, posting) in mirror.lines.iter().zip(&entry.postings) {
                prop_assert_eq!(line.account_id, posting.account_id);
                prop_assert_eq!(line.debit_amount, posting.credit_amount);
                prop_assert_eq!(line.credit_amount, posting.debit_amount);
                prop_assert!(line.description.starts_with(REVERSAL_PREFIX));
            }
        }
    }

    /// Every compensating entry is balanced because its original was.
    #[test]
    fn prop_compensation_balanced(layout in arb_entries()) {
        let accounts: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
        let original = build_transaction(&accounts, &layout);

        let compensation = CompensationBuilder::build(&original, Some("test"));

        for entry in &compensation.entries {
            prop_assert!(TransactionTotals::of_lines(&entry.lines).is_some_and(|t| t.is_balanced));
        }
    }

    /// Original plus compensation nets every account back to zero.
    #[test]
    fn prop_original_plus_compensation_nets_to_zero(layout in arb_entries()) {
        let accounts: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
        let original = build_transaction(&accounts, &layout);
        let compensation = CompensationBuilder::build(&original, None);

        let mirrored: Vec<Posting> = compensation
            .entries
            .iter()
            .flat_map(|e| e.lines.iter())
            .map(|line| Posting {
                id: PostingId::new(),
                transaction_id: TransactionId::new(),
                journal_entry_id: JournalEntryId::new(),
                line_number: 0,
                account_id: line.account_id,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                description: line.description.clone(),
                account_version: 0,
                balance_after: Decimal::ZERO,
            })
            .collect();

        let balances = derive_balances(original.postings().chain(mirrored.iter())).unwrap();
        for balance in balances.values() {
            prop_assert_eq!(balance.balance, Decimal::ZERO);
        }
    }
}
