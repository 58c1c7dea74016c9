//! Property-based tests for posting validation.

use std::collections::HashMap;

use accord_shared::types::{AccountId, CompanyId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::metadata::TransactionMetadata;
use super::types::{JournalEntryInput, PostingInput};
use super::validation::PostingValidator;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate any non-negative whole amount up to `Decimal::MAX`.
fn any_amount() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>())
        .prop_map(|(lo, mid, hi)| Decimal::from_parts(lo, mid, hi, false, 0))
}

/// Strategy to generate an amount of at least half of `Decimal::MAX`, so any
/// two of them overflow when added.
fn huge_amount() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), 0x8000_0000u32..=u32::MAX)
        .prop_map(|(lo, mid, hi)| Decimal::from_parts(lo, mid, hi, false, 0))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

struct Fixture {
    company: CompanyId,
    accounts: Vec<AccountId>,
    owners: HashMap<AccountId, CompanyId>,
}

impl Fixture {
    fn new(count: usize) -> Self {
        let company = CompanyId::new();
        let accounts: Vec<AccountId> = (0..count).map(|_| AccountId::new()).collect();
        let owners = accounts.iter().map(|id| (*id, company)).collect();
        Self {
            company,
            accounts,
            owners,
        }
    }

    fn validate(&self, entries: &[JournalEntryInput]) -> Result<(), LedgerError> {
        PostingValidator::validate(
            self.company,
            &TransactionMetadata::default(),
            entries,
            |id| self.owners.get(&id).copied(),
        )
        .map(|_| ())
    }

    /// A balanced entry: each debit is matched by one credit of the same amount.
    fn balanced_entry(&self, amounts: &[Decimal]) -> JournalEntryInput {
        let mut lines = Vec::with_capacity(amounts.len() * 2);
        for (i, amount) in amounts.iter().enumerate() {
            let debit_account = self.accounts[i % self.accounts.len()];
            let credit_account = self.accounts[(i + 1) % self.accounts.len()];
            lines.push(PostingInput::debit(debit_account, *amount, "dr"));
            lines.push(PostingInput::credit(credit_account, *amount, "cr"));
        }
        JournalEntryInput::new("generated", lines)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Entries whose debits mirror their credits are always accepted, and the
    /// reported totals equal the sum of the generated amounts.
    #[test]
    fn prop_balanced_entries_accepted(
        entries in prop::collection::vec(prop::collection::vec(positive_amount(), 1..6), 1..5),
    ) {
        let fixture = Fixture::new(4);
        let inputs: Vec<JournalEntryInput> =
            entries.iter().map(|amounts| fixture.balanced_entry(amounts)).collect();

        let validated = PostingValidator::validate(
            fixture.company,
            &TransactionMetadata::default(),
            &inputs,
            |id| fixture.owners.get(&id).copied(),
        );
        prop_assert!(validated.is_ok(), "balanced input rejected: {:?}", validated);

        let validated = validated.unwrap();
        let expected: Decimal = entries.iter().flatten().copied().sum();
        prop_assert!(validated.totals.is_balanced);
        prop_assert_eq!(validated.totals.total_debit, expected);
        prop_assert_eq!(validated.totals.total_credit, expected);
        prop_assert_eq!(validated.entries.len(), inputs.len());
    }

    /// Any entry whose debit and credit sums differ is rejected as unbalanced,
    /// and the error carries the entry's exact sums.
    #[test]
    fn prop_unbalanced_rejected(
        amount in positive_amount(),
        skew in positive_amount(),
    ) {
        let fixture = Fixture::new(2);
        let entry = JournalEntryInput::new(
            "skewed",
            vec![
                PostingInput::debit(fixture.accounts[0], amount + skew, "dr"),
                PostingInput::credit(fixture.accounts[1], amount, "cr"),
            ],
        );

        let result = fixture.validate(&[entry]);
        prop_assert!(
            matches!(
                result,
                Err(LedgerError::Unbalanced { entry: 0, total_debit, total_credit })
                    if total_debit == amount + skew && total_credit == amount
            ),
            "expected unbalanced, got {:?}",
            result
        );
    }

    /// A single unbalanced entry anywhere fails the whole transaction.
    #[test]
    fn prop_one_bad_entry_fails_all(
        good in prop::collection::vec(positive_amount(), 1..4),
        position in 0usize..4,
        skew in positive_amount(),
    ) {
        let fixture = Fixture::new(3);
        let mut inputs: Vec<JournalEntryInput> =
            good.iter().map(|a| fixture.balanced_entry(&[*a])).collect();
        let position = position.min(inputs.len());
        inputs.insert(
            position,
            JournalEntryInput::new(
                "bad",
                vec![
                    PostingInput::debit(fixture.accounts[0], skew, "dr"),
                    PostingInput::credit(fixture.accounts[1], skew + Decimal::ONE, "cr"),
                ],
            ),
        );

        let result = fixture.validate(&inputs);
        prop_assert!(
            matches!(result, Err(LedgerError::Unbalanced { entry, .. }) if entry == position),
            "expected unbalanced at {}, got {:?}",
            position,
            result
        );
    }

    /// Negative amounts are rejected before the balance check.
    #[test]
    fn prop_negative_amount_rejected(
        negative in negative_amount(),
    ) {
        let fixture = Fixture::new(2);
        let entry = JournalEntryInput::new(
            "negative",
            vec![
                PostingInput::debit(fixture.accounts[0], negative, "dr"),
                PostingInput::credit(fixture.accounts[1], negative, "cr"),
            ],
        );

        let result = fixture.validate(&[entry]);
        prop_assert!(
            matches!(result, Err(LedgerError::NegativeAmount { entry: 0, line: 0 })),
            "expected negative amount, got {:?}",
            result
        );
    }

    /// A posting with both sides set is rejected even when the entry balances.
    #[test]
    fn prop_both_sides_rejected(
        amount in positive_amount(),
    ) {
        let fixture = Fixture::new(1);
        let entry = JournalEntryInput::new(
            "both",
            vec![PostingInput {
                account_id: fixture.accounts[0],
                debit_amount: amount,
                credit_amount: amount,
                description: String::new(),
            }],
        );

        let result = fixture.validate(&[entry]);
        prop_assert!(
            matches!(result, Err(LedgerError::BothSidesPosted { entry: 0, line: 0 })),
            "expected both sides posted, got {:?}",
            result
        );
    }

    /// The dry run agrees with the validator on acceptance.
    #[test]
    fn prop_dry_run_agrees_with_validate(
        amount in positive_amount(),
        credit in positive_amount(),
    ) {
        let fixture = Fixture::new(2);
        let entry = JournalEntryInput::new(
            "maybe",
            vec![
                PostingInput::debit(fixture.accounts[0], amount, "dr"),
                PostingInput::credit(fixture.accounts[1], credit, "cr"),
            ],
        );
        let entries = [entry];

        let report = PostingValidator::dry_run(
            fixture.company,
            &TransactionMetadata::default(),
            &entries,
            |id| fixture.owners.get(&id).copied(),
        );
        prop_assert_eq!(report.is_valid, fixture.validate(&entries).is_ok());
        prop_assert_eq!(report.is_balanced, amount == credit);
        prop_assert_eq!(report.total_debit, amount);
        prop_assert_eq!(report.total_credit, credit);
    }

    /// Two huge debits in one entry always overflow the entry sum, which is
    /// reported as a typed error rather than accepted or panicking.
    #[test]
    fn prop_entry_overflow_rejected(
        first in huge_amount(),
        second in huge_amount(),
    ) {
        let fixture = Fixture::new(2);
        let entry = fixture.balanced_entry(&[first, second]);

        let result = fixture.validate(std::slice::from_ref(&entry));
        prop_assert!(
            matches!(result, Err(LedgerError::AmountOverflow { entry: 0 })),
            "expected amount overflow, got {:?}",
            result
        );

        let report = PostingValidator::dry_run(
            fixture.company,
            &TransactionMetadata::default(),
            &[entry],
            |id| fixture.owners.get(&id).copied(),
        );
        prop_assert!(!report.is_valid);
        prop_assert_eq!(report.total_debit, Decimal::MAX);
    }

    /// Across the full amount range a balanced transaction is accepted
    /// exactly when its sums fit, and rejected with `AmountOverflow` otherwise.
    #[test]
    fn prop_full_range_amounts(
        amounts in prop::collection::vec(any_amount().prop_filter("non-zero", |a| !a.is_zero()), 1..4),
        split in any::<bool>(),
    ) {
        let fixture = Fixture::new(3);
        let entries: Vec<JournalEntryInput> = if split {
            amounts.iter().map(|a| fixture.balanced_entry(&[*a])).collect()
        } else {
            vec![fixture.balanced_entry(&amounts)]
        };
        let fits = amounts
            .iter()
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(*a))
            .is_some();

        let result = fixture.validate(&entries);
        if fits {
            prop_assert!(result.is_ok(), "in-range input rejected: {:?}", result);
        } else {
            prop_assert!(
                matches!(result, Err(LedgerError::AmountOverflow { .. })),
                "expected amount overflow, got {:?}",
                result
            );
        }
    }
}
