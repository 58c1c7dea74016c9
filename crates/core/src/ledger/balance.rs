//! Account balance calculations.
//!
//! Balances are signed: `balance += debit - credit`. Every committed posting
//! advances its account's version by one, so a posting's `account_version`
//! orders it within the account's history.

use std::collections::HashMap;

use accord_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::Posting;

/// Account balance derived from committed postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance (debit_total - credit_total).
    pub balance: Decimal,
    /// Number of postings applied.
    pub posting_count: u64,
}

impl AccountBalance {
    /// Creates an empty balance.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
            posting_count: 0,
        }
    }

    /// Adds a debit amount.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if a total leaves the `Decimal` range; the
    /// balance is left unchanged.
    pub fn add_debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let debit_total = self.checked(self.debit_total.checked_add(amount))?;
        self.settle(debit_total, self.credit_total)
    }

    /// Adds a credit amount.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if a total leaves the `Decimal` range; the
    /// balance is left unchanged.
    pub fn add_credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        let credit_total = self.checked(self.credit_total.checked_add(amount))?;
        self.settle(self.debit_total, credit_total)
    }

    /// Applies one posting.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` as for [`Self::add_debit`].
    pub fn apply(&mut self, posting: &Posting) -> Result<(), LedgerError> {
        let mut next = self.clone();
        next.add_debit(posting.debit_amount)?;
        next.add_credit(posting.credit_amount)?;
        next.posting_count += 1;
        *self = next;
        Ok(())
    }

    fn settle(&mut self, debit_total: Decimal, credit_total: Decimal) -> Result<(), LedgerError> {
        self.balance = self.checked(debit_total.checked_sub(credit_total))?;
        self.debit_total = debit_total;
        self.credit_total = credit_total;
        Ok(())
    }

    fn checked(&self, value: Option<Decimal>) -> Result<Decimal, LedgerError> {
        value.ok_or(LedgerError::BalanceOverflow(self.account_id))
    }
}

/// Recomputes per-account balances from a set of postings.
///
/// The result is independent of the order postings are supplied in.
///
/// # Errors
///
/// Returns `BalanceOverflow` for the first account whose totals leave the
/// `Decimal` range.
pub fn derive_balances<'a, I>(postings: I) -> Result<HashMap<AccountId, AccountBalance>, LedgerError>
where
    I: IntoIterator<Item = &'a Posting>,
{
    let mut balances: HashMap<AccountId, AccountBalance> = HashMap::new();
    for posting in postings {
        balances
            .entry(posting.account_id)
            .or_insert_with(|| AccountBalance::new(posting.account_id))
            .apply(posting)?;
    }
    Ok(balances)
}

/// Running balance state of one account while postings are staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Account version (monotonically increasing).
    pub account_version: i64,
    /// Balance before the last applied posting.
    pub previous_balance: Decimal,
    /// Balance after the last applied posting.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Starts from an account's stored version and balance.
    #[must_use]
    pub fn from_stored(version: i64, balance: Decimal) -> Self {
        Self {
            account_version: version,
            previous_balance: balance,
            current_balance: balance,
        }
    }

    /// Returns the state after applying a posting of `debit` / `credit`,
    /// or `None` if the balance or version would leave its range.
    ///
    /// `current_balance[N] = current_balance[N-1] + debit - credit` and
    /// `previous_balance[N] = current_balance[N-1]`.
    #[must_use]
    pub fn next(&self, debit: Decimal, credit: Decimal) -> Option<Self> {
        Some(Self {
            account_version: self.account_version.checked_add(1)?,
            previous_balance: self.current_balance,
            current_balance: self
                .current_balance
                .checked_add(debit)?
                .checked_sub(credit)?,
        })
    }
}
