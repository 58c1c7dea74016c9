//! Posting validation.
//!
//! Pure structural, balance and authorization checks over a proposed
//! transaction. Nothing here touches storage: the caller supplies an account
//! lookup that maps an account to its owning company.

use accord_shared::types::{AccountId, CompanyId};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::metadata::TransactionMetadata;
use super::types::{JournalEntryInput, PostingInput, TransactionTotals};

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// Totals per journal entry, in submission order.
    pub entries: Vec<TransactionTotals>,
    /// Totals over the whole transaction.
    pub totals: TransactionTotals,
}

/// Dry-run result for one journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryValidationResult {
    /// Index of the journal entry.
    pub index: usize,
    /// Whether every check passed for this entry.
    pub is_valid: bool,
    /// Whether the entry's debits equal its credits.
    pub is_balanced: bool,
    /// Total debit of the entry.
    pub total_debit: rust_decimal::Decimal,
    /// Total credit of the entry.
    pub total_credit: rust_decimal::Decimal,
    /// Human-readable failures, empty when valid.
    pub errors: Vec<String>,
}

/// Dry-run result for a whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the transaction would be accepted.
    pub is_valid: bool,
    /// Whether every entry is balanced.
    pub is_balanced: bool,
    /// Total debit over all entries.
    pub total_debit: rust_decimal::Decimal,
    /// Total credit over all entries.
    pub total_credit: rust_decimal::Decimal,
    /// Per-entry results.
    pub per_transaction_results: Vec<EntryValidationResult>,
    /// Failures not tied to one entry (e.g. no entries at all).
    pub errors: Vec<String>,
}

/// Stateless posting validator.
pub struct PostingValidator;

impl PostingValidator {
    /// Validate a proposed transaction.
    ///
    /// Checks run in this order, and the first failure is returned:
    /// 1. Structure: at least one entry, every entry has lines, every line
    ///    has non-negative amounts with exactly one side set and names an
    ///    existing account
    /// 2. Balance: per entry, debits equal credits, and every sum stays
    ///    inside the `Decimal` range
    /// 3. Authorization: every account belongs to `company_id`, or the
    ///    metadata authorizes a cross-company transfer listing its company
    ///
    /// # Errors
    ///
    /// Returns the first `LedgerError` found.
    pub fn validate<A>(
        company_id: CompanyId,
        metadata: &TransactionMetadata,
        entries: &[JournalEntryInput],
        account_company: A,
    ) -> Result<ValidatedTransaction, LedgerError>
    where
        A: Fn(AccountId) -> Option<CompanyId>,
    {
        if entries.is_empty() {
            return Err(LedgerError::NoEntries);
        }

        for (index, entry) in entries.iter().enumerate() {
            Self::check_structure(index, entry, &account_company)?;
        }

        let mut per_entry = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            per_entry.push(Self::check_balance(index, entry)?);
        }

        for entry in entries {
            Self::check_authorization(company_id, metadata, entry, &account_company)?;
        }

        let totals = Self::sum_entries(&per_entry)?;

        Ok(ValidatedTransaction {
            entries: per_entry,
            totals,
        })
    }

    /// Validate without stopping at the first failure.
    ///
    /// Every entry is checked independently so callers get a complete
    /// pre-flight picture. Totals are sums of the submitted amounts, clamped
    /// to the `Decimal` range when they overflow.
    #[must_use]
    pub fn dry_run<A>(
        company_id: CompanyId,
        metadata: &TransactionMetadata,
        entries: &[JournalEntryInput],
        account_company: A,
    ) -> ValidationReport
    where
        A: Fn(AccountId) -> Option<CompanyId>,
    {
        let mut errors = Vec::new();
        if entries.is_empty() {
            errors.push(LedgerError::NoEntries.to_string());
        }

        let per_transaction_results: Vec<EntryValidationResult> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let exact = TransactionTotals::of_lines(&entry.lines);
                let totals =
                    exact.unwrap_or_else(|| TransactionTotals::saturating_of_lines(&entry.lines));
                let entry_errors: Vec<String> = [
                    Self::check_structure(index, entry, &account_company),
                    Self::check_balance(index, entry).map(|_| ()),
                    Self::check_authorization(company_id, metadata, entry, &account_company),
                ]
                .into_iter()
                .filter_map(Result::err)
                .map(|e| e.to_string())
                .collect();

                EntryValidationResult {
                    index,
                    is_valid: entry_errors.is_empty(),
                    is_balanced: exact.is_some_and(|t| t.is_balanced),
                    total_debit: totals.total_debit,
                    total_credit: totals.total_credit,
                    errors: entry_errors,
                }
            })
            .collect();

        let entry_totals: Vec<TransactionTotals> = per_transaction_results
            .iter()
            .map(|r| TransactionTotals::new(r.total_debit, r.total_credit))
            .collect();
        if per_transaction_results.iter().all(|r| r.is_valid)
            && let Err(e) = Self::sum_entries(&entry_totals)
        {
            errors.push(e.to_string());
        }
        let totals = entry_totals
            .iter()
            .fold(TransactionTotals::zero(), |acc, t| acc.saturating_add(*t));

        ValidationReport {
            is_valid: errors.is_empty() && per_transaction_results.iter().all(|r| r.is_valid),
            is_balanced: per_transaction_results.iter().all(|r| r.is_balanced),
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            per_transaction_results,
            errors,
        }
    }

    /// Sums per-entry totals. Overflow is reported against the entry whose
    /// amounts pushed the running sum out of range.
    fn sum_entries(entries: &[TransactionTotals]) -> Result<TransactionTotals, LedgerError> {
        entries
            .iter()
            .enumerate()
            .try_fold(TransactionTotals::zero(), |acc, (entry, t)| {
                acc.checked_add(*t)
                    .ok_or(LedgerError::AmountOverflow { entry })
            })
    }

    fn check_structure<A>(
        index: usize,
        entry: &JournalEntryInput,
        account_company: &A,
    ) -> Result<(), LedgerError>
    where
        A: Fn(AccountId) -> Option<CompanyId>,
    {
        if entry.lines.is_empty() {
            return Err(LedgerError::EmptyEntry { entry: index });
        }
        for (line, posting) in entry.lines.iter().enumerate() {
            Self::check_posting(index, line, posting)?;
            if account_company(posting.account_id).is_none() {
                return Err(LedgerError::AccountNotFound(posting.account_id));
            }
        }
        Ok(())
    }

    fn check_posting(entry: usize, line: usize, posting: &PostingInput) -> Result<(), LedgerError> {
        let debit = posting.debit_amount;
        let credit = posting.credit_amount;

        if debit.is_sign_negative() && !debit.is_zero()
            || credit.is_sign_negative() && !credit.is_zero()
        {
            return Err(LedgerError::NegativeAmount { entry, line });
        }
        match (debit.is_zero(), credit.is_zero()) {
            (true, true) => Err(LedgerError::ZeroPosting { entry, line }),
            (false, false) => Err(LedgerError::BothSidesPosted { entry, line }),
            _ => Ok(()),
        }
    }

    fn check_balance(index: usize, entry: &JournalEntryInput) -> Result<TransactionTotals, LedgerError> {
        let totals = TransactionTotals::of_lines(&entry.lines)
            .ok_or(LedgerError::AmountOverflow { entry: index })?;
        if !totals.is_balanced {
            return Err(LedgerError::Unbalanced {
                entry: index,
                total_debit: totals.total_debit,
                total_credit: totals.total_credit,
            });
        }
        Ok(totals)
    }

    fn check_authorization<A>(
        company_id: CompanyId,
        metadata: &TransactionMetadata,
        entry: &JournalEntryInput,
        account_company: &A,
    ) -> Result<(), LedgerError>
    where
        A: Fn(AccountId) -> Option<CompanyId>,
    {
        for posting in &entry.lines {
            // Missing accounts are reported by the structural check.
            let Some(owner) = account_company(posting.account_id) else {
                continue;
            };
            if metadata.permits(company_id, owner) {
                continue;
            }
            return Err(if metadata.is_cross_company() {
                LedgerError::CrossCompanyNotAllowed {
                    account_id: posting.account_id,
                    company_id: owner,
                }
            } else {
                LedgerError::CompanyMismatch {
                    account_id: posting.account_id,
                    account_company: owner,
                    request_company: company_id,
                }
            });
        }
        Ok(())
    }
}
