//! Staging: turns a validated submission into a [`StagedCommit`].
//!
//! Pure computation against the account snapshots read for this attempt.
//! Postings on the same account advance its version one by one, in
//! submission order, and record the running balance after each line.

use std::collections::HashMap;

use accord_shared::types::{AccountId, JournalEntryId, PostingId, UserId};
use chrono::{DateTime, Utc};

use super::types::Submission;
use crate::audit::recorder::AuditRecorder;
use crate::ledger::balance::RunningBalance;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{AccountSnapshot, JournalEntry, Posting, TransactionTotals};
use crate::store::{BalanceUpdate, CompensationLink, StagedCommit};

/// Stages a submission against the given account snapshots.
///
/// # Errors
///
/// Returns `AccountNotFound` if a line names an account missing from
/// `accounts`, and `BalanceOverflow` if a running balance would leave the
/// `Decimal` range.
pub fn stage(
    submission: &Submission,
    actor: UserId,
    accounts: &HashMap<AccountId, AccountSnapshot>,
    totals: TransactionTotals,
    completed_at: DateTime<Utc>,
) -> Result<StagedCommit, LedgerError> {
    let mut running: HashMap<AccountId, RunningBalance> = HashMap::new();
    let mut touched: Vec<AccountId> = Vec::new();
    let mut entries = Vec::with_capacity(submission.entries.len());

    for (sequence, input) in (0u32..).zip(&submission.entries) {
        let journal_entry_id = JournalEntryId::new();
        let mut postings = Vec::with_capacity(input.lines.len());

        for (line_number, line) in (0u32..).zip(&input.lines) {
            let state = match running.get(&line.account_id) {
                Some(state) => *state,
                None => {
                    let account = accounts
                        .get(&line.account_id)
                        .ok_or(LedgerError::AccountNotFound(line.account_id))?;
                    touched.push(line.account_id);
                    RunningBalance::from_stored(account.version, account.balance)
                }
            };
            let next = state
                .next(line.debit_amount, line.credit_amount)
                .ok_or(LedgerError::BalanceOverflow(line.account_id))?;
            running.insert(line.account_id, next);

            postings.push(Posting {
                id: PostingId::new(),
                transaction_id: submission.id,
                journal_entry_id,
                line_number,
                account_id: line.account_id,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                description: line.description.clone(),
                account_version: next.account_version,
                balance_after: next.current_balance,
            });
        }

        entries.push(JournalEntry {
            id: journal_entry_id,
            transaction_id: submission.id,
            sequence,
            description: input.description.clone(),
            postings,
        });
    }

    let balance_updates = touched
        .iter()
        .filter_map(|id| {
            let account = accounts.get(id)?;
            let state = running.get(id)?;
            Some(BalanceUpdate {
                account_id: *id,
                expected_version: account.version,
                new_version: state.account_version,
                new_balance: state.current_balance,
            })
        })
        .collect();

    let compensation = submission.compensates.as_ref().map(|c| CompensationLink {
        original_id: c.original_id,
        rolled_back_at: completed_at,
        audit: AuditRecorder::rolled_back(
            c.original_id,
            submission.company_id,
            actor,
            c.original_totals,
            completed_at,
            submission.id,
            c.reason.clone(),
        ),
    });

    Ok(StagedCommit {
        transaction_id: submission.id,
        completed_at,
        entries,
        balance_updates,
        totals,
        audit: AuditRecorder::committed(
            submission.id,
            submission.company_id,
            actor,
            totals,
            completed_at,
            submission.compensates.as_ref().map(|c| c.original_id),
        ),
        compensation,
    })
}
