//! Compensating entries for rolling back a committed transaction.

use accord_shared::types::TransactionId;

use crate::ledger::types::{JournalEntryInput, LedgerTransaction, PostingInput};

/// Prefix applied to every reversed description.
pub const REVERSAL_PREFIX: &str = "Reversal: ";

/// Output of [`CompensationBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensation {
    /// The transaction being reversed.
    pub original_id: TransactionId,
    /// Mirrored journal entries, in the original order.
    pub entries: Vec<JournalEntryInput>,
    /// Description of the compensating transaction.
    pub description: String,
}

/// Stateless builder for compensating entries.
pub struct CompensationBuilder;

impl CompensationBuilder {
    /// Mirrors every posting of `original`.
    ///
    /// For each posting:
    /// - the debit amount becomes the credit amount and vice versa
    /// - account and amount are preserved
    /// - the description is prefixed with "Reversal: "
    #[must_use]
    pub fn build(original: &LedgerTransaction, reason: Option<&str>) -> Compensation {
        let entries = original
            .entries
            .iter()
            .map(|entry| JournalEntryInput {
                description: reversed(&entry.description),
                lines: entry
                    .postings
                    .iter()
                    .map(|posting| PostingInput {
                        account_id: posting.account_id,
                        debit_amount: posting.credit_amount,
                        credit_amount: posting.debit_amount,
                        description: reversed(&posting.description),
                    })
                    .collect(),
            })
            .collect();

        let description = match reason {
            Some(reason) => format!(
                "Reversal of transaction {}. Reason: {reason}",
                original.id
            ),
            None => format!("Reversal of transaction {}", original.id),
        };

        Compensation {
            original_id: original.id,
            entries,
            description,
        }
    }
}

fn reversed(description: &str) -> String {
    format!("{REVERSAL_PREFIX}{description}")
}
