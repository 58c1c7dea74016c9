//! Builders for audit records.
//!
//! The recorder only produces records; they are persisted by the store in
//! the same write as the transition they describe.

use accord_shared::types::{AuditRecordId, CompanyId, TransactionId, UserId};
use chrono::{DateTime, Utc};

use super::types::{AuditEventType, AuditRecord};
use crate::ledger::types::TransactionTotals;

/// Stateless audit record builder.
pub struct AuditRecorder;

impl AuditRecorder {
    /// Record for a transaction persisted as pending.
    #[must_use]
    pub fn created(
        transaction_id: TransactionId,
        company_id: CompanyId,
        actor: UserId,
        totals: TransactionTotals,
        at: DateTime<Utc>,
    ) -> AuditRecord {
        Self::record(transaction_id, company_id, AuditEventType::Created, actor, totals, at)
    }

    /// Record for a committed transaction.
    ///
    /// For compensations `compensates` links back to the original.
    #[must_use]
    pub fn committed(
        transaction_id: TransactionId,
        company_id: CompanyId,
        actor: UserId,
        totals: TransactionTotals,
        at: DateTime<Utc>,
        compensates: Option<TransactionId>,
    ) -> AuditRecord {
        AuditRecord {
            related_transaction_id: compensates,
            ..Self::record(
                transaction_id,
                company_id,
                AuditEventType::Committed,
                actor,
                totals,
                at,
            )
        }
    }

    /// Record for a rejected request or failed transaction.
    #[must_use]
    pub fn rejected(
        transaction_id: TransactionId,
        company_id: CompanyId,
        actor: UserId,
        totals: TransactionTotals,
        at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> AuditRecord {
        AuditRecord {
            reason: Some(reason.into()),
            ..Self::record(
                transaction_id,
                company_id,
                AuditEventType::Rejected,
                actor,
                totals,
                at,
            )
        }
    }

    /// Record for the original transaction when it is rolled back.
    #[must_use]
    pub fn rolled_back(
        transaction_id: TransactionId,
        company_id: CompanyId,
        actor: UserId,
        totals: TransactionTotals,
        at: DateTime<Utc>,
        compensating_id: TransactionId,
        reason: Option<String>,
    ) -> AuditRecord {
        AuditRecord {
            reason,
            related_transaction_id: Some(compensating_id),
            ..Self::record(
                transaction_id,
                company_id,
                AuditEventType::RolledBack,
                actor,
                totals,
                at,
            )
        }
    }

    fn record(
        transaction_id: TransactionId,
        company_id: CompanyId,
        event: AuditEventType,
        actor: UserId,
        totals: TransactionTotals,
        at: DateTime<Utc>,
    ) -> AuditRecord {
        AuditRecord {
            id: AuditRecordId::new(),
            transaction_id,
            company_id,
            event,
            actor,
            at,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            reason: None,
            related_transaction_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejected_carries_reason_and_totals() {
        let record = AuditRecorder::rejected(
            TransactionId::new(),
            CompanyId::new(),
            UserId::new(),
            TransactionTotals::new(dec!(1000.00), dec!(900.00)),
            Utc::now(),
            "not balanced",
        );
        assert_eq!(record.event, AuditEventType::Rejected);
        assert_eq!(record.reason.as_deref(), Some("not balanced"));
        assert_eq!(record.total_debit, dec!(1000.00));
        assert_eq!(record.total_credit, dec!(900.00));
        assert!(record.related_transaction_id.is_none());
    }

    #[test]
    fn test_rolled_back_links_compensation() {
        let compensating = TransactionId::new();
        let record = AuditRecorder::rolled_back(
            TransactionId::new(),
            CompanyId::new(),
            UserId::new(),
            TransactionTotals::new(dec!(5), dec!(5)),
            Utc::now(),
            compensating,
            Some("duplicate invoice".to_string()),
        );
        assert_eq!(record.event, AuditEventType::RolledBack);
        assert_eq!(record.related_transaction_id, Some(compensating));
    }

    #[test]
    fn test_each_record_gets_unique_id() {
        let id = TransactionId::new();
        let company = CompanyId::new();
        let actor = UserId::new();
        let now = Utc::now();
        let a = AuditRecorder::created(id, company, actor, TransactionTotals::zero(), now);
        let b = AuditRecorder::committed(id, company, actor, TransactionTotals::zero(), now, None);
        assert_ne!(a.id, b.id);
        assert_eq!(b.event, AuditEventType::Committed);
    }

    #[test]
    fn test_event_type_parse() {
        for event in [
            AuditEventType::Created,
            AuditEventType::Committed,
            AuditEventType::Rejected,
            AuditEventType::RolledBack,
        ] {
            assert_eq!(AuditEventType::parse(event.as_str()), Some(event));
        }
        assert_eq!(AuditEventType::parse("deleted"), None);
    }
}
