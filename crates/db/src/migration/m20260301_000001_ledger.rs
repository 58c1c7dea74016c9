//! Ledger schema migration.
//!
//! Creates accounts, transactions, journal entries, postings, groups and the
//! append-only audit trail, plus the triggers guarding immutable rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: TRANSACTIONS & POSTINGS
        // ============================================================
        db.execute_unprepared(TRANSACTION_GROUPS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(POSTINGS_SQL).await?;
        db.execute_unprepared(TRANSACTION_GROUP_MEMBERS_SQL).await?;

        // ============================================================
        // PART 3: AUDIT TRAIL
        // ============================================================
        db.execute_unprepared(AUDIT_RECORDS_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0 CHECK (version >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_accounts_company ON accounts(company_id);
";

const TRANSACTION_GROUPS_SQL: &str = r"
CREATE TABLE transaction_groups (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL CHECK (btrim(name) <> ''),
    description TEXT,
    status VARCHAR(16) NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'closed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_transaction_groups_company_name UNIQUE (company_id, name)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    group_id UUID REFERENCES transaction_groups(id),
    description TEXT,
    status VARCHAR(16) NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'completed', 'failed', 'rolled_back')),
    metadata JSONB NOT NULL DEFAULT '{}',
    total_debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at TIMESTAMPTZ,
    rolled_back_at TIMESTAMPTZ,
    failure_reason TEXT,
    compensated_by UUID REFERENCES transactions(id),
    compensates UUID REFERENCES transactions(id),

    CONSTRAINT chk_completed_at CHECK (
        status NOT IN ('completed', 'rolled_back') OR completed_at IS NOT NULL
    ),
    CONSTRAINT chk_rolled_back_link CHECK (
        status <> 'rolled_back' OR (rolled_back_at IS NOT NULL AND compensated_by IS NOT NULL)
    )
);

CREATE INDEX idx_transactions_company ON transactions(company_id, created_at DESC);
CREATE INDEX idx_transactions_status ON transactions(status);
CREATE UNIQUE INDEX uq_transactions_compensates ON transactions(compensates)
    WHERE compensates IS NOT NULL AND status = 'completed';
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    sequence INTEGER NOT NULL CHECK (sequence >= 0),
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_journal_entries_sequence UNIQUE (transaction_id, sequence)
);
";

const POSTINGS_SQL: &str = r"
CREATE TABLE postings (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id),
    line_number INTEGER NOT NULL CHECK (line_number >= 0),
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (debit_amount >= 0),
    credit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (credit_amount >= 0),
    description TEXT NOT NULL DEFAULT '',
    account_version BIGINT NOT NULL,
    balance_after NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_one_side CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR
        (credit_amount > 0 AND debit_amount = 0)
    ),
    CONSTRAINT uq_postings_account_version UNIQUE (account_id, account_version)
);

CREATE INDEX idx_postings_transaction ON postings(transaction_id);
";

const TRANSACTION_GROUP_MEMBERS_SQL: &str = r"
CREATE TABLE transaction_group_members (
    group_id UUID NOT NULL REFERENCES transaction_groups(id) ON DELETE CASCADE,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (group_id, transaction_id)
);
";

const AUDIT_RECORDS_SQL: &str = r"
CREATE TABLE audit_records (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL UNIQUE,
    transaction_id UUID NOT NULL,
    company_id UUID NOT NULL,
    event VARCHAR(16) NOT NULL
        CHECK (event IN ('created', 'committed', 'rejected', 'rolled_back')),
    actor UUID NOT NULL,
    at TIMESTAMPTZ NOT NULL,
    total_debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    reason TEXT,
    related_transaction_id UUID
);

CREATE INDEX idx_audit_records_transaction ON audit_records(transaction_id, seq);
CREATE INDEX idx_audit_records_company_at ON audit_records(company_id, at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: reject_modification
-- Audit records and postings are append-only
-- ============================================================
CREATE OR REPLACE FUNCTION reject_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% rows are append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_audit_records_append_only
BEFORE UPDATE OR DELETE ON audit_records
FOR EACH ROW
EXECUTE FUNCTION reject_modification();

CREATE TRIGGER trg_postings_append_only
BEFORE UPDATE OR DELETE ON postings
FOR EACH ROW
EXECUTE FUNCTION reject_modification();

-- ============================================================
-- FUNCTION: guard_transaction_status
-- Only pending -> completed | failed and completed -> rolled_back
-- ============================================================
CREATE OR REPLACE FUNCTION guard_transaction_status()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = NEW.status THEN
        IF OLD.status <> 'pending' THEN
            RAISE EXCEPTION 'Cannot modify % transaction %', OLD.status, OLD.id;
        END IF;
        RETURN NEW;
    END IF;

    IF NOT (
        (OLD.status = 'pending' AND NEW.status IN ('completed', 'failed')) OR
        (OLD.status = 'completed' AND NEW.status = 'rolled_back')
    ) THEN
        RAISE EXCEPTION 'Invalid status transition from % to %', OLD.status, NEW.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_guard_transaction_status
BEFORE UPDATE ON transactions
FOR EACH ROW
EXECUTE FUNCTION guard_transaction_status();

-- ============================================================
-- FUNCTION: check_entry_balance
-- Every journal entry of a committed transaction balances
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    unbalanced_entry UUID;
BEGIN
    IF NEW.status = 'completed' AND OLD.status = 'pending' THEN
        SELECT p.journal_entry_id INTO unbalanced_entry
        FROM postings p
        WHERE p.transaction_id = NEW.id
        GROUP BY p.journal_entry_id
        HAVING SUM(p.debit_amount) <> SUM(p.credit_amount)
        LIMIT 1;

        IF unbalanced_entry IS NOT NULL THEN
            RAISE EXCEPTION 'Journal entry % is not balanced', unbalanced_entry;
        END IF;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_check_entry_balance
AFTER UPDATE ON transactions
FOR EACH ROW
EXECUTE FUNCTION check_entry_balance();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

-- Drop triggers
DROP TRIGGER IF EXISTS trg_check_entry_balance ON transactions;
DROP TRIGGER IF EXISTS trg_guard_transaction_status ON transactions;
DROP TRIGGER IF EXISTS trg_postings_append_only ON postings;
DROP TRIGGER IF EXISTS trg_audit_records_append_only ON audit_records;

-- Drop functions
DROP FUNCTION IF EXISTS check_entry_balance();
DROP FUNCTION IF EXISTS guard_transaction_status();
DROP FUNCTION IF EXISTS reject_modification();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS audit_records CASCADE;
DROP TABLE IF EXISTS transaction_group_members CASCADE;
DROP TABLE IF EXISTS postings CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS transaction_groups CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
