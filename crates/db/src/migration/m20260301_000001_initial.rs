//! Initial database migration.
//!
//! Creates the reference tables the ledger reads, the GL tables it owns and the
//! charges settlement tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: REFERENCE DATA
        // ============================================================
        db.execute_unprepared(ORGANISATIONS_SQL).await?;
        db.execute_unprepared(ENTITIES_SQL).await?;
        db.execute_unprepared(CHARGES_SQL).await?;

        // ============================================================
        // PART 2: GENERAL LEDGER
        // ============================================================
        db.execute_unprepared(GL_ACCOUNTS_SQL).await?;
        db.execute_unprepared(GL_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(GL_ENTRIES_SQL).await?;

        // ============================================================
        // PART 3: CHARGES SETTLEMENT
        // ============================================================
        db.execute_unprepared(CHARGES_PAYMENTS_SQL).await?;
        db.execute_unprepared(REFERENCE_SEQUENCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ORGANISATIONS_SQL: &str = r"
CREATE TABLE organisations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ENTITIES_SQL: &str = r"
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency_code VARCHAR(3),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE tills (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency_code VARCHAR(3),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE vaults (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency_code VARCHAR(3),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE org_balances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency_code VARCHAR(3),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_bank_accounts_org ON bank_accounts(organisation_id);
CREATE INDEX idx_tills_org ON tills(organisation_id);
CREATE INDEX idx_vaults_org ON vaults(organisation_id);
CREATE INDEX idx_org_balances_org ON org_balances(organisation_id);
";

const CHARGES_SQL: &str = r"
CREATE TABLE charges (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    charge_type VARCHAR(16) NOT NULL,
    currency_code VARCHAR(3),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_charge_type CHECK (charge_type IN ('COMMISSION', 'TAX', 'INTERNAL_FEE', 'OTHER'))
);

CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    origin_currency_code VARCHAR(3),
    amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE transaction_charges (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    charge_id UUID NOT NULL REFERENCES charges(id),
    charge_type VARCHAR(16) NOT NULL,
    internal_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    external_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_tc_charge_type CHECK (
        charge_type IN ('COMMISSION', 'TAX', 'INTERNAL_FEE', 'OTHER')
    ),
    CONSTRAINT chk_tc_status CHECK (status IN ('PENDING', 'PAID'))
);

CREATE INDEX idx_transaction_charges_pending
    ON transaction_charges(organisation_id, charge_type, created_at DESC)
    WHERE status = 'PENDING';
";

const GL_ACCOUNTS_SQL: &str = r"
CREATE TABLE gl_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(16) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    locked_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    min_balance NUMERIC(19, 4),
    max_balance NUMERIC(19, 4),
    currency_code VARCHAR(3),

    -- Bound entity: at most one of these is set
    bank_account_id UUID REFERENCES bank_accounts(id) ON DELETE SET NULL,
    till_id UUID REFERENCES tills(id) ON DELETE SET NULL,
    vault_id UUID REFERENCES vaults(id) ON DELETE SET NULL,
    charge_id UUID REFERENCES charges(id) ON DELETE SET NULL,
    org_balance_id UUID REFERENCES org_balances(id) ON DELETE SET NULL,

    opened_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    opened_by UUID,
    closed_at TIMESTAMPTZ,
    close_reason TEXT,
    frozen_at TIMESTAMPTZ,
    frozen_reason TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_gl_account_type CHECK (
        account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')
    ),
    CONSTRAINT chk_gl_account_bounds CHECK (
        min_balance IS NULL
        OR max_balance IS NULL
        OR min_balance <= max_balance
    ),
    CONSTRAINT chk_gl_account_single_entity CHECK (
        num_nonnulls(bank_account_id, till_id, vault_id, charge_id, org_balance_id) <= 1
    )
);

CREATE INDEX idx_gl_accounts_org ON gl_accounts(organisation_id);
CREATE INDEX idx_gl_accounts_bank_account
    ON gl_accounts(organisation_id, bank_account_id)
    WHERE bank_account_id IS NOT NULL;
CREATE INDEX idx_gl_accounts_till
    ON gl_accounts(organisation_id, till_id)
    WHERE till_id IS NOT NULL;
CREATE INDEX idx_gl_accounts_vault
    ON gl_accounts(organisation_id, vault_id)
    WHERE vault_id IS NOT NULL;
CREATE INDEX idx_gl_accounts_charge
    ON gl_accounts(organisation_id, charge_id)
    WHERE charge_id IS NOT NULL;
CREATE INDEX idx_gl_accounts_org_balance
    ON gl_accounts(organisation_id, org_balance_id)
    WHERE org_balance_id IS NOT NULL;
";

const GL_TRANSACTIONS_SQL: &str = r"
CREATE TABLE gl_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    transaction_type VARCHAR(32) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency_code VARCHAR(3),
    description TEXT NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'POSTED',

    vault_id UUID,
    till_id UUID,
    customer_id UUID,
    transaction_id UUID,

    reversal_of UUID REFERENCES gl_transactions(id),
    reversed_by UUID REFERENCES gl_transactions(id),
    reversal_reason TEXT,
    reversed_at TIMESTAMPTZ,

    created_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_gl_tx_amount CHECK (amount > 0),
    CONSTRAINT chk_gl_tx_status CHECK (status IN ('POSTED', 'REVERSED')),
    CONSTRAINT chk_gl_tx_reversed CHECK (
        (status = 'POSTED' AND reversed_by IS NULL)
        OR (status = 'REVERSED' AND reversed_by IS NOT NULL)
    )
);

CREATE UNIQUE INDEX idx_gl_transactions_reversal_of
    ON gl_transactions(reversal_of)
    WHERE reversal_of IS NOT NULL;
CREATE INDEX idx_gl_transactions_org_created ON gl_transactions(organisation_id, created_at DESC);
";

const GL_ENTRIES_SQL: &str = r"
CREATE TABLE gl_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    gl_transaction_id UUID NOT NULL REFERENCES gl_transactions(id) ON DELETE CASCADE,
    gl_account_id UUID NOT NULL REFERENCES gl_accounts(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL,
    dr_cr VARCHAR(8) NOT NULL,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_gl_entry_amount CHECK (amount > 0),
    CONSTRAINT chk_gl_entry_dr_cr CHECK (dr_cr IN ('DEBIT', 'CREDIT'))
);

CREATE INDEX idx_gl_entries_transaction ON gl_entries(gl_transaction_id);
CREATE INDEX idx_gl_entries_account ON gl_entries(gl_account_id);
";

const CHARGES_PAYMENTS_SQL: &str = r"
CREATE TABLE charges_payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    charge_type VARCHAR(16) NOT NULL,
    reference_number VARCHAR(64) NOT NULL UNIQUE,
    internal_total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    external_total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency_code VARCHAR(3),
    destination_org_id UUID REFERENCES organisations(id),
    status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    notes TEXT,
    created_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    date_completed TIMESTAMPTZ,
    gl_transaction_id UUID REFERENCES gl_transactions(id),
    CONSTRAINT chk_cp_charge_type CHECK (
        charge_type IN ('COMMISSION', 'TAX', 'INTERNAL_FEE', 'OTHER')
    ),
    CONSTRAINT chk_cp_status CHECK (status IN ('PENDING', 'COMPLETED', 'FAILED'))
);

CREATE TABLE charges_payment_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    charges_payment_id UUID NOT NULL REFERENCES charges_payments(id) ON DELETE CASCADE,
    transaction_charge_id UUID NOT NULL REFERENCES transaction_charges(id),
    internal_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    external_amount NUMERIC(19, 4) NOT NULL DEFAULT 0
);

CREATE INDEX idx_charges_payments_org_created ON charges_payments(organisation_id, created_at DESC);
CREATE INDEX idx_charges_payment_items_payment ON charges_payment_items(charges_payment_id);
";

const REFERENCE_SEQUENCES_SQL: &str = r"
CREATE TABLE reference_sequences (
    organisation_id UUID NOT NULL REFERENCES organisations(id) ON DELETE CASCADE,
    charge_type VARCHAR(16) NOT NULL,
    day DATE NOT NULL,
    last_value INTEGER NOT NULL,
    PRIMARY KEY (organisation_id, charge_type, day)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS reference_sequences;
DROP TABLE IF EXISTS charges_payment_items;
DROP TABLE IF EXISTS charges_payments;
DROP TABLE IF EXISTS gl_entries;
DROP TABLE IF EXISTS gl_transactions;
DROP TABLE IF EXISTS gl_accounts;
DROP TABLE IF EXISTS transaction_charges;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS charges;
DROP TABLE IF EXISTS org_balances;
DROP TABLE IF EXISTS vaults;
DROP TABLE IF EXISTS tills;
DROP TABLE IF EXISTS bank_accounts;
DROP TABLE IF EXISTS organisations;
";
