//! Ledger schema.
//!
//! Entries and orders are stored as JSON documents with the columns queries
//! filter on pulled out next to them. Rollups, markers, audit events and the
//! change-event outbox are plain tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(LANCAMENTOS_SQL).await?;
        db.execute_unprepared(ORDENS_SERVICO_SQL).await?;
        db.execute_unprepared(FINANCEIRO_MENSAL_SQL).await?;
        db.execute_unprepared(PROCESSED_EVENTS_SQL).await?;
        db.execute_unprepared(AUDIT_EVENTS_SQL).await?;
        db.execute_unprepared(CHANGE_EVENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const LANCAMENTOS_SQL: &str = r"
CREATE TABLE lancamentos (
    id UUID PRIMARY KEY,
    empresa_id UUID NOT NULL,
    tipo VARCHAR(10) NOT NULL,
    status VARCHAR(12) NOT NULL,
    valor NUMERIC(19, 4) NOT NULL,
    data_competencia TIMESTAMPTZ,
    data_vencimento TIMESTAMPTZ,
    data_pagamento TIMESTAMPTZ,
    id_os UUID,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_lancamentos_tipo CHECK (tipo IN ('ENTRADA', 'SAIDA')),
    CONSTRAINT chk_lancamentos_valor CHECK (valor >= 0)
);

CREATE INDEX idx_lancamentos_empresa ON lancamentos(empresa_id);
CREATE INDEX idx_lancamentos_vencimento ON lancamentos(empresa_id, data_vencimento);
CREATE INDEX idx_lancamentos_os ON lancamentos(empresa_id, id_os) WHERE id_os IS NOT NULL;
";

const ORDENS_SERVICO_SQL: &str = r"
CREATE TABLE ordens_servico (
    id UUID PRIMARY KEY,
    empresa_id UUID NOT NULL,
    status VARCHAR(20) NOT NULL,
    document JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_ordens_servico_empresa ON ordens_servico(empresa_id);
";

const FINANCEIRO_MENSAL_SQL: &str = r"
CREATE TABLE financeiro_mensal (
    empresa_id UUID NOT NULL,
    month_key VARCHAR(7) NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    entradas NUMERIC(19, 4) NOT NULL DEFAULT 0,
    saidas NUMERIC(19, 4) NOT NULL DEFAULT 0,
    saldo NUMERIC(19, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (empresa_id, month_key),
    CONSTRAINT chk_financeiro_mensal_month CHECK (month BETWEEN 1 AND 12)
);
";

const PROCESSED_EVENTS_SQL: &str = r"
CREATE TABLE processed_events (
    empresa_id UUID NOT NULL,
    event_id UUID NOT NULL,
    handler VARCHAR(64) NOT NULL,
    kind VARCHAR(32) NOT NULL,
    id_os UUID,
    lancamento_id UUID,
    before_month VARCHAR(7),
    after_month VARCHAR(7),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (empresa_id, event_id, handler)
);
";

const AUDIT_EVENTS_SQL: &str = r"
CREATE TABLE audit_events (
    id UUID PRIMARY KEY,
    empresa_id UUID NOT NULL,
    event_type VARCHAR(32) NOT NULL,
    lancamento_id UUID,
    id_os UUID,
    actor VARCHAR(128),
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_events_empresa ON audit_events(empresa_id, created_at);
";

const CHANGE_EVENTS_SQL: &str = r"
CREATE TABLE change_events (
    seq BIGSERIAL PRIMARY KEY,
    id UUID NOT NULL UNIQUE,
    empresa_id UUID NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    change JSONB NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    status VARCHAR(10) NOT NULL DEFAULT 'PENDING',
    last_error TEXT,
    CONSTRAINT chk_change_events_status CHECK (status IN ('PENDING', 'DELIVERED', 'PARKED'))
);

CREATE INDEX idx_change_events_pending ON change_events(seq) WHERE status = 'PENDING';
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS change_events CASCADE;
DROP TABLE IF EXISTS audit_events CASCADE;
DROP TABLE IF EXISTS processed_events CASCADE;
DROP TABLE IF EXISTS financeiro_mensal CASCADE;
DROP TABLE IF EXISTS ordens_servico CASCADE;
DROP TABLE IF EXISTS lancamentos CASCADE;
";
