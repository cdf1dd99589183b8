//! `SeaORM` entities for the ledger tables.

pub mod audit_events;
pub mod change_events;
pub mod financeiro_mensal;
pub mod lancamentos;
pub mod ordens_servico;
pub mod processed_events;
