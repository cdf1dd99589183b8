//! Database layer with `SeaORM` entities and the PostgreSQL ledger store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - [`PgLedgerStore`], the serializable store backing production deployments
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{PgLedgerStore, PgLedgerTx};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection with explicit pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
