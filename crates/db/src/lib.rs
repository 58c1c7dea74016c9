//! PostgreSQL persistence for the Accord ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger schema
//! - [`PgLedgerStore`], the PostgreSQL [`LedgerStore`](accord_core::store::LedgerStore)
//! - Database migrations

mod convert;
mod error;

pub mod entities;
pub mod migration;
pub mod store;

pub use store::PgLedgerStore;

use accord_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool using the configured limits.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
