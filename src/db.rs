//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use crate::config::DatabaseSettings;

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Configuration
///
/// - Maximum connections and acquire timeout come from [`DatabaseSettings`]
///   (5 / 5 s locally, 10 / 60 s in production)
/// - Connections are created lazily as needed and kept alive for reuse
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the first
/// connection cannot be established.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.connect_timeout)
        .connect(&settings.url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each one runs
/// only once.
///
/// # Migration Files
///
/// - `..._create_accounts.sql`: users, account types, bank accounts, sessions
/// - `..._create_transactions.sql`: the append-only ledger
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro embeds ./migrations at compile time
    sqlx::migrate!("./migrations").run(pool).await
}
