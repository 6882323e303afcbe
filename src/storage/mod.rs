//! # Storage and Persistence
//!
//! Local authoritative record store for SafeVault: secret metadata, the
//! security audit log and the principal directory, all in SQLite.

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    get_migration_version, list_applied_migrations, pending_migrations,
    run_migrations as run_db_migrations,
    validate_migrations, MigrationInfo,
};
pub use pool::{create_pool, get_pool_stats, sanitize_url, DbPool, PoolStats};
pub use repositories::{
    PrincipalRepository, RecipientResolver, SecretRecordRepository, SecurityEventRepository,
    SqlxPrincipalRepository, SqlxSecretRecordRepository, SqlxSecurityEventRepository,
    SyncAddition, SyncReport, UpsertSecretRecord,
};

use crate::db_span;
use crate::errors::{Result, SafeVaultError};
use tracing::Instrument;

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    migrations::run_migrations(pool).await
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .instrument(db_span!("check_connection"))
        .await
        .map_err(|e| SafeVaultError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
