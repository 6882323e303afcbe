//! # Database Migration Management
//!
//! Schema migrations are embedded in the binary from `migrations/` and applied
//! on startup when `database.auto_migrate` is enabled, or on demand through
//! `safevault database migrate`.

use crate::errors::{Result, SafeVaultError};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::migrate::Migrator;
use tracing::{error, info};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migration information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub execution_time_ms: i64,
    pub success: bool,
}

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!(available = MIGRATOR.iter().count(), "Starting database migration process");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Database migration failed");
        SafeVaultError::from(e)
    })?;

    let version = get_migration_version(pool).await?;
    info!(version = version, "Database migrations completed");

    Ok(())
}

/// Latest applied migration version (0 when none have run)
pub async fn get_migration_version(pool: &DbPool) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await
    .or_else(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("no such table") => Ok(None),
        e => Err(SafeVaultError::database(e, "Failed to read migration version")),
    })?;

    Ok(version.unwrap_or(0))
}

/// List applied migrations, oldest first
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    let rows = sqlx::query_as::<_, (i64, String, chrono::DateTime<chrono::Utc>, i64, bool)>(
        "SELECT version, description, installed_on, execution_time, success \
         FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => Ok(rows
            .into_iter()
            .map(|(version, description, installed_on, execution_time, success)| MigrationInfo {
                version,
                description,
                installed_on,
                execution_time_ms: execution_time / 1_000_000,
                success,
            })
            .collect()),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("no such table") => {
            Ok(Vec::new())
        }
        Err(e) => Err(SafeVaultError::database(e, "Failed to list applied migrations")),
    }
}

/// Embedded migrations not yet applied, as `(version, description)`
pub async fn pending_migrations(pool: &DbPool) -> Result<Vec<(i64, String)>> {
    let applied: Vec<i64> = list_applied_migrations(pool)
        .await?
        .into_iter()
        .filter(|m| m.success)
        .map(|m| m.version)
        .collect();

    Ok(MIGRATOR
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .map(|m| (m.version, m.description.to_string()))
        .collect())
}

/// Whether every embedded migration has been applied
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    let pending = pending_migrations(pool).await?;

    if !pending.is_empty() {
        let versions: Vec<i64> = pending.iter().map(|(v, _)| *v).collect();
        tracing::warn!(missing = ?versions, "Pending migrations");
    }

    Ok(pending.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::memory_pool;

    #[tokio::test]
    async fn test_migrations_apply_and_report() {
        let pool = memory_pool().await;
        assert_eq!(get_migration_version(&pool).await.unwrap(), 0);
        assert!(!validate_migrations(&pool).await.unwrap());
        assert_eq!(pending_migrations(&pool).await.unwrap().len(), MIGRATOR.iter().count());

        run_migrations(&pool).await.unwrap();

        let applied = list_applied_migrations(&pool).await.unwrap();
        assert_eq!(applied.len(), MIGRATOR.iter().count());
        assert!(validate_migrations(&pool).await.unwrap());
        assert!(pending_migrations(&pool).await.unwrap().is_empty());
        assert_eq!(get_migration_version(&pool).await.unwrap(), 20250301000003);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert!(validate_migrations(&pool).await.unwrap());
    }
}
