//! Secret record repository
//!
//! Local authoritative store for secret metadata. Rows are unique per
//! `(owner, canonical_id)`; every write is an upsert on that pair so repeated
//! or concurrent writes converge on one row.

use crate::domain::{CanonicalId, SecretOrigin, SecretRecord, DEFAULT_CATEGORY, REMOTE_PLACEHOLDER};
use crate::errors::{Result, SafeVaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

// Database row structure

#[derive(Debug, Clone, FromRow)]
struct SecretRecordRow {
    pub id: i64,
    pub owner: String,
    pub display_name: String,
    pub canonical_id: String,
    pub value: String,
    pub description: String,
    pub category: String,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SecretRecordRow> for SecretRecord {
    type Error = SafeVaultError;

    fn try_from(row: SecretRecordRow) -> Result<Self> {
        let origin = SecretOrigin::from_str(&row.origin).map_err(|e| {
            SafeVaultError::internal(format!("Invalid origin for secret record {}: {}", row.id, e))
        })?;

        Ok(SecretRecord {
            id: row.id,
            owner: row.owner,
            display_name: row.display_name,
            canonical_id: CanonicalId::from_string(row.canonical_id),
            value: row.value,
            description: row.description,
            category: row.category,
            origin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, owner, display_name, canonical_id, value, description, category, origin, created_at, updated_at";

/// Locally authored secret to insert or overwrite
#[derive(Debug, Clone)]
pub struct UpsertSecretRecord {
    pub owner: String,
    pub display_name: String,
    pub canonical_id: CanonicalId,
    pub value: String,
    pub description: String,
    pub category: String,
}

/// Placeholder synthesized from a remote listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAddition {
    pub canonical_id: CanonicalId,
    pub display_name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Rows written by one sync batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: u64,
    pub removed: u64,
}

// Repository trait

#[async_trait]
pub trait SecretRecordRepository: Send + Sync {
    /// Insert or overwrite a locally authored record; the result is always `local`
    async fn upsert(&self, record: UpsertSecretRecord) -> Result<SecretRecord>;

    async fn find(&self, owner: &str, canonical_id: &CanonicalId) -> Result<Option<SecretRecord>>;

    /// All records of one owner, ordered by display name
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<SecretRecord>>;

    /// Delete one record. Returns whether a row was removed.
    async fn delete(&self, owner: &str, canonical_id: &CanonicalId) -> Result<bool>;

    /// Apply a sync batch atomically.
    ///
    /// Additions never overwrite a `local` row; removals only match
    /// `remote_synced` rows.
    async fn apply_sync(
        &self,
        owner: &str,
        additions: &[SyncAddition],
        removals: &[CanonicalId],
    ) -> Result<SyncReport>;

    /// Total records across all owners
    async fn count_all(&self) -> Result<i64>;
}

// SQLx implementation

#[derive(Debug, Clone)]
pub struct SqlxSecretRecordRepository {
    pool: DbPool,
}

impl SqlxSecretRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SecretRecordRepository for SqlxSecretRecordRepository {
    #[instrument(
        skip(self, record),
        fields(owner = %record.owner, canonical_id = %record.canonical_id),
        name = "db_upsert_secret_record"
    )]
    async fn upsert(&self, record: UpsertSecretRecord) -> Result<SecretRecord> {
        let now = Utc::now();
        let category = if record.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            record.category
        };

        let row = sqlx::query_as::<_, SecretRecordRow>(&format!(
            "INSERT INTO secret_records (owner, display_name, canonical_id, value, description, category, origin, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'local', $7, $8) \
             ON CONFLICT(owner, canonical_id) DO UPDATE SET \
                display_name = excluded.display_name, \
                value = excluded.value, \
                description = excluded.description, \
                category = excluded.category, \
                origin = 'local', \
                updated_at = excluded.updated_at \
             RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(&record.owner)
        .bind(&record.display_name)
        .bind(&record.canonical_id)
        .bind(&record.value)
        .bind(&record.description)
        .bind(&category)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, owner = %record.owner, canonical_id = %record.canonical_id, "Failed to upsert secret record");
            SafeVaultError::database(
                e,
                format!("Failed to upsert secret '{}' for '{}'", record.canonical_id, record.owner),
            )
        })?;

        SecretRecord::try_from(row)
    }

    #[instrument(skip(self), fields(owner = %owner, canonical_id = %canonical_id), name = "db_find_secret_record")]
    async fn find(&self, owner: &str, canonical_id: &CanonicalId) -> Result<Option<SecretRecord>> {
        let row = sqlx::query_as::<_, SecretRecordRow>(&format!(
            "SELECT {} FROM secret_records WHERE owner = $1 AND canonical_id = $2",
            SELECT_COLUMNS
        ))
        .bind(owner)
        .bind(canonical_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            SafeVaultError::database(e, format!("Failed to get secret '{}' for '{}'", canonical_id, owner))
        })?;

        row.map(SecretRecord::try_from).transpose()
    }

    #[instrument(skip(self), fields(owner = %owner), name = "db_list_secret_records")]
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<SecretRecord>> {
        let rows = sqlx::query_as::<_, SecretRecordRow>(&format!(
            "SELECT {} FROM secret_records WHERE owner = $1 ORDER BY display_name, canonical_id",
            SELECT_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SafeVaultError::database(e, format!("Failed to list secrets for '{}'", owner)))?;

        rows.into_iter().map(SecretRecord::try_from).collect()
    }

    #[instrument(skip(self), fields(owner = %owner, canonical_id = %canonical_id), name = "db_delete_secret_record")]
    async fn delete(&self, owner: &str, canonical_id: &CanonicalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM secret_records WHERE owner = $1 AND canonical_id = $2")
            .bind(owner)
            .bind(canonical_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                SafeVaultError::database(
                    e,
                    format!("Failed to delete secret '{}' for '{}'", canonical_id, owner),
                )
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, additions, removals),
        fields(owner = %owner, additions = additions.len(), removals = removals.len()),
        name = "db_apply_secret_sync"
    )]
    async fn apply_sync(
        &self,
        owner: &str,
        additions: &[SyncAddition],
        removals: &[CanonicalId],
    ) -> Result<SyncReport> {
        if additions.is_empty() && removals.is_empty() {
            return Ok(SyncReport::default());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SafeVaultError::database(e, "Failed to begin sync transaction"))?;

        let now = Utc::now();
        let mut report = SyncReport::default();

        for addition in additions {
            let result = sqlx::query(
                "INSERT INTO secret_records (owner, display_name, canonical_id, value, description, category, origin, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, 'remote_synced', $7, $8) \
                 ON CONFLICT(owner, canonical_id) DO UPDATE SET \
                    display_name = excluded.display_name, \
                    value = excluded.value, \
                    description = excluded.description, \
                    updated_at = excluded.updated_at \
                 WHERE secret_records.origin = 'remote_synced'",
            )
            .bind(owner)
            .bind(&addition.display_name)
            .bind(&addition.canonical_id)
            .bind(REMOTE_PLACEHOLDER)
            .bind(&addition.description)
            .bind(DEFAULT_CATEGORY)
            .bind(addition.created_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                SafeVaultError::database(
                    e,
                    format!("Failed to add synced secret '{}' for '{}'", addition.canonical_id, owner),
                )
            })?;
            report.added += result.rows_affected();
        }

        for canonical_id in removals {
            let result = sqlx::query(
                "DELETE FROM secret_records WHERE owner = $1 AND canonical_id = $2 AND origin = 'remote_synced'",
            )
            .bind(owner)
            .bind(canonical_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                SafeVaultError::database(
                    e,
                    format!("Failed to remove synced secret '{}' for '{}'", canonical_id, owner),
                )
            })?;
            report.removed += result.rows_affected();
        }

        tx.commit().await.map_err(|e| SafeVaultError::database(e, "Failed to commit sync transaction"))?;

        tracing::debug!(owner = %owner, added = report.added, removed = report.removed, "Applied secret sync");

        Ok(report)
    }

    #[instrument(skip(self), name = "db_count_secret_records")]
    async fn count_all(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM secret_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SafeVaultError::database(e, "Failed to count secret records"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sanitize;
    use crate::storage::test_helpers::migrated_pool;

    fn local(owner: &str, name: &str, value: &str) -> UpsertSecretRecord {
        UpsertSecretRecord {
            owner: owner.to_string(),
            display_name: name.to_string(),
            canonical_id: sanitize(name),
            value: value.to_string(),
            description: String::new(),
            category: String::new(),
        }
    }

    fn addition(name: &str) -> SyncAddition {
        SyncAddition {
            canonical_id: CanonicalId::from_string(name.to_string()),
            display_name: crate::domain::prettify(&CanonicalId::from_string(name.to_string())),
            description: "from remote".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);

        let record = repo.upsert(local("alice", "API Key", "sk-1")).await.unwrap();
        assert_eq!(record.canonical_id.as_str(), "api-key");
        assert_eq!(record.origin, SecretOrigin::Local);
        assert_eq!(record.category, "general");

        let found = repo.find("alice", &sanitize("API Key")).await.unwrap().unwrap();
        assert_eq!(found.value, "sk-1");
        assert!(repo.find("bob", &sanitize("API Key")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_colliding_upsert_overwrites() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);

        let first = repo.upsert(local("alice", "API Key", "one")).await.unwrap();
        let second = repo.upsert(local("alice", "api_key", "two")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "api_key");
        assert_eq!(second.value, "two");
        assert_eq!(repo.list_by_owner("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_never_overwrites_local() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);
        repo.upsert(local("alice", "db pass", "hunter2")).await.unwrap();

        let report = repo.apply_sync("alice", &[addition("db-pass")], &[]).await.unwrap();
        assert_eq!(report.added, 0);

        let record = repo.find("alice", &sanitize("db pass")).await.unwrap().unwrap();
        assert_eq!(record.value, "hunter2");
        assert_eq!(record.origin, SecretOrigin::Local);
    }

    #[tokio::test]
    async fn test_sync_removal_only_matches_synced_rows() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);
        repo.upsert(local("alice", "keep me", "v")).await.unwrap();
        repo.apply_sync("alice", &[addition("stale")], &[]).await.unwrap();

        let report = repo
            .apply_sync(
                "alice",
                &[],
                &[CanonicalId::from_string("stale".into()), sanitize("keep me")],
            )
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        let remaining = repo.list_by_owner("alice").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].display_name, "keep me");
    }

    #[tokio::test]
    async fn test_repeated_sync_addition_does_not_duplicate() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);
        repo.apply_sync("alice", &[addition("db-pass")], &[]).await.unwrap();
        repo.apply_sync("alice", &[addition("db-pass")], &[]).await.unwrap();

        let records = repo.list_by_owner("alice").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, REMOTE_PLACEHOLDER);
        assert_eq!(records[0].origin, SecretOrigin::RemoteSynced);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let repo = SqlxSecretRecordRepository::new(migrated_pool().await);
        repo.upsert(local("alice", "a", "1")).await.unwrap();
        repo.upsert(local("bob", "b", "2")).await.unwrap();
        assert_eq!(repo.count_all().await.unwrap(), 2);

        assert!(repo.delete("alice", &sanitize("a")).await.unwrap());
        assert!(!repo.delete("alice", &sanitize("a")).await.unwrap());
        assert_eq!(repo.count_all().await.unwrap(), 1);
    }
}
