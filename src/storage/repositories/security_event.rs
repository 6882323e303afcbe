//! Security event repository
//!
//! Append-only audit log. The table rejects UPDATE and DELETE at the
//! database level, so this repository only ever inserts and reads.

use crate::domain::{SecurityEvent, SecurityEventType, StoredSecurityEvent};
use crate::errors::{Result, SafeVaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct SecurityEventRow {
    pub id: i64,
    pub event_type: String,
    pub username: String,
    pub ip_address: String,
    pub user_agent: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SecurityEventRow> for StoredSecurityEvent {
    type Error = SafeVaultError;

    fn try_from(row: SecurityEventRow) -> Result<Self> {
        let event_type = SecurityEventType::from_str(&row.event_type)
            .map_err(|e| SafeVaultError::internal(format!("Invalid security event {}: {}", row.id, e)))?;

        Ok(StoredSecurityEvent {
            id: row.id,
            event: SecurityEvent {
                event_type,
                username: row.username,
                ip_address: row.ip_address,
                user_agent: row.user_agent,
                details: row.details,
            },
            created_at: row.created_at,
        })
    }
}

#[async_trait]
pub trait SecurityEventRepository: Send + Sync {
    /// Append an event stamped with `recorded_at`
    async fn append(&self, event: &SecurityEvent, recorded_at: DateTime<Utc>) -> Result<StoredSecurityEvent>;

    /// Count events of one kind for one username with `created_at > now - window`
    async fn count_in_window(
        &self,
        event_type: SecurityEventType,
        username: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Newest-first listing, optionally for a single username
    async fn list_recent(&self, username: Option<&str>, limit: i64) -> Result<Vec<StoredSecurityEvent>>;
}

#[derive(Debug, Clone)]
pub struct SqlxSecurityEventRepository {
    pool: DbPool,
}

impl SqlxSecurityEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecurityEventRepository for SqlxSecurityEventRepository {
    #[instrument(
        skip(self, event),
        fields(event_type = %event.event_type, username = %event.username),
        name = "db_append_security_event"
    )]
    async fn append(&self, event: &SecurityEvent, recorded_at: DateTime<Utc>) -> Result<StoredSecurityEvent> {
        let row = sqlx::query_as::<_, SecurityEventRow>(
            "INSERT INTO security_events (event_type, username, ip_address, user_agent, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, event_type, username, ip_address, user_agent, details, created_at",
        )
        .bind(event.event_type.as_str())
        .bind(&event.username)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.details)
        .bind(recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, event_type = %event.event_type, "Failed to append security event");
            SafeVaultError::database(e, format!("Failed to append {} event", event.event_type))
        })?;

        StoredSecurityEvent::try_from(row)
    }

    #[instrument(skip(self), fields(event_type = %event_type, username = %username), name = "db_count_security_events")]
    async fn count_in_window(
        &self,
        event_type: SecurityEventType,
        username: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let cutoff = now - window;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM security_events \
             WHERE event_type = $1 AND username = $2 AND created_at > $3",
        )
        .bind(event_type.as_str())
        .bind(username)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            SafeVaultError::database(e, format!("Failed to count {} events for '{}'", event_type, username))
        })?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self), name = "db_list_security_events")]
    async fn list_recent(&self, username: Option<&str>, limit: i64) -> Result<Vec<StoredSecurityEvent>> {
        let rows = match username {
            Some(username) => {
                sqlx::query_as::<_, SecurityEventRow>(
                    "SELECT id, event_type, username, ip_address, user_agent, details, created_at \
                     FROM security_events WHERE username = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
                )
                .bind(username)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, SecurityEventRow>(
                    "SELECT id, event_type, username, ip_address, user_agent, details, created_at \
                     FROM security_events ORDER BY created_at DESC, id DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| SafeVaultError::database(e, "Failed to list security events"))?;

        rows.into_iter().map(StoredSecurityEvent::try_from).collect()
    }
}
