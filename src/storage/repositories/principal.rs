//! Principal repository
//!
//! Resolves alert recipients and counts active users for the stats refresher.

use crate::domain::{NewPrincipal, Principal};
use crate::errors::{Result, SafeVaultError};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct PrincipalRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Principal {
            id: row.id,
            username: row.username,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Looks up where to deliver alerts for a username
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Contact address, or `None` for unknown principals or ones without an email
    async fn contact_address(&self, username: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait PrincipalRepository: RecipientResolver {
    /// Insert a principal or update email and active flag of an existing one
    async fn upsert(&self, principal: NewPrincipal) -> Result<Principal>;

    async fn find(&self, username: &str) -> Result<Option<Principal>>;

    async fn count_active(&self) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct SqlxPrincipalRepository {
    pool: DbPool,
}

impl SqlxPrincipalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientResolver for SqlxPrincipalRepository {
    #[instrument(skip(self), name = "db_principal_contact_address")]
    async fn contact_address(&self, username: &str) -> Result<Option<String>> {
        let email: Option<Option<String>> =
            sqlx::query_scalar("SELECT email FROM principals WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    SafeVaultError::database(e, format!("Failed to resolve contact for '{}'", username))
                })?;

        Ok(email.flatten().filter(|e| !e.trim().is_empty()))
    }
}

#[async_trait]
impl PrincipalRepository for SqlxPrincipalRepository {
    #[instrument(skip(self, principal), fields(username = %principal.username), name = "db_upsert_principal")]
    async fn upsert(&self, principal: NewPrincipal) -> Result<Principal> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "INSERT INTO principals (username, email, is_active, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT(username) DO UPDATE SET email = excluded.email, is_active = excluded.is_active \
             RETURNING id, username, email, is_active, created_at",
        )
        .bind(&principal.username)
        .bind(&principal.email)
        .bind(principal.is_active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            SafeVaultError::database(e, format!("Failed to save principal '{}'", principal.username))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self), name = "db_find_principal")]
    async fn find(&self, username: &str) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "SELECT id, username, email, is_active, created_at FROM principals WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SafeVaultError::database(e, format!("Failed to get principal '{}'", username)))?;

        Ok(row.map(Principal::from))
    }

    #[instrument(skip(self), name = "db_count_active_principals")]
    async fn count_active(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM principals WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SafeVaultError::database(e, "Failed to count active principals"))
    }
}
