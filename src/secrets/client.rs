//! Remote secret store trait and listing types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::Result;

/// One entry of a remote listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteSecretEntry {
    /// Full remote identifier, including the owner namespace
    pub id: String,

    pub description: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteSecretEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), description: None, created_at: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Managed secret store reached over the network.
///
/// Implementations MUST NOT log secret values. Every returned future must be
/// safe to drop at any await point: callers abandon calls that overrun their
/// deadline.
#[async_trait]
pub trait RemoteSecretStore: Send + Sync {
    /// Short backend name for logs and metrics
    fn backend_name(&self) -> &'static str;

    /// Create a new secret.
    ///
    /// # Errors
    ///
    /// - [`RemoteStoreError::AlreadyExists`](super::RemoteStoreError::AlreadyExists)
    ///   if the identifier is taken
    async fn create_secret(&self, id: &str, value: &str, description: &str) -> Result<()>;

    /// Overwrite the value and description of an existing secret.
    async fn update_secret(&self, id: &str, value: &str, description: &str) -> Result<()>;

    /// Read the current value.
    async fn get_secret(&self, id: &str) -> Result<String>;

    /// Delete permanently, without a recovery window.
    async fn delete_secret(&self, id: &str) -> Result<()>;

    /// List secrets, optionally restricted to identifiers starting with `prefix`.
    ///
    /// Must return the complete listing or an error, never a partial one.
    async fn list_secrets(&self, prefix: Option<&str>) -> Result<Vec<RemoteSecretEntry>>;
}
