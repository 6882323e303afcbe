//! Process-local remote store backend.
//!
//! Behaves like a managed secret store (conflict on create, not-found on
//! missing ids, prefix listing) without leaving the process. Used for local
//! development (`remote_store.backend = "memory"`) and in tests, where the
//! availability and latency knobs simulate an unreachable or slow backend.
//!
//! Contents are lost when the process exits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::client::{RemoteSecretEntry, RemoteSecretStore};
use super::error::{RemoteStoreError, Result};

#[derive(Debug, Clone)]
struct StoredSecret {
    value: String,
    description: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InMemoryRemoteStore {
    secrets: RwLock<BTreeMap<String, StoredSecret>>,
    available: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self {
            secrets: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false every call fails with [`RemoteStoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay applied before every call is answered
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of calls received, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a secret with this id exists
    pub async fn contains(&self, id: &str) -> bool {
        self.secrets.read().await.contains_key(id)
    }

    /// Remove a secret without counting a call, simulating an out-of-band delete
    pub async fn remove_out_of_band(&self, id: &str) {
        self.secrets.write().await.remove(id);
    }

    async fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::unavailable("in-memory remote store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSecretStore for InMemoryRemoteStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_secret(&self, id: &str, value: &str, description: &str) -> Result<()> {
        self.enter().await?;

        let mut secrets = self.secrets.write().await;
        if secrets.contains_key(id) {
            return Err(RemoteStoreError::already_exists(id));
        }
        secrets.insert(
            id.to_string(),
            StoredSecret {
                value: value.to_string(),
                description: description.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn update_secret(&self, id: &str, value: &str, description: &str) -> Result<()> {
        self.enter().await?;

        let mut secrets = self.secrets.write().await;
        let secret = secrets.get_mut(id).ok_or_else(|| RemoteStoreError::not_found(id))?;
        secret.value = value.to_string();
        secret.description = description.to_string();
        Ok(())
    }

    async fn get_secret(&self, id: &str) -> Result<String> {
        self.enter().await?;

        self.secrets
            .read()
            .await
            .get(id)
            .map(|s| s.value.clone())
            .ok_or_else(|| RemoteStoreError::not_found(id))
    }

    async fn delete_secret(&self, id: &str) -> Result<()> {
        self.enter().await?;

        self.secrets
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteStoreError::not_found(id))
    }

    async fn list_secrets(&self, prefix: Option<&str>) -> Result<Vec<RemoteSecretEntry>> {
        self.enter().await?;

        let secrets = self.secrets.read().await;
        Ok(secrets
            .iter()
            .filter(|(id, _)| prefix.map_or(true, |p| id.starts_with(p)))
            .map(|(id, s)| {
                RemoteSecretEntry::new(id.clone())
                    .with_description(s.description.clone())
                    .with_created_at(s.created_at)
            })
            .collect())
    }
}
