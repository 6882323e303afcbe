//! Common test utilities for all integration tests.
//!
//! Provides the shared test database, fake collaborators for the remote
//! store and the notifier, and a helper that wires the real services on top.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use safevault::config::{AppConfig, RemoteBackend};
use safevault::notify::{Notifier, NotifyError};
use safevault::secrets::{
    InMemoryRemoteStore, RemoteGateway, RemoteSecretEntry, RemoteSecretStore, RemoteStoreError,
};
use safevault::startup::{assemble, AppServices};
use test_db::TestDatabase;

/// Deadline used by harnesses unless a test overrides it
pub const TEST_DEADLINE: Duration = Duration::from_millis(500);

/// One message captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that keeps every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Remote store that rejects every call with a backend error
#[derive(Debug, Default)]
pub struct FailingRemoteStore;

#[async_trait]
impl RemoteSecretStore for FailingRemoteStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn create_secret(&self, _id: &str, _value: &str, _description: &str) -> Result<(), RemoteStoreError> {
        Err(RemoteStoreError::backend("simulated outage"))
    }

    async fn update_secret(&self, _id: &str, _value: &str, _description: &str) -> Result<(), RemoteStoreError> {
        Err(RemoteStoreError::backend("simulated outage"))
    }

    async fn get_secret(&self, _id: &str) -> Result<String, RemoteStoreError> {
        Err(RemoteStoreError::backend("simulated outage"))
    }

    async fn delete_secret(&self, _id: &str) -> Result<(), RemoteStoreError> {
        Err(RemoteStoreError::backend("simulated outage"))
    }

    async fn list_secrets(&self, _prefix: Option<&str>) -> Result<Vec<RemoteSecretEntry>, RemoteStoreError> {
        Err(RemoteStoreError::backend("simulated outage"))
    }
}

/// Real services over a file-backed database and an in-process remote store
pub struct Harness {
    pub db: TestDatabase,
    pub remote: Arc<InMemoryRemoteStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: AppServices,
}

impl Harness {
    pub async fn new(prefix: &str) -> Self {
        Self::with_deadline(prefix, TEST_DEADLINE).await
    }

    pub async fn with_deadline(prefix: &str, deadline: Duration) -> Self {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let gateway = RemoteGateway::new(remote.clone(), deadline);
        Self::build(prefix, remote, gateway).await
    }

    /// Harness whose gateway talks to [`FailingRemoteStore`]
    pub async fn with_failing_remote(prefix: &str) -> Self {
        let gateway = RemoteGateway::new(Arc::new(FailingRemoteStore), TEST_DEADLINE);
        Self::build(prefix, Arc::new(InMemoryRemoteStore::new()), gateway).await
    }

    async fn build(prefix: &str, remote: Arc<InMemoryRemoteStore>, gateway: RemoteGateway) -> Self {
        let db = TestDatabase::new(prefix).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut config = AppConfig::default();
        config.remote_store.backend = RemoteBackend::Memory;

        let services = assemble(&config, db.pool.clone(), gateway, notifier.clone());
        Self { db, remote, notifier, services }
    }
}
