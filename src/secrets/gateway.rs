//! Bounded calls to the remote secret store.
//!
//! Every remote operation runs through [`RemoteGateway::call`], which applies
//! one hard deadline and folds every way the call can go wrong into a
//! [`RemoteOutcome`]. Callers branch on the outcome to decide their local
//! fallback; nothing here returns an error.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::client::{RemoteSecretEntry, RemoteSecretStore};
use super::error::{RemoteStoreError, Result};
use crate::observability::MetricsRecorder;

/// Result of one bounded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    /// The backend answered successfully in time
    Completed(T),
    /// The backend answered with an error in time
    Failed(RemoteStoreError),
    /// The deadline elapsed and the call was abandoned
    TimedOut(Duration),
    /// No remote store is configured
    Disabled,
}

impl<T> RemoteOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, RemoteOutcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            RemoteOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Label used for logs and the `status` metrics dimension
    pub fn status(&self) -> &'static str {
        match self {
            RemoteOutcome::Completed(_) => "success",
            RemoteOutcome::Failed(e) => e.kind(),
            RemoteOutcome::TimedOut(_) => "timeout",
            RemoteOutcome::Disabled => "disabled",
        }
    }
}

/// How a remote write landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWrite {
    Created,
    /// The identifier already existed and was overwritten
    Updated,
}

/// Remote store capability plus the deadline applied to each call.
#[derive(Clone)]
pub struct RemoteGateway {
    store: Option<Arc<dyn RemoteSecretStore>>,
    deadline: Duration,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for RemoteGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGateway")
            .field("backend", &self.backend_name())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl RemoteGateway {
    pub fn new(store: Arc<dyn RemoteSecretStore>, deadline: Duration) -> Self {
        Self { store: Some(store), deadline, metrics: MetricsRecorder::new() }
    }

    /// Gateway with no remote store; every call reports [`RemoteOutcome::Disabled`]
    pub fn disabled() -> Self {
        Self { store: None, deadline: Duration::ZERO, metrics: MetricsRecorder::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.as_ref().map_or("none", |store| store.backend_name())
    }

    /// Run `f` against the store under the deadline.
    ///
    /// Everything `f` does, including several store calls, shares the one deadline.
    pub async fn call<'a, T, F, Fut>(&'a self, operation: &'static str, f: F) -> RemoteOutcome<T>
    where
        F: FnOnce(&'a dyn RemoteSecretStore) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        let Some(store) = self.store.as_deref() else {
            return RemoteOutcome::Disabled;
        };

        let backend = store.backend_name();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.deadline, f(store)).await {
            Ok(Ok(value)) => RemoteOutcome::Completed(value),
            Ok(Err(error)) => {
                tracing::warn!(
                    backend = backend,
                    operation = operation,
                    error = %error,
                    "Remote secret store call failed, continuing with local store"
                );
                RemoteOutcome::Failed(error)
            }
            Err(_) => {
                tracing::warn!(
                    backend = backend,
                    operation = operation,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Remote secret store call timed out, continuing with local store"
                );
                RemoteOutcome::TimedOut(self.deadline)
            }
        };

        self.metrics.record_remote_operation(
            backend,
            operation,
            outcome.status(),
            start.elapsed().as_secs_f64(),
        );

        outcome
    }

    /// Create the secret, or overwrite it when the identifier already exists.
    pub async fn create_or_update(
        &self,
        id: &str,
        value: &str,
        description: &str,
    ) -> RemoteOutcome<RemoteWrite> {
        self.call("create", |store| async move {
            match store.create_secret(id, value, description).await {
                Ok(()) => Ok(RemoteWrite::Created),
                Err(RemoteStoreError::AlreadyExists { .. }) => {
                    tracing::debug!(remote_id = %id, "Remote secret exists, updating instead");
                    store.update_secret(id, value, description).await?;
                    Ok(RemoteWrite::Updated)
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    pub async fn get(&self, id: &str) -> RemoteOutcome<String> {
        self.call("get", |store| store.get_secret(id)).await
    }

    pub async fn delete(&self, id: &str) -> RemoteOutcome<()> {
        self.call("delete", |store| store.delete_secret(id)).await
    }

    pub async fn list(&self, prefix: &str) -> RemoteOutcome<Vec<RemoteSecretEntry>> {
        self.call("list", |store| store.list_secrets(Some(prefix))).await
    }
}
