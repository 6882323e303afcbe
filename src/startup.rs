//! Startup wiring
//!
//! Builds every collaborator from [`AppConfig`] once: the SQLite pool, the
//! repositories, the remote gateway for the configured backend, the notifier
//! and the services on top of them.

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, RemoteBackend, RemoteStoreConfig};
use crate::domain::AlertPolicyTable;
use crate::errors::{Result, SafeVaultError};
use crate::notify::{LogNotifier, Notifier, SmtpNotifier};
use crate::secrets::{InMemoryRemoteStore, RemoteGateway};
use crate::services::{AlertDispatcher, ReconciliationEngine, SecurityMonitor, StatsRefresher};
use crate::storage::{
    create_pool, DbPool, SqlxPrincipalRepository, SqlxSecretRecordRepository,
    SqlxSecurityEventRepository,
};

/// Fully wired application services sharing one pool
pub struct AppServices {
    pub pool: DbPool,
    pub principals: Arc<SqlxPrincipalRepository>,
    pub records: Arc<SqlxSecretRecordRepository>,
    pub monitor: Arc<SecurityMonitor>,
    pub engine: Arc<ReconciliationEngine>,
    pub stats: Arc<StatsRefresher>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices").field("engine", &self.engine).finish()
    }
}

/// Build the remote gateway for the configured backend
pub async fn build_remote_gateway(config: &RemoteStoreConfig) -> Result<RemoteGateway> {
    let deadline = config.operation_timeout();

    let gateway = match config.backend {
        RemoteBackend::None => RemoteGateway::disabled(),
        RemoteBackend::Memory => RemoteGateway::new(Arc::new(InMemoryRemoteStore::new()), deadline),
        #[cfg(feature = "aws")]
        RemoteBackend::Aws => {
            let store = crate::secrets::AwsSecretsManagerStore::from_config(config).await;
            RemoteGateway::new(Arc::new(store), deadline)
        }
        #[cfg(not(feature = "aws"))]
        RemoteBackend::Aws => {
            return Err(SafeVaultError::config(
                "remote_store.backend = \"aws\" requires building with the `aws` feature",
            ));
        }
    };

    info!(
        backend = gateway.backend_name(),
        deadline_ms = deadline.as_millis() as u64,
        "Remote secret store configured"
    );

    Ok(gateway)
}

/// SMTP when configured, otherwise alerts are only logged
pub fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>> {
    match &config.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(smtp).map_err(|e| {
                SafeVaultError::config_with_source("Failed to configure SMTP notifier", Box::new(e))
            })?;
            Ok(Arc::new(notifier))
        }
        None => {
            info!("SMTP not configured, security alerts will be logged only");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

/// Wire the services over an existing pool and collaborators
pub fn assemble(
    config: &AppConfig,
    pool: DbPool,
    gateway: RemoteGateway,
    notifier: Arc<dyn Notifier>,
) -> AppServices {
    let principals = Arc::new(SqlxPrincipalRepository::new(pool.clone()));
    let records = Arc::new(SqlxSecretRecordRepository::new(pool.clone()));
    let events = Arc::new(SqlxSecurityEventRepository::new(pool.clone()));

    let policies = AlertPolicyTable::new(
        config.alerting.failed_login_window(),
        config.alerting.failed_login_threshold,
    );
    let dispatcher = AlertDispatcher::new(policies, events.clone(), principals.clone(), notifier)
        .with_delivery_timeout(config.alerting.delivery_timeout())
        .with_enabled(config.alerting.enabled);

    let monitor = Arc::new(SecurityMonitor::new(events, dispatcher));
    let engine = Arc::new(ReconciliationEngine::new(records.clone(), gateway, monitor.clone()));
    let stats = Arc::new(StatsRefresher::new(
        principals.clone(),
        records.clone(),
        config.stats.interval(),
    ));

    AppServices { pool, principals, records, monitor, engine, stats }
}

/// Build everything from configuration
pub async fn build_services(config: &AppConfig) -> Result<AppServices> {
    let pool = create_pool(&config.database).await?;
    let gateway = build_remote_gateway(&config.remote_store).await?;
    let notifier = build_notifier(config)?;

    Ok(assemble(config, pool, gateway, notifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_backend() {
        let gateway = build_remote_gateway(&RemoteStoreConfig::default()).await.unwrap();
        assert!(!gateway.is_enabled());
    }

    #[tokio::test]
    async fn test_memory_backend_uses_operation_deadline() {
        let config = RemoteStoreConfig {
            backend: RemoteBackend::Memory,
            operation_timeout_ms: 1500,
            ..Default::default()
        };
        let gateway = build_remote_gateway(&config).await.unwrap();
        assert_eq!(gateway.backend_name(), "memory");
        assert_eq!(gateway.deadline(), std::time::Duration::from_millis(1500));
    }

    #[cfg(not(feature = "aws"))]
    #[tokio::test]
    async fn test_aws_backend_requires_feature() {
        let config = RemoteStoreConfig { backend: RemoteBackend::Aws, ..Default::default() };
        let err = build_remote_gateway(&config).await.unwrap_err();
        assert!(matches!(err, SafeVaultError::Config { .. }));
    }

    #[test]
    fn test_log_notifier_without_smtp() {
        let notifier = build_notifier(&AppConfig::default()).unwrap();
        assert_eq!(notifier.name(), "log");
    }

    #[tokio::test]
    async fn test_build_services_in_memory() {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.database.min_connections = 1;

        let services = build_services(&config).await.unwrap();
        assert!(!services.engine.remote().is_enabled());
        assert!(services.engine.list_with_sync("alice").await.unwrap().is_empty());
    }
}
