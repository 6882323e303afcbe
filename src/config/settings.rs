//! # Configuration Settings
//!
//! Defines the configuration structure for SafeVault.

use crate::errors::{Result, SafeVaultError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Local record store
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Remote managed secret store
    #[validate(nested)]
    pub remote_store: RemoteStoreConfig,

    /// Security alerting thresholds and delivery
    #[validate(nested)]
    pub alerting: AlertingConfig,

    /// SMTP transport for alert mail (alerts are only logged when absent)
    #[validate(nested)]
    pub smtp: Option<SmtpConfig>,

    /// Logging and metrics
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Business stats refresh loop
    #[validate(nested)]
    pub stats: StatsConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SafeVaultError::from)?;

        self.validate_custom()?;

        Ok(())
    }

    /// Cross-field checks the derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if !self.database.is_sqlite() {
            return Err(SafeVaultError::validation_field(
                "Database URL must start with 'sqlite://' or 'sqlite:'",
                "database.url",
            ));
        }

        if self.remote_store.backend == RemoteBackend::Aws && self.remote_store.region.trim().is_empty() {
            return Err(SafeVaultError::validation_field(
                "A region is required for the aws remote store",
                "remote_store.region",
            ));
        }

        if let Some(endpoint) = &self.remote_store.endpoint_url {
            let parsed = url::Url::parse(endpoint).map_err(|e| {
                SafeVaultError::validation_field(
                    format!("Invalid remote store endpoint: {}", e),
                    "remote_store.endpoint_url",
                )
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SafeVaultError::validation_field(
                    "Remote store endpoint must use http or https",
                    "remote_store.endpoint_url",
                ));
            }
        }

        if self.remote_store.connect_timeout_ms > self.remote_store.operation_timeout_ms {
            return Err(SafeVaultError::validation_field(
                "Remote connect timeout cannot exceed the operation timeout",
                "remote_store.connect_timeout_ms",
            ));
        }

        if let Some(smtp) = &self.smtp {
            if smtp.username.is_some() != smtp.password.is_some() {
                return Err(SafeVaultError::validation_field(
                    "SMTP username and password must be set together",
                    "smtp.username",
                ));
            }
        }

        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 60, message = "Connect timeout must be between 1 and 60 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/safevault.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600, // 10 minutes
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Whether the URL points at a throwaway in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Which remote secret store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// AWS Secrets Manager (requires the `aws` feature)
    Aws,
    /// Process-local store, for development
    Memory,
    /// No remote store: every operation runs against the local store only
    #[default]
    None,
}

impl std::fmt::Display for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteBackend::Aws => "aws",
            RemoteBackend::Memory => "memory",
            RemoteBackend::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Remote secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RemoteStoreConfig {
    pub backend: RemoteBackend,

    /// Cloud region for the aws backend
    pub region: String,

    /// Endpoint override, e.g. a local emulator
    #[validate(url(message = "Remote store endpoint must be a valid URL"))]
    pub endpoint_url: Option<String>,

    /// SDK connect timeout in milliseconds
    #[validate(range(min = 1, max = 60000, message = "Connect timeout must be between 1ms and 60s"))]
    pub connect_timeout_ms: u64,

    /// Hard deadline for every remote operation in milliseconds
    #[validate(range(min = 1, max = 60000, message = "Operation timeout must be between 1ms and 60s"))]
    pub operation_timeout_ms: u64,

    /// Total SDK attempts per call (1 = no retries)
    #[validate(range(min = 1, max = 3, message = "Max attempts must be between 1 and 3"))]
    pub max_attempts: u32,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::None,
            region: "eu-west-1".to_string(),
            endpoint_url: None,
            connect_timeout_ms: 2000,
            operation_timeout_ms: 3000,
            max_attempts: 1,
        }
    }
}

impl RemoteStoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Security alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlertingConfig {
    /// Dispatch alerts at all (events are recorded either way)
    pub enabled: bool,

    /// Trailing window for counting failed logins, in minutes
    #[validate(range(min = 1, max = 1440, message = "Failed login window must be between 1 and 1440 minutes"))]
    pub failed_login_window_minutes: u32,

    /// Alert on every N-th failed login inside the window
    #[validate(range(min = 1, max = 100, message = "Failed login threshold must be between 1 and 100"))]
    pub failed_login_threshold: u32,

    /// Upper bound on a single alert delivery, in seconds
    #[validate(range(min = 1, max = 120, message = "Delivery timeout must be between 1 and 120 seconds"))]
    pub delivery_timeout_seconds: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failed_login_window_minutes: 15,
            failed_login_threshold: 3,
            delivery_timeout_seconds: 10,
        }
    }
}

impl AlertingConfig {
    pub fn failed_login_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.failed_login_window_minutes))
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_seconds)
    }
}

/// SMTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SmtpConfig {
    #[validate(length(min = 1, message = "SMTP host cannot be empty"))]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    #[validate(range(min = 1, message = "SMTP port must be between 1 and 65535"))]
    pub port: u16,

    pub username: Option<String>,

    pub password: Option<String>,

    #[validate(email(message = "SMTP from address must be a valid email"))]
    pub from_address: String,

    /// Upgrade the connection with STARTTLS (plain connection otherwise)
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            metrics_port: 9090,
            service_name: "safevault".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if !self.enable_metrics || self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

/// Business stats refresher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StatsConfig {
    pub enabled: bool,

    #[validate(range(min = 1, max = 3600, message = "Stats interval must be between 1 and 3600 seconds"))]
    pub interval_seconds: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { enabled: true, interval_seconds: 30 }
    }
}

impl StatsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.remote_store.operation_timeout(), Duration::from_secs(3));
        assert_eq!(config.remote_store.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.remote_store.max_attempts, 1);
        assert_eq!(config.alerting.failed_login_window(), chrono::Duration::minutes(15));
        assert_eq!(config.alerting.failed_login_threshold, 3);
        assert_eq!(config.stats.interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_non_sqlite_url() {
        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/safevault".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let mut config = AppConfig::default();
        config.alerting.failed_login_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_connect_timeout_above_deadline() {
        let mut config = AppConfig::default();
        config.remote_store.connect_timeout_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_endpoint_must_be_http() {
        let mut config = AppConfig::default();
        config.remote_store.endpoint_url = Some("http://localhost:4566".to_string());
        assert!(config.validate().is_ok());

        config.remote_store.endpoint_url = Some("ftp://localhost:4566".to_string());
        assert!(matches!(config.validate(), Err(SafeVaultError::Validation { .. })));
    }

    #[test]
    fn test_smtp_credentials_must_pair() {
        let mut config = AppConfig::default();
        config.smtp = Some(SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("alerts".to_string()),
            password: None,
            from_address: "alerts@example.com".to_string(),
            starttls: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_idle_timeout_zero_disables() {
        let config = DatabaseConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_metrics_bind_address() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_bind_address(), Some("0.0.0.0:9090".to_string()));

        let disabled = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert_eq!(disabled.metrics_bind_address(), None);
    }
}
