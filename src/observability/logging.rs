//! # Structured Logging
//!
//! Subscriber setup plus span macros shared by the storage and service layers.
//!
//! The filter comes from `SAFEVAULT_LOG` when set (standard `EnvFilter`
//! directives), otherwise from `observability.log_level`. `--verbose` on the
//! CLI raises the default to `debug`.
//!
//! Secret values never appear in log fields. Display names, owners and
//! remote identifiers do.

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives
pub const LOG_ENV_VAR: &str = "SAFEVAULT_LOG";

/// Create a tracing span for database operations.
///
/// ```rust,ignore
/// let span = db_span!("upsert_secret_record", owner = %owner);
/// ```
#[macro_export]
macro_rules! db_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "db_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for one secret operation on behalf of an owner
#[macro_export]
macro_rules! secret_span {
    ($operation:expr, $owner:expr) => {
        tracing::info_span!(
            "secret_operation",
            operation = %$operation,
            owner = %$owner,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $owner:expr, $($field:tt)*) => {
        tracing::info_span!(
            "secret_operation",
            operation = %$operation,
            owner = %$owner,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Build the filter from `SAFEVAULT_LOG`, falling back to the configured level
pub fn build_env_filter(config: &ObservabilityConfig, verbose: bool) -> EnvFilter {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };

    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Returns false when a subscriber was already installed (integration tests
/// install their own); that is not an error.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) -> bool {
    let filter = build_env_filter(config, verbose);

    let result = if config.json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
    };

    result.is_ok()
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        database_url = %crate::storage::sanitize_url(&config.database.url),
        remote_backend = %config.remote_store.backend,
        remote_deadline_ms = config.remote_store.operation_timeout_ms,
        alerting_enabled = config.alerting.enabled,
        smtp_configured = config.smtp.is_some(),
        metrics_enabled = config.observability.enable_metrics,
        "SafeVault configuration"
    );
}
