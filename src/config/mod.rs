//! # Configuration Management
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `SAFEVAULT__SECTION__KEY` environment variables. `DATABASE_URL` overrides
//! the database URL last so the usual sqlx convention keeps working.

pub mod settings;

pub use settings::{
    AlertingConfig, AppConfig, DatabaseConfig, ObservabilityConfig, RemoteBackend,
    RemoteStoreConfig, SmtpConfig, StatsConfig,
};

use crate::errors::Result;
use std::path::Path;

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "SAFEVAULT";

/// Load and validate the application configuration.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let mut app_config: AppConfig = builder.build()?.try_deserialize()?;

    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            app_config.database.url = url;
        }
    }

    app_config.validate()?;

    tracing::debug!(
        remote_backend = %app_config.remote_store.backend,
        smtp_configured = app_config.smtp.is_some(),
        "Configuration loaded"
    );

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[remote_store]
backend = "memory"
operation_timeout_ms = 1500
connect_timeout_ms = 500

[alerting]
failed_login_threshold = 5

[smtp]
host = "smtp.example.com"
from_address = "alerts@example.com"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.remote_store.backend, RemoteBackend::Memory);
        assert_eq!(config.remote_store.operation_timeout_ms, 1500);
        assert_eq!(config.alerting.failed_login_threshold, 5);
        assert_eq!(config.alerting.failed_login_window_minutes, 15);

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert!(smtp.starttls);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/safevault.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[alerting]\nfailed_login_threshold = 0").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(crate::Error::Validation { .. })));
    }
}
