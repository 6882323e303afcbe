//! # SafeVault
//!
//! Secret storage that mirrors every record into a remote managed secret
//! store while keeping a local SQLite record store authoritative, plus a
//! security audit log that alerts principals about repeated login failures
//! and password changes.
//!
//! ## Architecture
//!
//! ```text
//! CLI ──► ReconciliationEngine ──► RemoteGateway (deadline, fail-open) ──► remote store
//!   │            │
//!   │            └──► SecretRecordRepository (SQLite, authoritative)
//!   │
//!   └──► SecurityMonitor ──► SecurityEventRepository
//!                 │
//!                 └──► AlertDispatcher ──► Notifier (SMTP or log)
//! ```
//!
//! Remote failures of any kind degrade to local-only behavior and never reach
//! the caller. Local store faults and validation errors do.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use safevault::{config::load_config, domain::NewSecret, startup::build_services};
//!
//! #[tokio::main]
//! async fn main() -> safevault::Result<()> {
//!     let config = load_config(None)?;
//!     let services = build_services(&config).await?;
//!
//!     let outcome = services.engine.create("alice", NewSecret::new("API Key", "sk-123")).await?;
//!     println!("stored {} ({:?})", outcome.record.canonical_id, outcome.location);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod observability;
pub mod secrets;
pub mod services;
pub mod startup;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result, SafeVaultError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(APP_NAME, "safevault");
        assert!(!VERSION.is_empty());
    }
}
