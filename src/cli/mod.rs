//! # Command Line Interface
//!
//! Operator tooling for SafeVault: schema management, the principal directory,
//! secret records, audit events and a long-running monitor that keeps the
//! business gauges fresh for scraping.

pub mod audit;
pub mod output;
pub mod principal;
pub mod secrets;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{load_config, AppConfig};
use crate::domain::ClientContext;
use crate::observability::{init_logging, init_metrics, log_config_info};
use crate::startup::build_services;
use crate::storage::{
    create_pool, get_pool_stats, list_applied_migrations, pending_migrations, run_db_migrations,
    validate_migrations,
};
use output::{print_json, print_migrations_table};

#[derive(Parser)]
#[command(name = "safevault")]
#[command(about = "SafeVault secret reconciliation and security auditing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    /// Principal directory commands
    Principal {
        #[command(subcommand)]
        command: principal::PrincipalCommands,
    },

    /// Secret record commands
    Secret {
        #[command(subcommand)]
        command: secrets::SecretCommands,
    },

    /// Security audit commands
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommands,
    },

    /// Refresh business stats and serve metrics until interrupted
    Monitor,
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate {
        /// Dry run - show what would be migrated
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration status
    Status,

    /// List all applied migrations
    List,
}

/// Request origin recorded on audit events
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Client IP address
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Client user agent
    #[arg(long, default_value = concat!("safevault-cli/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,
}

impl ClientArgs {
    pub fn context(&self) -> ClientContext {
        ClientContext::new(self.ip.clone(), self.user_agent.clone())
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    init_logging(&config.observability, cli.verbose);
    log_config_info(&config);

    match cli.command {
        Commands::Database { command } => handle_database_command(command, &config).await?,
        Commands::Principal { command } => {
            let services = build_services(&config).await?;
            principal::handle_principal_command(command, services.principals.as_ref()).await?
        }
        Commands::Secret { command } => {
            let services = build_services(&config).await?;
            secrets::handle_secret_command(command, &services.engine).await?
        }
        Commands::Audit { command } => {
            let services = build_services(&config).await?;
            audit::handle_audit_command(command, &services.monitor).await?
        }
        Commands::Monitor => run_monitor(&config).await?,
    }

    Ok(())
}

/// Handle database management commands
async fn handle_database_command(
    command: DatabaseCommands,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let mut database = config.database.clone();
    database.auto_migrate = false;
    let pool = create_pool(&database).await?;

    match command {
        DatabaseCommands::Migrate { dry_run } => {
            let pending = pending_migrations(&pool).await?;
            if dry_run {
                if pending.is_empty() {
                    println!("No pending migrations");
                } else {
                    println!("Dry run mode - pending migrations:");
                    for (version, description) in &pending {
                        println!("  {:<15} {}", version, description);
                    }
                }
            } else {
                println!("Running database migrations...");
                run_db_migrations(&pool).await?;
                println!("Applied {} migration(s)", pending.len());
            }
        }

        DatabaseCommands::Status => {
            let is_valid = validate_migrations(&pool).await?;
            if is_valid {
                println!("Database schema is up to date");
            } else {
                let pending = pending_migrations(&pool).await?;
                println!("Database schema has {} pending migration(s)", pending.len());
                std::process::exit(1);
            }
        }

        DatabaseCommands::List => {
            let migrations = list_applied_migrations(&pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }
        }
    }

    pool.close().await;
    Ok(())
}

async fn run_monitor(config: &AppConfig) -> anyhow::Result<()> {
    init_metrics(&config.observability)?;
    let services = build_services(config).await?;

    let shutdown = CancellationToken::new();
    let refresher = if config.stats.enabled {
        Some(services.stats.clone().spawn(shutdown.clone()))
    } else {
        info!("Business stats refresh disabled");
        None
    };

    print_json(&services.stats.refresh_once().await?)?;

    let pool_stats = get_pool_stats(&services.pool);
    info!(
        pool_size = pool_stats.size,
        pool_active = pool_stats.active(),
        metrics_address = ?config.observability.metrics_bind_address(),
        "Monitor running, press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();
    if let Some(handle) = refresher {
        handle.await?;
    }
    services.pool.close().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_secret_put() {
        let cli = Cli::try_parse_from([
            "safevault",
            "secret",
            "put",
            "--owner",
            "alice",
            "API Key",
            "--value",
            "sk-123",
            "--category",
            "api",
        ])
        .unwrap();

        match cli.command {
            Commands::Secret { command: secrets::SecretCommands::Put(args) } => {
                assert_eq!(args.owner, "alice");
                assert_eq!(args.name, "API Key");
                assert_eq!(args.value.as_deref(), Some("sk-123"));
                assert_eq!(args.category.as_deref(), Some("api"));
            }
            _ => panic!("expected secret put"),
        }
    }

    #[test]
    fn test_put_requires_a_value_source() {
        let result =
            Cli::try_parse_from(["safevault", "secret", "put", "--owner", "alice", "API Key"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_failed_login_with_client() {
        let cli = Cli::try_parse_from([
            "safevault",
            "audit",
            "login",
            "alice",
            "--failed",
            "--reason",
            "account-disabled",
            "--ip",
            "10.0.0.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Audit { command: audit::AuditCommands::Login(args) } => {
                assert!(args.failed);
                assert_eq!(args.reason, audit::FailureReason::AccountDisabled);
                assert_eq!(args.client.context().ip_address, "10.0.0.5");
            }
            _ => panic!("expected audit login"),
        }
    }

    #[test]
    fn test_global_database_url_after_subcommand() {
        let cli = Cli::try_parse_from([
            "safevault",
            "database",
            "status",
            "--database-url",
            "sqlite://./other.db",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("sqlite://./other.db"));
    }
}
