use clap::{Args, Subcommand, ValueEnum};

use super::output::{print_json, truncate};
use super::ClientArgs;
use crate::domain::{LoginFailureReason, StoredSecurityEvent};
use crate::services::SecurityMonitor;

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Record a login attempt reported by the authentication front end
    Login(LoginArgs),
    /// Record a completed password change
    PasswordChanged(UserArgs),
    /// Show recent security events, newest first
    Recent(RecentArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    InvalidCredentials,
    AccountDisabled,
}

impl From<FailureReason> for LoginFailureReason {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::InvalidCredentials => LoginFailureReason::InvalidCredentials,
            FailureReason::AccountDisabled => LoginFailureReason::AccountDisabled,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    pub username: String,

    /// Record a failed attempt instead of a successful one
    #[arg(long)]
    pub failed: bool,

    #[arg(long, value_enum, default_value_t = FailureReason::InvalidCredentials)]
    pub reason: FailureReason,

    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    pub username: String,

    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct RecentArgs {
    /// Only events for this username
    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, default_value_t = 20)]
    pub limit: i64,

    #[arg(long)]
    pub json: bool,
}

pub async fn handle_audit_command(
    command: AuditCommands,
    monitor: &SecurityMonitor,
) -> anyhow::Result<()> {
    match command {
        AuditCommands::Login(args) => {
            let client = args.client.context();
            let recorded = if args.failed {
                monitor.login_failed(&args.username, &client, args.reason.into()).await?
            } else {
                monitor.login_succeeded(&args.username, &client).await?
            };
            print_json(&recorded)?;
        }
        AuditCommands::PasswordChanged(args) => {
            let recorded = monitor.password_changed(&args.username, &args.client.context()).await?;
            print_json(&recorded)?;
        }
        AuditCommands::Recent(args) => {
            let limit = args.limit.clamp(1, 1000);
            let events = monitor.recent(args.username.as_deref(), limit).await?;
            if args.json {
                print_json(&events)?;
            } else {
                print_events_table(&events);
            }
        }
    }

    Ok(())
}

fn print_events_table(events: &[StoredSecurityEvent]) {
    if events.is_empty() {
        println!("No security events recorded");
        return;
    }

    super::output::print_table_header(&[
        ("Time (UTC)", 20),
        ("Event", 17),
        ("Username", 20),
        ("IP Address", 16),
        ("Details", 40),
    ]);
    for stored in events {
        println!(
            "{:<20} {:<17} {:<20} {:<16} {}",
            stored.created_at.format("%Y-%m-%d %H:%M:%S"),
            stored.event.event_type,
            truncate(&stored.event.username, 20),
            truncate(&stored.event.ip_address, 16),
            truncate(&stored.event.details, 40)
        );
    }
    println!();
}
