//! Security audit events and the alert policy attached to each event kind

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of audited event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    LoginSuccess,
    LoginFailed,
    PasswordChanged,
    SecretAccessed,
}

impl SecurityEventType {
    pub const ALL: [SecurityEventType; 4] = [
        SecurityEventType::LoginSuccess,
        SecurityEventType::LoginFailed,
        SecurityEventType::PasswordChanged,
        SecurityEventType::SecretAccessed,
    ];

    /// Get the database representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::PasswordChanged => "password_changed",
            Self::SecretAccessed => "secret_accessed",
        }
    }
}

impl FromStr for SecurityEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login_success" => Ok(Self::LoginSuccess),
            "login_failed" => Ok(Self::LoginFailed),
            "password_changed" => Ok(Self::PasswordChanged),
            "secret_accessed" => Ok(Self::SecretAccessed),
            _ => Err(format!("Unknown security event type: {}", s)),
        }
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Network origin of the request that produced an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientContext {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self { ip_address: ip_address.into(), user_agent: user_agent.into() }
    }
}

/// Why a login attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailureReason {
    InvalidCredentials,
    AccountDisabled,
}

/// An event about to be appended to the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    /// Loose reference: recorded even when no such principal exists
    pub username: String,
    pub ip_address: String,
    pub user_agent: String,
    pub details: String,
}

impl SecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        username: impl Into<String>,
        client: &ClientContext,
        details: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            username: username.into(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            details: details.into(),
        }
    }

    pub fn login_succeeded(username: &str, client: &ClientContext) -> Self {
        Self::new(SecurityEventType::LoginSuccess, username, client, "Successful login")
    }

    pub fn login_failed(username: &str, client: &ClientContext, reason: LoginFailureReason) -> Self {
        let details = match reason {
            LoginFailureReason::InvalidCredentials => {
                format!("Invalid credentials for user: {}", username)
            }
            LoginFailureReason::AccountDisabled => "Account disabled".to_string(),
        };
        Self::new(SecurityEventType::LoginFailed, username, client, details)
    }

    pub fn password_changed(username: &str, client: &ClientContext) -> Self {
        Self::new(SecurityEventType::PasswordChanged, username, client, "Password successfully changed")
    }

    pub fn secret_accessed(username: &str, client: &ClientContext, display_name: &str) -> Self {
        Self::new(
            SecurityEventType::SecretAccessed,
            username,
            client,
            format!("Accessed secret: {}", display_name),
        )
    }
}

/// An event as stored in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecurityEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: SecurityEvent,
    pub created_at: DateTime<Utc>,
}

/// When an appended event should notify the affected principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    Never,
    Always,
    /// Fire on every `every`-th matching event inside the trailing `window`
    Threshold { window: Duration, every: u32 },
}

impl AlertPolicy {
    /// Threshold decision for a windowed count that includes the new event.
    ///
    /// Fires on the 3rd, 6th, 9th... event for `every = 3`; never for a zero divisor.
    pub fn threshold_reached(count: u64, every: u32) -> bool {
        let every = u64::from(every);
        every > 0 && count >= every && count % every == 0
    }
}

/// Alert policy per event kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicyTable {
    login_failed: AlertPolicy,
    password_changed: AlertPolicy,
}

impl AlertPolicyTable {
    pub fn new(failed_login_window: Duration, failed_login_every: u32) -> Self {
        Self {
            login_failed: AlertPolicy::Threshold {
                window: failed_login_window,
                every: failed_login_every,
            },
            password_changed: AlertPolicy::Always,
        }
    }

    pub fn policy_for(&self, event_type: SecurityEventType) -> AlertPolicy {
        match event_type {
            SecurityEventType::LoginFailed => self.login_failed,
            SecurityEventType::PasswordChanged => self.password_changed,
            SecurityEventType::LoginSuccess | SecurityEventType::SecretAccessed => {
                AlertPolicy::Never
            }
        }
    }
}

impl Default for AlertPolicyTable {
    fn default() -> Self {
        Self::new(Duration::minutes(15), 3)
    }
}
