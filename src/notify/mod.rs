//! # Alert Delivery
//!
//! [`Notifier`] is the seam between alert decisions and the transport that
//! carries them. [`SmtpNotifier`] sends plain-text mail; [`LogNotifier`] is
//! used when no SMTP transport is configured and only logs the subject.

pub mod smtp;
pub mod templates;

pub use smtp::SmtpNotifier;
pub use templates::{failed_login_alert, password_changed_alert, AlertMessage};

use async_trait::async_trait;
use tracing::info;

/// Errors raised while delivering a notification.
///
/// Delivery faults are logged and counted by the caller, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The transport could not be built from configuration
    #[error("Invalid notifier configuration: {0}")]
    Config(String),

    /// The recipient or sender address could not be parsed
    #[error("Invalid email address: {0}")]
    Address(String),

    /// The message could not be sent
    #[error("Delivery failed: {0}")]
    Send(String),
}

/// Delivers an alert message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs and metrics
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that records alerts in the log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        info!(recipient = %recipient, subject = %subject, "Email not configured, alert logged only");
        Ok(())
    }
}
