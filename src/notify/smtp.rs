//! SMTP delivery via `lettre`.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{Notifier, NotifyError};
use crate::config::SmtpConfig;

const FROM_NAME: &str = "SafeVault Security";

/// Sends plain-text alerts over SMTP.
///
/// The transport connects lazily on the first send.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier").field("from", &self.from_mailbox.to_string()).finish()
    }
}

impl SmtpNotifier {
    #[tracing::instrument(
        name = "smtp_notifier_new",
        skip(config),
        fields(host = %config.host, port = %config.port, starttls = %config.starttls)
    )]
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = format!("{} <{}>", FROM_NAME, config.from_address)
            .parse()
            .map_err(|e| NotifyError::Address(format!("{e}")))?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Config(format!("{e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::debug!("SMTP notifier initialized");

        Ok(Self { transport: builder.build(), from_mailbox })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &'static str {
        "smtp"
    }

    #[tracing::instrument(name = "smtp_send_alert", skip(self, body), fields(to = %recipient, subject = %subject))]
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let to_mailbox: Mailbox =
            recipient.parse().map_err(|e| NotifyError::Address(format!("{e}")))?;

        let message = Message::builder()
            .from(self.from_mailbox.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Send(format!("failed to build message: {e}")))?;

        self.transport.send(message).await.map_err(|e| NotifyError::Send(format!("{e}")))?;

        tracing::info!("Security alert sent");
        Ok(())
    }
}
