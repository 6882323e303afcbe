//! Threshold alert dispatcher
//!
//! Decides, for each event just appended to the audit log, whether the
//! affected principal should be notified, and delivers the notification.
//!
//! Decision order:
//! 1. alerting disabled or policy `Never` → [`AlertOutcome::NotApplicable`]
//! 2. threshold policies count matching events in the trailing window; the
//!    count includes the new event and only exact multiples of `every` fire
//! 3. the username must resolve to a contact address
//! 4. delivery runs under a timeout; failures are logged and counted only

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{AlertPolicy, AlertPolicyTable, SecurityEventType, StoredSecurityEvent};
use crate::errors::Result;
use crate::notify::{failed_login_alert, password_changed_alert, AlertMessage, Notifier};
use crate::observability::MetricsRecorder;
use crate::storage::{RecipientResolver, SecurityEventRepository};

/// What the dispatcher did with one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// The event kind never alerts, or alerting is disabled
    NotApplicable,
    /// Threshold policy with a count that is not a firing multiple
    BelowThreshold { count: u64 },
    /// The alert fired but the username has no contact address
    NoRecipient,
    Delivered { recipient: String },
    DeliveryFailed { recipient: String, reason: String },
}

impl AlertOutcome {
    /// Whether a notification was attempted
    pub fn fired(&self) -> bool {
        matches!(self, AlertOutcome::Delivered { .. } | AlertOutcome::DeliveryFailed { .. })
    }

    /// Label used for the alert metrics `status` dimension
    pub fn status(&self) -> &'static str {
        match self {
            AlertOutcome::NotApplicable => "not_applicable",
            AlertOutcome::BelowThreshold { .. } => "below_threshold",
            AlertOutcome::NoRecipient => "no_recipient",
            AlertOutcome::Delivered { .. } => "delivered",
            AlertOutcome::DeliveryFailed { .. } => "delivery_failed",
        }
    }
}

pub struct AlertDispatcher {
    policies: AlertPolicyTable,
    events: Arc<dyn SecurityEventRepository>,
    recipients: Arc<dyn RecipientResolver>,
    notifier: Arc<dyn Notifier>,
    delivery_timeout: Duration,
    enabled: bool,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("policies", &self.policies)
            .field("notifier", &self.notifier.name())
            .field("delivery_timeout", &self.delivery_timeout)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(
        policies: AlertPolicyTable,
        events: Arc<dyn SecurityEventRepository>,
        recipients: Arc<dyn RecipientResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            policies,
            events,
            recipients,
            notifier,
            delivery_timeout: Duration::from_secs(10),
            enabled: true,
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Evaluate the policy for an appended event and notify when it fires.
    ///
    /// Only a failing count or recipient query is returned as an error.
    #[instrument(
        skip(self, stored),
        fields(event_id = stored.id, event_type = %stored.event.event_type, username = %stored.event.username),
        name = "alert_dispatch"
    )]
    pub async fn dispatch(&self, stored: &StoredSecurityEvent) -> Result<AlertOutcome> {
        let event = &stored.event;

        if !self.enabled {
            return Ok(AlertOutcome::NotApplicable);
        }

        let message = match self.policies.policy_for(event.event_type) {
            AlertPolicy::Never => return Ok(AlertOutcome::NotApplicable),
            AlertPolicy::Always => self.render(stored, 0, 0),
            AlertPolicy::Threshold { window, every } => {
                let count = self
                    .events
                    .count_in_window(event.event_type, &event.username, window, stored.created_at)
                    .await?;

                if !AlertPolicy::threshold_reached(count, every) {
                    debug!(count, every, "Alert threshold not reached");
                    return Ok(self.finish(event.event_type, AlertOutcome::BelowThreshold { count }));
                }

                warn!(
                    count,
                    window_minutes = window.num_minutes(),
                    ip_address = %event.ip_address,
                    "Repeated security events detected"
                );
                self.render(stored, window.num_minutes(), count)
            }
        };

        let Some(recipient) = self.recipients.contact_address(&event.username).await? else {
            debug!("No contact address for username, alert skipped");
            return Ok(self.finish(event.event_type, AlertOutcome::NoRecipient));
        };

        let outcome = self.deliver(&recipient, &message).await;
        Ok(self.finish(event.event_type, outcome))
    }

    fn render(&self, stored: &StoredSecurityEvent, window_minutes: i64, count: u64) -> AlertMessage {
        let event = &stored.event;
        match event.event_type {
            SecurityEventType::PasswordChanged => {
                password_changed_alert(&event.username, &event.ip_address, stored.created_at)
            }
            _ => failed_login_alert(
                &event.username,
                &event.ip_address,
                stored.created_at,
                window_minutes,
                count,
            ),
        }
    }

    async fn deliver(&self, recipient: &str, message: &AlertMessage) -> AlertOutcome {
        let send = self.notifier.send(recipient, &message.subject, &message.body);

        match tokio::time::timeout(self.delivery_timeout, send).await {
            Ok(Ok(())) => {
                info!(
                    recipient = %recipient,
                    notifier = self.notifier.name(),
                    subject = %message.subject,
                    "Security alert delivered"
                );
                AlertOutcome::Delivered { recipient: recipient.to_string() }
            }
            Ok(Err(e)) => {
                warn!(recipient = %recipient, error = %e, "Failed to deliver security alert");
                AlertOutcome::DeliveryFailed { recipient: recipient.to_string(), reason: e.to_string() }
            }
            Err(_) => {
                warn!(
                    recipient = %recipient,
                    timeout_ms = self.delivery_timeout.as_millis() as u64,
                    "Security alert delivery timed out"
                );
                AlertOutcome::DeliveryFailed {
                    recipient: recipient.to_string(),
                    reason: "delivery timed out".to_string(),
                }
            }
        }
    }

    fn finish(&self, event_type: SecurityEventType, outcome: AlertOutcome) -> AlertOutcome {
        self.metrics.record_alert(event_type.as_str(), outcome.status());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientContext, LoginFailureReason, NewPrincipal, SecurityEvent};
    use crate::notify::NotifyError;
    use crate::storage::test_helpers::migrated_pool;
    use crate::storage::{PrincipalRepository, SqlxPrincipalRepository, SqlxSecurityEventRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Outbox {
        fn name(&self) -> &'static str {
            "outbox"
        }

        async fn send(&self, recipient: &str, subject: &str, _body: &str) -> std::result::Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Send("relay refused".to_string()));
            }
            self.sent.lock().unwrap().push((recipient.to_string(), subject.to_string()));
            Ok(())
        }
    }

    async fn setup(outbox: Arc<Outbox>) -> (AlertDispatcher, Arc<SqlxSecurityEventRepository>) {
        let pool = migrated_pool().await;
        let events = Arc::new(SqlxSecurityEventRepository::new(pool.clone()));
        let principals = Arc::new(SqlxPrincipalRepository::new(pool));
        principals
            .upsert(NewPrincipal::new("alice").with_email("alice@example.com"))
            .await
            .unwrap();

        let dispatcher =
            AlertDispatcher::new(AlertPolicyTable::default(), events.clone(), principals, outbox);
        (dispatcher, events)
    }

    fn client() -> ClientContext {
        ClientContext::new("10.0.0.1", "test-agent")
    }

    #[tokio::test]
    async fn test_success_events_never_alert() {
        let outbox = Arc::new(Outbox::default());
        let (dispatcher, events) = setup(outbox.clone()).await;

        let stored =
            events.append(&SecurityEvent::login_succeeded("alice", &client()), Utc::now()).await.unwrap();
        assert_eq!(dispatcher.dispatch(&stored).await.unwrap(), AlertOutcome::NotApplicable);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_third_failure_fires() {
        let outbox = Arc::new(Outbox::default());
        let (dispatcher, events) = setup(outbox.clone()).await;
        let failed = SecurityEvent::login_failed("alice", &client(), LoginFailureReason::InvalidCredentials);

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            let stored = events.append(&failed, Utc::now()).await.unwrap();
            outcomes.push(dispatcher.dispatch(&stored).await.unwrap());
        }

        assert_eq!(outcomes[0], AlertOutcome::BelowThreshold { count: 1 });
        assert_eq!(outcomes[1], AlertOutcome::BelowThreshold { count: 2 });
        assert_eq!(outcomes[2], AlertOutcome::Delivered { recipient: "alice@example.com".to_string() });
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported_not_raised() {
        let outbox = Arc::new(Outbox { fail: true, ..Default::default() });
        let (dispatcher, events) = setup(outbox).await;

        let stored =
            events.append(&SecurityEvent::password_changed("alice", &client()), Utc::now()).await.unwrap();
        let outcome = dispatcher.dispatch(&stored).await.unwrap();

        assert!(outcome.fired());
        assert!(matches!(outcome, AlertOutcome::DeliveryFailed { .. }));
    }

    #[tokio::test]
    async fn test_disabled_dispatcher() {
        let outbox = Arc::new(Outbox::default());
        let (dispatcher, events) = setup(outbox.clone()).await;
        let dispatcher = dispatcher.with_enabled(false);

        let stored =
            events.append(&SecurityEvent::password_changed("alice", &client()), Utc::now()).await.unwrap();
        assert_eq!(dispatcher.dispatch(&stored).await.unwrap(), AlertOutcome::NotApplicable);
        assert!(outbox.sent.lock().unwrap().is_empty());
    }
}
