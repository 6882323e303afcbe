//! Security monitor: the single entry point for audit recording.
//!
//! Every event is counted, appended to the audit log and then handed to the
//! [`AlertDispatcher`] in the same call, so the alert decision always sees
//! the event that triggered it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use super::alerting::{AlertDispatcher, AlertOutcome};
use crate::domain::{
    ClientContext, LoginFailureReason, SecurityEvent, SecurityEventType, StoredSecurityEvent,
};
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use crate::storage::SecurityEventRepository;

/// An appended event and the alert decision it produced
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    pub event: StoredSecurityEvent,
    pub alert: AlertOutcome,
}

pub struct SecurityMonitor {
    events: Arc<dyn SecurityEventRepository>,
    dispatcher: AlertDispatcher,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for SecurityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityMonitor").field("dispatcher", &self.dispatcher).finish()
    }
}

impl SecurityMonitor {
    pub fn new(events: Arc<dyn SecurityEventRepository>, dispatcher: AlertDispatcher) -> Self {
        Self { events, dispatcher, metrics: MetricsRecorder::new() }
    }

    /// Record an event stamped with the current time
    pub async fn record(&self, event: SecurityEvent) -> Result<RecordedEvent> {
        self.record_at(event, Utc::now()).await
    }

    /// Record an event stamped with `now`
    #[instrument(
        skip(self, event),
        fields(event_type = %event.event_type, username = %event.username),
        name = "security_record"
    )]
    pub async fn record_at(&self, event: SecurityEvent, now: DateTime<Utc>) -> Result<RecordedEvent> {
        self.metrics.record_security_event(event.event_type);
        match event.event_type {
            SecurityEventType::LoginSuccess => self.metrics.record_login_attempt(true, &event.username),
            SecurityEventType::LoginFailed => self.metrics.record_login_attempt(false, &event.username),
            _ => {}
        }

        let stored = self.events.append(&event, now).await?;

        info!(
            event_id = stored.id,
            ip_address = %stored.event.ip_address,
            details = %stored.event.details,
            "Security event recorded"
        );

        let alert = self.dispatcher.dispatch(&stored).await?;

        Ok(RecordedEvent { event: stored, alert })
    }

    pub async fn login_succeeded(&self, username: &str, client: &ClientContext) -> Result<RecordedEvent> {
        self.record(SecurityEvent::login_succeeded(username, client)).await
    }

    pub async fn login_failed(
        &self,
        username: &str,
        client: &ClientContext,
        reason: LoginFailureReason,
    ) -> Result<RecordedEvent> {
        self.record(SecurityEvent::login_failed(username, client, reason)).await
    }

    pub async fn password_changed(&self, username: &str, client: &ClientContext) -> Result<RecordedEvent> {
        self.record(SecurityEvent::password_changed(username, client)).await
    }

    pub async fn secret_accessed(
        &self,
        username: &str,
        client: &ClientContext,
        display_name: &str,
    ) -> Result<RecordedEvent> {
        self.record(SecurityEvent::secret_accessed(username, client, display_name)).await
    }

    /// Newest-first view of the audit log
    pub async fn recent(&self, username: Option<&str>, limit: i64) -> Result<Vec<StoredSecurityEvent>> {
        self.events.list_recent(username, limit).await
    }
}
