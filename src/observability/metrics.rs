//! # Metrics Collection
//!
//! Prometheus metrics for security events, login attempts, alert delivery,
//! remote store calls and business gauges.
//!
//! Recording goes through the `metrics` facade, so with no exporter
//! installed every call is a no-op. Services hold a [`MetricsRecorder`]
//! unconditionally.

use crate::config::ObservabilityConfig;
use crate::domain::SecurityEventType;
use crate::errors::{Result, SafeVaultError};
use ::tracing::{info, warn};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Statuses reported for remote store operations
const REMOTE_STATUSES: &[&str] = &[
    "success",
    "already_exists",
    "not_found",
    "unavailable",
    "access_denied",
    "error",
    "timeout",
];

const REMOTE_OPERATIONS: &[&str] = &["create", "get", "delete", "list"];

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record one appended security event
    pub fn record_security_event(&self, event_type: SecurityEventType) {
        counter!("safevault_security_events_total", "event_type" => event_type.as_str())
            .increment(1);
    }

    /// Record a login attempt; failures are also counted per username
    pub fn record_login_attempt(&self, success: bool, username: &str) {
        let status = if success { "success" } else { "failed" };
        counter!("safevault_login_attempts_total", "status" => status).increment(1);

        if !success {
            let labels = [("username", username.to_string())];
            counter!("safevault_failed_logins_total", &labels).increment(1);
        }
    }

    /// Record an alert decision (`kind` is the event type, `status` the outcome)
    pub fn record_alert(&self, kind: &str, status: &str) {
        let labels = [("kind", kind.to_string()), ("status", status.to_string())];
        counter!("safevault_alerts_total", &labels).increment(1);
    }

    /// Record one bounded remote store call with its wall-clock duration
    pub fn record_remote_operation(
        &self,
        backend: &str,
        operation: &str,
        status: &str,
        duration: f64,
    ) {
        let labels = [
            ("backend", backend.to_string()),
            ("operation", operation.to_string()),
            ("status", status.to_string()),
        ];
        counter!("safevault_remote_operations_total", &labels).increment(1);

        let duration_labels = [("backend", backend.to_string()), ("operation", operation.to_string())];
        histogram!("safevault_remote_operation_duration_seconds", &duration_labels)
            .record(duration);
    }

    /// Record a local fallback taken after the remote store did not answer
    pub fn record_local_fallback(&self, operation: &str) {
        counter!("safevault_local_fallbacks_total", "operation" => operation.to_string())
            .increment(1);
    }

    /// Record records added and removed by one listing reconciliation
    pub fn record_sync(&self, added: u64, removed: u64) {
        counter!("safevault_sync_runs_total").increment(1);
        counter!("safevault_sync_records_added_total").increment(added);
        counter!("safevault_sync_records_removed_total").increment(removed);
    }

    /// Update the active principal gauge
    pub fn set_active_users(&self, count: u64) {
        gauge!("safevault_active_users").set(count as f64);
    }

    /// Update the stored secret gauge
    pub fn set_secrets_total(&self, count: u64) {
        gauge!("safevault_secrets_total").set(count as f64);
    }

    /// Register descriptions and zero values so series appear before events occur.
    pub fn register_metrics(&self) {
        describe_counter!(
            "safevault_security_events_total",
            Unit::Count,
            "Security events appended to the audit log, by event type"
        );
        describe_counter!(
            "safevault_login_attempts_total",
            Unit::Count,
            "Login attempts grouped by outcome"
        );
        describe_counter!(
            "safevault_failed_logins_total",
            Unit::Count,
            "Failed login attempts per username"
        );
        describe_counter!(
            "safevault_alerts_total",
            Unit::Count,
            "Alert decisions grouped by kind and delivery status"
        );
        describe_counter!(
            "safevault_remote_operations_total",
            Unit::Count,
            "Remote secret store calls grouped by operation and status"
        );
        describe_histogram!(
            "safevault_remote_operation_duration_seconds",
            Unit::Seconds,
            "Wall-clock duration of remote secret store calls, bounded by the deadline"
        );
        describe_counter!(
            "safevault_local_fallbacks_total",
            Unit::Count,
            "Operations served by the local store after a remote failure or timeout"
        );
        describe_counter!("safevault_sync_runs_total", Unit::Count, "Listing reconciliations run");
        describe_counter!(
            "safevault_sync_records_added_total",
            Unit::Count,
            "Placeholder records added by listing reconciliation"
        );
        describe_counter!(
            "safevault_sync_records_removed_total",
            Unit::Count,
            "Remote-synced records removed by listing reconciliation"
        );
        describe_gauge!("safevault_active_users", Unit::Count, "Active principals");
        describe_gauge!("safevault_secrets_total", Unit::Count, "Secret records in the local store");

        for event_type in SecurityEventType::ALL {
            counter!("safevault_security_events_total", "event_type" => event_type.as_str())
                .absolute(0);
        }
        for status in ["success", "failed"] {
            counter!("safevault_login_attempts_total", "status" => status).absolute(0);
        }
        for operation in REMOTE_OPERATIONS {
            for status in REMOTE_STATUSES {
                counter!(
                    "safevault_remote_operations_total",
                    "operation" => *operation,
                    "status" => *status
                )
                .absolute(0);
            }
        }
        counter!("safevault_sync_runs_total").absolute(0);
        gauge!("safevault_active_users").set(0.0);
        gauge!("safevault_secrets_total").set(0.0);
    }
}

/// Initialize metrics collection and the Prometheus exporter
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        SafeVaultError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| {
            SafeVaultError::config(format!("Failed to initialize metrics exporter: {}", e))
        })?;

    MetricsRecorder::new().register_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}
