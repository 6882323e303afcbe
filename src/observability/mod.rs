//! # Observability Infrastructure
//!
//! Structured logging via `tracing` and Prometheus metrics via the `metrics`
//! facade. Logging is installed for every CLI command; the metrics exporter
//! only by `monitor`.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{init_metrics, MetricsRecorder};
