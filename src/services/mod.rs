//! Business logic services
//!
//! The services compose the storage repositories, the remote gateway and the
//! notifier. They are constructed once at startup (see [`crate::startup`])
//! and shared through `Arc`.

pub mod alerting;
pub mod reconciliation;
pub mod security_monitor;
pub mod stats_refresher;

pub use alerting::{AlertDispatcher, AlertOutcome};
pub use reconciliation::{
    CreateOutcome, DeleteOutcome, FetchedSecret, ReconciliationEngine, SecretSource,
    StorageLocation,
};
pub use security_monitor::{RecordedEvent, SecurityMonitor};
pub use stats_refresher::{BusinessSnapshot, StatsRefresher};
