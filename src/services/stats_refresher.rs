//! Periodic business stats refresh
//!
//! Reads the active principal count and the total number of secret records on
//! a fixed interval, publishes them as a [`BusinessSnapshot`] on a `watch`
//! channel and mirrors them into gauges. Request handling never writes here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::observability::MetricsRecorder;
use crate::storage::{PrincipalRepository, SecretRecordRepository};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusinessSnapshot {
    pub active_users: u64,
    pub secrets_total: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

pub struct StatsRefresher {
    principals: Arc<dyn PrincipalRepository>,
    records: Arc<dyn SecretRecordRepository>,
    interval: Duration,
    tx: watch::Sender<BusinessSnapshot>,
    metrics: MetricsRecorder,
}

impl StatsRefresher {
    pub fn new(
        principals: Arc<dyn PrincipalRepository>,
        records: Arc<dyn SecretRecordRepository>,
        interval: Duration,
    ) -> Self {
        let (tx, _rx) = watch::channel(BusinessSnapshot::default());
        Self { principals, records, interval, tx, metrics: MetricsRecorder::new() }
    }

    /// Receiver for published snapshots
    pub fn subscribe(&self) -> watch::Receiver<BusinessSnapshot> {
        self.tx.subscribe()
    }

    /// Read both counts once and publish them
    pub async fn refresh_once(&self) -> Result<BusinessSnapshot> {
        let active_users = self.principals.count_active().await?.max(0) as u64;
        let secrets_total = self.records.count_all().await?.max(0) as u64;

        self.metrics.set_active_users(active_users);
        self.metrics.set_secrets_total(secrets_total);

        let snapshot = BusinessSnapshot { active_users, secrets_total, refreshed_at: Some(Utc::now()) };
        self.tx.send_replace(snapshot.clone());

        debug!(active_users, secrets_total, "Business stats refreshed");
        Ok(snapshot)
    }

    /// Run the refresh loop until `shutdown` is cancelled.
    ///
    /// The first refresh happens immediately. Failed refreshes are logged and
    /// the previous snapshot stays published.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Business stats refresher started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Business stats refresher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh_once().await {
                            warn!(error = %e, "Failed to refresh business stats");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sanitize, NewPrincipal};
    use crate::storage::test_helpers::migrated_pool;
    use crate::storage::{SqlxPrincipalRepository, SqlxSecretRecordRepository, UpsertSecretRecord};

    type Fixture = (Arc<StatsRefresher>, Arc<SqlxPrincipalRepository>, Arc<SqlxSecretRecordRepository>);

    async fn refresher(interval: Duration) -> Fixture {
        let pool = migrated_pool().await;
        let principals = Arc::new(SqlxPrincipalRepository::new(pool.clone()));
        let records = Arc::new(SqlxSecretRecordRepository::new(pool));
        let refresher = Arc::new(StatsRefresher::new(principals.clone(), records.clone(), interval));
        (refresher, principals, records)
    }

    #[tokio::test]
    async fn test_refresh_once_publishes_counts() {
        let (refresher, principals, records) = refresher(Duration::from_secs(30)).await;
        principals.upsert(NewPrincipal::new("alice")).await.unwrap();
        principals.upsert(NewPrincipal::new("bob").inactive()).await.unwrap();
        records
            .upsert(UpsertSecretRecord {
                owner: "alice".to_string(),
                display_name: "API Key".to_string(),
                canonical_id: sanitize("API Key"),
                value: "v".to_string(),
                description: String::new(),
                category: "general".to_string(),
            })
            .await
            .unwrap();

        let rx = refresher.subscribe();
        let snapshot = refresher.refresh_once().await.unwrap();

        assert_eq!(snapshot.active_users, 1);
        assert_eq!(snapshot.secrets_total, 1);
        assert_eq!(*rx.borrow(), snapshot);
    }

    #[tokio::test]
    async fn test_loop_stops_on_cancel() {
        let (refresher, _, _) = refresher(Duration::from_millis(10)).await;
        let mut rx = refresher.subscribe();
        let shutdown = CancellationToken::new();

        let handle = refresher.clone().spawn(shutdown.clone());
        rx.changed().await.unwrap();
        assert!(rx.borrow().refreshed_at.is_some());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
