//! Secret reconciliation engine
//!
//! Keeps the local record store and the remote secret store consistent for
//! each owner while tolerating an unreachable remote store.
//!
//! - Writes go to the remote store first (bounded), then always to the local
//!   store.
//! - Reads prefer the remote value and fall back to the local record. Only
//!   fallback reads are audited.
//! - Listings are served from the local store, after folding in whatever the
//!   remote store reports for the owner's namespace.
//!
//! Remote faults never reach callers. The only errors returned are
//! validation failures, `NotFound`, and local store faults.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use super::security_monitor::SecurityMonitor;
use crate::domain::{
    prettify, remote_id, sanitize, strip_namespace, validate_display_name, CanonicalId,
    ClientContext, NewSecret, SecretOrigin, SecretRecord,
};
use crate::errors::{Result, SafeVaultError};
use crate::observability::MetricsRecorder;
use crate::secrets::{RemoteGateway, RemoteOutcome, RemoteSecretEntry};
use crate::storage::{SecretRecordRepository, SyncAddition, UpsertSecretRecord};

/// Where a created secret ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    RemoteAndLocal,
    LocalOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub record: SecretRecord,
    pub location: StorageLocation,
}

/// Which store answered a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedSecret {
    pub display_name: String,
    pub value: String,
    pub source: SecretSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub remote_deleted: bool,
}

/// Description stored remotely, carrying the owner for out-of-band readers
pub fn remote_description(owner: &str, description: &str) -> String {
    format!("User: {} - {}", owner, description)
}

/// Undo [`remote_description`] for entries written by this engine
pub fn local_description(owner: &str, remote: Option<&str>) -> String {
    let remote = remote.unwrap_or_default();
    let prefix = format!("User: {} - ", owner);
    remote.strip_prefix(&prefix).unwrap_or(remote).to_string()
}

fn validate_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(SafeVaultError::validation_field("Owner cannot be blank", "owner"));
    }
    Ok(())
}

pub struct ReconciliationEngine {
    records: Arc<dyn SecretRecordRepository>,
    remote: RemoteGateway,
    monitor: Arc<SecurityMonitor>,
    metrics: MetricsRecorder,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine").field("remote", &self.remote).finish()
    }
}

impl ReconciliationEngine {
    pub fn new(
        records: Arc<dyn SecretRecordRepository>,
        remote: RemoteGateway,
        monitor: Arc<SecurityMonitor>,
    ) -> Self {
        Self { records, remote, monitor, metrics: MetricsRecorder::new() }
    }

    pub fn remote(&self) -> &RemoteGateway {
        &self.remote
    }

    /// Store a secret remotely (best effort) and locally.
    ///
    /// A display name that sanitizes to an existing canonical id overwrites
    /// that secret.
    #[instrument(
        skip(self, request),
        fields(owner = %owner, display_name = %request.display_name),
        name = "reconcile_create"
    )]
    pub async fn create(&self, owner: &str, request: NewSecret) -> Result<CreateOutcome> {
        validate_owner(owner)?;
        request.validate()?;

        let canonical_id = sanitize(&request.display_name);
        let remote_id = remote_id(owner, &canonical_id);
        let description = remote_description(owner, &request.description);

        let location = match self.remote.create_or_update(&remote_id, &request.value, &description).await {
            RemoteOutcome::Completed(write) => {
                debug!(remote_id = %remote_id, write = ?write, "Secret stored remotely");
                StorageLocation::RemoteAndLocal
            }
            RemoteOutcome::Disabled => StorageLocation::LocalOnly,
            outcome => {
                info!(status = outcome.status(), "Remote store unavailable, storing locally only");
                self.metrics.record_local_fallback("create");
                StorageLocation::LocalOnly
            }
        };

        if let Some(existing) = self.records.find(owner, &canonical_id).await? {
            if existing.display_name != request.display_name {
                warn!(
                    canonical_id = %canonical_id,
                    previous_display_name = %existing.display_name,
                    "Display name collides with an existing secret, overwriting it"
                );
            }
        }

        let category = request.effective_category();
        let record = self
            .records
            .upsert(UpsertSecretRecord {
                owner: owner.to_string(),
                display_name: request.display_name,
                canonical_id,
                value: request.value,
                description: request.description,
                category,
            })
            .await?;

        info!(record_id = record.id, location = ?location, "Secret stored");

        Ok(CreateOutcome { record, location })
    }

    /// Read a secret value, preferring the remote store.
    ///
    /// Local fallback reads are recorded as `SECRET_ACCESSED` events. The
    /// returned value may be the remote placeholder when the secret was only
    /// ever seen in a remote listing.
    #[instrument(skip(self, client), fields(owner = %owner, display_name = %display_name), name = "reconcile_fetch")]
    pub async fn fetch(
        &self,
        owner: &str,
        display_name: &str,
        client: &ClientContext,
    ) -> Result<FetchedSecret> {
        validate_owner(owner)?;
        validate_display_name(display_name)?;

        let canonical_id = sanitize(display_name);
        let remote_id = remote_id(owner, &canonical_id);

        match self.remote.get(&remote_id).await {
            RemoteOutcome::Completed(value) => {
                debug!(remote_id = %remote_id, "Secret served from remote store");
                return Ok(FetchedSecret {
                    display_name: display_name.to_string(),
                    value,
                    source: SecretSource::Remote,
                });
            }
            RemoteOutcome::Disabled => {}
            _ => self.metrics.record_local_fallback("fetch"),
        }

        let record = self
            .records
            .find(owner, &canonical_id)
            .await?
            .ok_or_else(|| SafeVaultError::not_found("secret", display_name))?;

        self.monitor.secret_accessed(owner, client, &record.display_name).await?;

        Ok(FetchedSecret {
            display_name: record.display_name,
            value: record.value,
            source: SecretSource::Local,
        })
    }

    /// Delete a secret from both stores.
    ///
    /// The remote delete is best effort; the local record decides `NotFound`.
    #[instrument(skip(self), fields(owner = %owner, display_name = %display_name), name = "reconcile_delete")]
    pub async fn delete(&self, owner: &str, display_name: &str) -> Result<DeleteOutcome> {
        validate_owner(owner)?;
        validate_display_name(display_name)?;

        let canonical_id = sanitize(display_name);
        let remote_id = remote_id(owner, &canonical_id);

        let remote_deleted = match self.remote.delete(&remote_id).await {
            RemoteOutcome::Completed(()) => true,
            RemoteOutcome::Disabled => false,
            _ => {
                self.metrics.record_local_fallback("delete");
                false
            }
        };

        if !self.records.delete(owner, &canonical_id).await? {
            return Err(SafeVaultError::not_found("secret", display_name));
        }

        info!(remote_deleted, "Secret deleted");
        Ok(DeleteOutcome { remote_deleted })
    }

    /// List an owner's secrets after folding in the remote listing.
    ///
    /// When the remote listing fails the local records are returned as they
    /// are. Otherwise remote ids with no local record become placeholder
    /// records and `remote_synced` records missing remotely are removed.
    #[instrument(skip(self), fields(owner = %owner), name = "reconcile_list")]
    pub async fn list_with_sync(&self, owner: &str) -> Result<Vec<SecretRecord>> {
        validate_owner(owner)?;

        let local = self.records.list_by_owner(owner).await?;

        let entries = match self.remote.list(&format!("{}-", owner)).await {
            RemoteOutcome::Completed(entries) => entries,
            RemoteOutcome::Disabled => return Ok(local),
            outcome => {
                info!(status = outcome.status(), "Remote listing unavailable, returning local records");
                self.metrics.record_local_fallback("list");
                return Ok(local);
            }
        };

        let (additions, removals) = plan_sync(owner, &local, entries);

        if additions.is_empty() && removals.is_empty() {
            debug!(records = local.len(), "Local records already in sync");
            return Ok(local);
        }

        let report = self.records.apply_sync(owner, &additions, &removals).await?;
        self.metrics.record_sync(report.added, report.removed);

        info!(added = report.added, removed = report.removed, "Synced records with remote listing");

        self.records.list_by_owner(owner).await
    }
}

/// Diff a remote listing against the owner's local records.
fn plan_sync(
    owner: &str,
    local: &[SecretRecord],
    entries: Vec<RemoteSecretEntry>,
) -> (Vec<SyncAddition>, Vec<CanonicalId>) {
    let remote: HashMap<CanonicalId, RemoteSecretEntry> = entries
        .into_iter()
        .filter_map(|entry| strip_namespace(owner, &entry.id).map(|id| (id, entry)))
        .collect();

    let local_ids: HashSet<&CanonicalId> = local.iter().map(|r| &r.canonical_id).collect();
    let now = Utc::now();

    let mut additions: Vec<SyncAddition> = remote
        .iter()
        .filter(|(id, _)| !local_ids.contains(id))
        .map(|(id, entry)| SyncAddition {
            canonical_id: id.clone(),
            display_name: prettify(id),
            description: local_description(owner, entry.description.as_deref()),
            created_at: entry.created_at.unwrap_or(now),
        })
        .collect();
    additions.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

    let removals = local
        .iter()
        .filter(|r| r.origin == SecretOrigin::RemoteSynced && !remote.contains_key(&r.canonical_id))
        .map(|r| r.canonical_id.clone())
        .collect();

    (additions, removals)
}
