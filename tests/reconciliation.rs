//! Integration tests for secret reconciliation between the local record
//! store and the remote secret store.

mod common;

use std::time::{Duration, Instant};

use common::Harness;
use safevault::domain::{ClientContext, NewSecret, SecretOrigin, SecurityEventType, REMOTE_PLACEHOLDER};
use safevault::secrets::RemoteSecretStore;
use safevault::services::{SecretSource, StorageLocation};
use safevault::SafeVaultError;

fn client() -> ClientContext {
    ClientContext::new("192.168.1.20", "integration-test")
}

#[tokio::test]
async fn test_create_mirrors_to_remote_and_fetch_prefers_remote() {
    let h = Harness::new("create_mirror").await;
    let engine = &h.services.engine;

    let outcome = engine
        .create("alice", NewSecret::new("API Key", "sk-123").with_description("billing"))
        .await
        .unwrap();

    assert_eq!(outcome.location, StorageLocation::RemoteAndLocal);
    assert_eq!(outcome.record.canonical_id.as_str(), "api-key");
    assert_eq!(outcome.record.category, "general");
    assert_eq!(outcome.record.origin, SecretOrigin::Local);
    assert!(h.remote.contains("alice-api-key").await);

    let fetched = engine.fetch("alice", "API Key", &client()).await.unwrap();
    assert_eq!(fetched.value, "sk-123");
    assert_eq!(fetched.source, SecretSource::Remote);

    // remote reads are not audited
    let events = h.services.monitor.recent(Some("alice"), 10).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_colliding_display_names_overwrite_one_secret() {
    let h = Harness::new("collision").await;
    let engine = &h.services.engine;

    engine.create("alice", NewSecret::new("API Key", "first")).await.unwrap();
    let second = engine.create("alice", NewSecret::new("api_key", "second")).await.unwrap();
    assert_eq!(second.location, StorageLocation::RemoteAndLocal);

    let records = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].display_name, "api_key");
    assert_eq!(records[0].value, "second");

    assert_eq!(h.remote.get_secret("alice-api-key").await.unwrap(), "second");
}

#[tokio::test]
async fn test_failing_remote_falls_back_to_local_and_audits_reads() {
    let h = Harness::with_failing_remote("failing_remote").await;
    let engine = &h.services.engine;

    let outcome = engine.create("alice", NewSecret::new("DB Pass", "hunter2")).await.unwrap();
    assert_eq!(outcome.location, StorageLocation::LocalOnly);

    let fetched = engine.fetch("alice", "DB Pass", &client()).await.unwrap();
    assert_eq!(fetched.value, "hunter2");
    assert_eq!(fetched.source, SecretSource::Local);

    let events = h.services.monitor.recent(Some("alice"), 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.event_type, SecurityEventType::SecretAccessed);
    assert_eq!(events[0].event.details, "Accessed secret: DB Pass");
    assert_eq!(events[0].event.ip_address, "192.168.1.20");

    let records = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(records.len(), 1);

    let deleted = engine.delete("alice", "DB Pass").await.unwrap();
    assert!(!deleted.remote_deleted);
    assert!(engine.list_with_sync("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_adds_placeholder_for_remote_only_secret() {
    let h = Harness::new("sync_placeholder").await;
    let engine = &h.services.engine;

    h.remote.create_secret("alice-db-pass", "from-console", "User: alice - prod db").await.unwrap();
    h.remote.create_secret("bob-db-pass", "not-alice", "").await.unwrap();

    let records = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.display_name, "Db Pass");
    assert_eq!(record.canonical_id.as_str(), "db-pass");
    assert_eq!(record.value, REMOTE_PLACEHOLDER);
    assert!(record.is_placeholder());
    assert_eq!(record.description, "prod db");
    assert_eq!(record.origin, SecretOrigin::RemoteSynced);

    // the remote value is still served while the remote store answers
    let fetched = engine.fetch("alice", "Db Pass", &client()).await.unwrap();
    assert_eq!(fetched.value, "from-console");
    assert_eq!(fetched.source, SecretSource::Remote);
}

#[tokio::test]
async fn test_repeated_sync_is_idempotent() {
    let h = Harness::new("sync_idempotent").await;
    let engine = &h.services.engine;

    engine.create("alice", NewSecret::new("API Key", "sk")).await.unwrap();
    h.remote.create_secret("alice-db-pass", "x", "").await.unwrap();

    let first = engine.list_with_sync("alice").await.unwrap();
    let second = engine.list_with_sync("alice").await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sync_removes_only_vanished_synced_records() {
    let h = Harness::new("sync_removal").await;
    let engine = &h.services.engine;

    engine.create("alice", NewSecret::new("API Key", "sk")).await.unwrap();
    h.remote.create_secret("alice-db-pass", "x", "").await.unwrap();
    assert_eq!(engine.list_with_sync("alice").await.unwrap().len(), 2);

    // both disappear remotely; only the synced placeholder goes locally
    h.remote.remove_out_of_band("alice-db-pass").await;
    h.remote.remove_out_of_band("alice-api-key").await;

    let records = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].canonical_id.as_str(), "api-key");
    assert_eq!(records[0].origin, SecretOrigin::Local);
}

#[tokio::test]
async fn test_listing_failure_leaves_local_records_unchanged() {
    let h = Harness::new("list_failure").await;
    let engine = &h.services.engine;

    h.remote.create_secret("alice-db-pass", "x", "").await.unwrap();
    let before = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(before.len(), 1);

    h.remote.remove_out_of_band("alice-db-pass").await;
    h.remote.set_available(false);

    let after = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_local_only_record_survives_remote_recovery() {
    let h = Harness::new("remote_recovery").await;
    let engine = &h.services.engine;

    h.remote.set_available(false);
    let outcome = engine.create("alice", NewSecret::new("Token", "t-1")).await.unwrap();
    assert_eq!(outcome.location, StorageLocation::LocalOnly);

    h.remote.set_available(true);
    let records = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "t-1");
    assert!(!h.remote.contains("alice-token").await);
}

#[tokio::test]
async fn test_slow_remote_is_abandoned_at_deadline() {
    let h = Harness::with_deadline("slow_remote", Duration::from_millis(100)).await;
    let engine = &h.services.engine;
    h.remote.set_latency(Duration::from_secs(3));

    let start = Instant::now();
    let outcome = engine.create("alice", NewSecret::new("API Key", "sk")).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.location, StorageLocation::LocalOnly);

    let start = Instant::now();
    let fetched = engine.fetch("alice", "API Key", &client()).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(fetched.source, SecretSource::Local);
}

#[tokio::test]
async fn test_missing_secret_is_not_found() {
    let h = Harness::new("not_found").await;
    let engine = &h.services.engine;

    let err = engine.fetch("alice", "Nope", &client()).await.unwrap_err();
    assert!(matches!(err, SafeVaultError::NotFound { .. }));

    let err = engine.delete("alice", "Nope").await.unwrap_err();
    assert!(matches!(err, SafeVaultError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_removes_from_both_stores() {
    let h = Harness::new("delete_both").await;
    let engine = &h.services.engine;

    engine.create("alice", NewSecret::new("API Key", "sk")).await.unwrap();
    let outcome = engine.delete("alice", "api key").await.unwrap();

    assert!(outcome.remote_deleted);
    assert!(!h.remote.contains("alice-api-key").await);
    assert!(engine.list_with_sync("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_store_call() {
    let h = Harness::new("validation").await;
    let engine = &h.services.engine;

    let err = engine.create("alice", NewSecret::new("   ", "v")).await.unwrap_err();
    assert!(matches!(err, SafeVaultError::Validation { .. }));

    let err = engine.create("", NewSecret::new("API Key", "v")).await.unwrap_err();
    assert!(matches!(err, SafeVaultError::Validation { .. }));

    let err = engine.create("alice", NewSecret::new("API Key", "")).await.unwrap_err();
    assert!(matches!(err, SafeVaultError::Validation { .. }));

    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_owners_do_not_see_each_other() {
    let h = Harness::new("owner_isolation").await;
    let engine = &h.services.engine;

    engine.create("alice", NewSecret::new("API Key", "a")).await.unwrap();
    engine.create("bob", NewSecret::new("API Key", "b")).await.unwrap();

    let alice = engine.list_with_sync("alice").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[0].value, "a");

    let fetched = engine.fetch("bob", "API Key", &client()).await.unwrap();
    assert_eq!(fetched.value, "b");
}
