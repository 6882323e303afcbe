//! Test database utilities for in-library tests.
//!
//! Each helper returns a pool over a fresh private in-memory SQLite
//! database. The pool holds a single connection so every query sees the
//! same database.

use crate::config::DatabaseConfig;
use crate::storage::{create_pool, DbPool};

fn memory_config(auto_migrate: bool) -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        idle_timeout_seconds: 0,
        auto_migrate,
        ..Default::default()
    }
}

/// Empty in-memory database with no schema
pub async fn memory_pool() -> DbPool {
    create_pool(&memory_config(false)).await.expect("in-memory pool")
}

/// In-memory database with every migration applied
pub async fn migrated_pool() -> DbPool {
    create_pool(&memory_config(true)).await.expect("migrated in-memory pool")
}
