//! Test database utilities for integration tests.
//!
//! Provides file-based SQLite databases in a per-test temporary directory so
//! the pool behaves like production (WAL, several connections).

#![allow(clippy::duplicate_mod)]

use safevault::config::DatabaseConfig;
use safevault::storage::{create_pool, DbPool};
use std::path::PathBuf;
use tempfile::TempDir;

/// A test database that is removed together with its directory on drop.
pub struct TestDatabase {
    pub pool: DbPool,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a new test database with migrations applied.
    pub async fn new(prefix: &str) -> Self {
        Self::with_options(prefix, true).await
    }

    /// Create a new test database without running migrations.
    pub async fn new_without_migrations(prefix: &str) -> Self {
        Self::with_options(prefix, false).await
    }

    pub async fn with_options(prefix: &str, run_migrations: bool) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("safevault_{}_", prefix))
            .tempdir()
            .expect("create test database directory");
        let path = dir.path().join("safevault.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 5,
            min_connections: 0,
            auto_migrate: run_migrations,
            ..Default::default()
        };
        let pool = create_pool(&config).await.expect("create test database pool");

        Self { pool, path, _dir: dir }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
