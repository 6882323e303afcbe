//! Remote secret store integration.
//!
//! Secrets are mirrored into a managed secret store under a per-owner
//! namespace (`{owner}-{canonical_id}`). The local record store stays the
//! source of truth for listings; the remote store is preferred for values.
//!
//! # Architecture
//!
//! - [`RemoteSecretStore`]: backend-agnostic trait (create, update, get,
//!   delete, list)
//! - [`RemoteGateway`]: applies one hard deadline per operation and turns
//!   every failure into a [`RemoteOutcome`] so callers can fall back locally
//!
//! # Backends
//!
//! - **AWS Secrets Manager**: `aws` feature
//! - **In-memory**: process-local, for development and tests
//!
//! ```rust,ignore
//! use std::{sync::Arc, time::Duration};
//! use safevault::secrets::{InMemoryRemoteStore, RemoteGateway};
//!
//! let gateway = RemoteGateway::new(Arc::new(InMemoryRemoteStore::new()), Duration::from_secs(3));
//! let outcome = gateway.create_or_update("alice-api-key", "s3cr3t", "User: alice - ").await;
//! ```

pub mod client;
pub mod error;
pub mod gateway;
pub mod memory;

#[cfg(feature = "aws")]
pub mod aws;

pub use client::{RemoteSecretEntry, RemoteSecretStore};
pub use error::RemoteStoreError;
pub use gateway::{RemoteGateway, RemoteOutcome, RemoteWrite};
pub use memory::InMemoryRemoteStore;

#[cfg(feature = "aws")]
pub use aws::AwsSecretsManagerStore;
