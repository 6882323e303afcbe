//! Repository modules for data access
//!
//! Each repository is an `async_trait` trait with a `Sqlx*` implementation
//! over the shared SQLite pool.

pub mod principal;
pub mod secret_record;
pub mod security_event;

pub use principal::{PrincipalRepository, RecipientResolver, SqlxPrincipalRepository};
pub use secret_record::{
    SecretRecordRepository, SqlxSecretRecordRepository, SyncAddition, SyncReport,
    UpsertSecretRecord,
};
pub use security_event::{SecurityEventRepository, SqlxSecurityEventRepository};
