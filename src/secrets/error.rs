//! Error types for remote secret store operations.
//!
//! None of these reach a caller of the reconciliation engine: they only
//! decide which fallback path runs and what gets logged.

use thiserror::Error;

/// Result type for remote store operations.
pub type Result<T> = std::result::Result<T, RemoteStoreError>;

/// Errors reported by a remote secret store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteStoreError {
    /// The identifier is already taken; create converts this into an update.
    #[error("Secret already exists: {id}")]
    AlreadyExists { id: String },

    /// No secret with this identifier.
    #[error("Secret not found: {id}")]
    NotFound { id: String },

    /// The backend could not be reached or did not answer in time.
    #[error("Remote store unavailable: {message}")]
    Unavailable { message: String },

    /// Credentials were rejected or lack permission.
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// Any other backend-specific failure.
    #[error("Backend error: {message}")]
    Backend { message: String },
}

impl RemoteStoreError {
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied { message: message.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    /// Short label used as a metrics status
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "already_exists",
            Self::NotFound { .. } => "not_found",
            Self::Unavailable { .. } => "unavailable",
            Self::AccessDenied { .. } => "access_denied",
            Self::Backend { .. } => "error",
        }
    }
}
