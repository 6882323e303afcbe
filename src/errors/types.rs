//! # Error Types
//!
//! Error types for SafeVault using `thiserror`.
//!
//! Remote secret store faults are deliberately absent here: they are
//! represented by [`crate::secrets::RemoteStoreError`] and always recovered
//! locally, so they never reach a caller as a `SafeVaultError`.

/// Custom result type for SafeVault operations
pub type Result<T> = std::result::Result<T, SafeVaultError>;

/// Main error type for SafeVault
#[derive(thiserror::Error, Debug)]
pub enum SafeVaultError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local record store errors. There is no further fallback behind the
    /// local store, so these are always fatal to the operation.
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Input validation errors, raised before any store is touched
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Resource not found after remote and local lookup
    #[error("Resource not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SafeVaultError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Whether this error is visible to callers as a normal outcome rather
    /// than a fault of the local store or the process.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, SafeVaultError::Validation { .. } | SafeVaultError::NotFound { .. })
    }

    /// Whether the local record store itself failed
    pub fn is_store_failure(&self) -> bool {
        matches!(self, SafeVaultError::Database { .. } | SafeVaultError::Migration(_))
    }

    /// Process exit code used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SafeVaultError::Validation { .. } => 2,
            SafeVaultError::NotFound { .. } => 3,
            SafeVaultError::Config { .. } => 78,
            SafeVaultError::Database { .. } | SafeVaultError::Migration(_) => 74,
            _ => 1,
        }
    }
}

impl From<sqlx::Error> for SafeVaultError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for SafeVaultError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for SafeVaultError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for SafeVaultError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for SafeVaultError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        let field = if fields.len() == 1 { Some(fields[0].0.to_string()) } else { None };

        Self::Validation { message: format!("Validation failed: {}", message), field }
    }
}
