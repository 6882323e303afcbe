//! Secret domain types
//!
//! A secret is addressed by the owner that created it and a canonical id
//! derived from its user-facing display name. The same canonical id, prefixed
//! with the owner as a namespace token, names the secret in the remote store.
//!
//! ## Identifier mapping
//!
//! - [`sanitize`]: display name to canonical id (lowercase, spaces and
//!   underscores become hyphens). Total and deterministic; distinct display
//!   names may collide.
//! - [`prettify`]: canonical id back to a readable display name. Lossy.
//! - [`remote_id`] / [`strip_namespace`]: add or remove the `"{owner}-"`
//!   namespace used in the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Decode, Encode, Sqlite, Type};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Sentinel value stored locally for secrets whose value lives only in the remote store
pub const REMOTE_PLACEHOLDER: &str = "[remote]";

/// Category assigned when a request omits one or leaves it blank
pub const DEFAULT_CATEGORY: &str = "general";

/// Canonical identifier of a secret within an owner's namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Wrap a value that is already canonical (read back from a store)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Type<Sqlite> for CanonicalId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}

impl<'q> Encode<'q, Sqlite> for CanonicalId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, Sqlite> for CanonicalId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<'r, Sqlite>>::decode(value)?;
        Ok(Self(s))
    }
}

/// Map a display name to its canonical id.
pub fn sanitize(display_name: &str) -> CanonicalId {
    let id = display_name
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect();
    CanonicalId(id)
}

/// Render a canonical id as a human-readable display name.
///
/// `"db-pass"` becomes `"Db Pass"`. Not an inverse of [`sanitize`]: empty
/// segments from consecutive hyphens collapse into runs of spaces and the
/// original casing is gone.
pub fn prettify(canonical_id: &CanonicalId) -> String {
    canonical_id
        .as_str()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Identifier of a secret in the remote store: `"{owner}-{canonical_id}"`
pub fn remote_id(owner: &str, canonical_id: &CanonicalId) -> String {
    format!("{}-{}", owner, canonical_id)
}

/// Recover the canonical id from a remote identifier in `owner`'s namespace.
///
/// Returns `None` for identifiers outside the namespace or with nothing after it.
pub fn strip_namespace(owner: &str, remote_id: &str) -> Option<CanonicalId> {
    remote_id
        .strip_prefix(owner)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .map(|rest| CanonicalId(rest.to_string()))
}

/// Where a local record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretOrigin {
    /// Authored through create; never touched by sync
    Local,
    /// Placeholder synthesized from a remote listing
    RemoteSynced,
}

impl SecretOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RemoteSynced => "remote_synced",
        }
    }
}

impl FromStr for SecretOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote_synced" => Ok(Self::RemoteSynced),
            _ => Err(format!("Unknown secret origin: {}", s)),
        }
    }
}

impl fmt::Display for SecretOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Locally persisted metadata for one secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: i64,
    pub owner: String,
    pub display_name: String,
    pub canonical_id: CanonicalId,
    pub value: String,
    pub description: String,
    pub category: String,
    pub origin: SecretOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Whether the value is only held remotely
    pub fn is_placeholder(&self) -> bool {
        self.value == REMOTE_PLACEHOLDER
    }
}

/// Caller input for creating or overwriting a secret
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSecret {
    #[validate(
        length(min = 1, max = 255, message = "Display name must be 1-255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub display_name: String,

    #[validate(length(min = 1, max = 65536, message = "Value must be 1-65536 characters"))]
    pub value: String,

    #[serde(default)]
    #[validate(length(max = 2048, message = "Description must be at most 2048 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "Category must be at most 64 characters"))]
    pub category: Option<String>,
}

impl NewSecret {
    pub fn new(display_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), value: value.into(), description: String::new(), category: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Category with blank or absent values replaced by [`DEFAULT_CATEGORY`]
    pub fn effective_category(&self) -> String {
        normalize_category(self.category.as_deref())
    }
}

pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// Reject names that are empty once whitespace is ignored
pub fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("Display name cannot be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validate a display name used for lookup (fetch, delete)
pub fn validate_display_name(display_name: &str) -> crate::Result<()> {
    if display_name.trim().is_empty() {
        return Err(crate::Error::validation_field("Display name cannot be blank", "display_name"));
    }
    if display_name.chars().count() > 255 {
        return Err(crate::Error::validation_field(
            "Display name must be 1-255 characters",
            "display_name",
        ));
    }
    Ok(())
}
