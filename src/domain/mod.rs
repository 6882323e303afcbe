//! Domain layer
//!
//! Pure domain entities with no infrastructure dependencies beyond the
//! SQLite column codec for [`CanonicalId`].
//!
//! ## Module Organization
//!
//! - `secret`: secret records and the display name / canonical id mapping
//! - `security_event`: audit events and per-kind alert policies
//! - `principal`: directory entries used to resolve alert recipients

pub mod principal;
pub mod secret;
pub mod security_event;

pub use principal::{NewPrincipal, Principal};
pub use secret::{
    normalize_category, prettify, remote_id, sanitize, strip_namespace, CanonicalId, NewSecret,
    validate_display_name, SecretOrigin, SecretRecord, DEFAULT_CATEGORY, REMOTE_PLACEHOLDER,
};
pub use security_event::{
    AlertPolicy, AlertPolicyTable, ClientContext, LoginFailureReason, SecurityEvent,
    SecurityEventType, StoredSecurityEvent,
};
