//! # Error Handling
//!
//! Error handling for SafeVault. Local store faults and input validation are
//! the only failures a caller can observe; everything that goes wrong with the
//! remote secret store is recovered before it reaches this layer.

pub mod types;

pub use types::{Result, SafeVaultError};

/// Short alias used throughout the crate
pub type Error = SafeVaultError;
