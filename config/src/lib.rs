//! # Holos Console Configuration
//!
//! The flag surface of the service binary and the settings derived from it:
//! the public origin, the OIDC issuer, the name resolver, and the creator
//! policy gating organization creation.

pub mod options;

// Re-export commonly used types for convenience
pub use options::{ConfigError, Options};
