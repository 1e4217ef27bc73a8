//! # Holos Console Authentication
//!
//! Bearer-token authentication: a lazily-initialized OIDC token verifier and
//! the axum middleware that attaches validated [`Claims`] to each request.
//!
//! The verifier discovers the issuer's JWKS on first use and caches it only
//! on success; a failed discovery is retried on the next request and maps to
//! `UNAVAILABLE`, distinct from the `UNAUTHENTICATED` of a bad token.
//!
//! [`Claims`]: console_core::Claims

pub mod middleware;
pub mod verifier;

// Re-export commonly used types for convenience
pub use middleware::{optional_auth, require_auth};
pub use verifier::{AuthError, InitError, TokenError, Verifier, VerifierConfig};
