//! Shared test fixtures for the Holos Console workspace.
//!
//! Provides a static RSA signing key with its public JWK, ID-token minting,
//! and a wiremock fixture that serves the OIDC discovery document and JWKS
//! for an issuer. Test-only: the key pair is public by construction.

mod fixtures;

pub use fixtures::*;
