//! Claims extracted from a validated OIDC ID token.

use serde::{Deserialize, Serialize};

/// Identity claims attached to a request after token verification.
///
/// The record exists only for the duration of one request. `roles` is
/// populated from a configurable wire claim (default `groups`); the internal
/// field name is always `roles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject identifier from the token.
    pub sub: String,
    /// Email address; the principal used for user grants.
    #[serde(default)]
    pub email: String,
    /// Whether the issuer verified the email address.
    #[serde(default)]
    pub email_verified: bool,
    /// Human-readable display name.
    #[serde(default)]
    pub name: String,
    /// Membership values used for group grants.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Creates claims for the given subject and email.
    #[must_use]
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Adds membership roles.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}
