//! Structured audit event emission.
//!
//! Every handler emits exactly one event on the successful path and exactly
//! one `*_denied` event on the permission-denied path, under the `audit`
//! tracing target with stable attribute keys: `action`, `resource_type`,
//! `resource`, `sub`, `email`, and `total` for list operations. Secret data
//! never appears in audit attributes.

use std::fmt;

use console_core::Claims;
use tracing::{info, warn};

/// Resource family an audit event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResource {
    Organization,
    Project,
    Secret,
}

impl AuditResource {
    /// Returns the stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Project => "project",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for AuditResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit event under construction.
#[derive(Debug, Clone)]
pub struct AuditEvent<'a> {
    action: &'static str,
    resource_type: AuditResource,
    resource: &'a str,
    claims: &'a Claims,
    total: Option<usize>,
}

impl<'a> AuditEvent<'a> {
    /// Starts an event for the given action and resource.
    #[must_use]
    pub fn new(
        action: &'static str,
        resource_type: AuditResource,
        resource: &'a str,
        claims: &'a Claims,
    ) -> Self {
        Self {
            action,
            resource_type,
            resource,
            claims,
            total: None,
        }
    }

    /// Attaches the result count of a list operation.
    #[must_use]
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// Emits the success event at INFO.
    pub fn success(self) {
        match self.total {
            Some(total) => info!(
                target: "audit",
                action = self.action,
                resource_type = %self.resource_type,
                resource = self.resource,
                sub = %self.claims.sub,
                email = %self.claims.email,
                total,
                "audit",
            ),
            None => info!(
                target: "audit",
                action = self.action,
                resource_type = %self.resource_type,
                resource = self.resource,
                sub = %self.claims.sub,
                email = %self.claims.email,
                "audit",
            ),
        }
    }

    /// Emits the permission-denied event at WARN, with `_denied` appended to
    /// the action.
    pub fn denied(self) {
        let action = format!("{}_denied", self.action);
        warn!(
            target: "audit",
            action = %action,
            resource_type = %self.resource_type,
            resource = self.resource,
            sub = %self.claims.sub,
            email = %self.claims.email,
            "audit",
        );
    }
}
