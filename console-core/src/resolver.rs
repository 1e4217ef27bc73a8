//! Logical to storage name mapping.
//!
//! The prefix scheme is internal: no API response ever carries a storage
//! name. Handlers prefer the organization/project label and fall back to
//! parsing the storage name; a prefix mismatch means the object belongs to a
//! different deployment sharing the backing store and must never surface.

use thiserror::Error;

/// Errors from storage-name parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// The storage name does not carry this deployment's prefix.
    #[error("storage name {storage:?} does not start with expected prefix {expected_prefix:?}")]
    PrefixMismatch {
        storage: String,
        expected_prefix: String,
    },
}

/// Maps logical names (`acme`) to storage names (`holos-o-acme`) and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    namespace_prefix: String,
    organization_prefix: String,
    project_prefix: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            namespace_prefix: "holos-".to_string(),
            organization_prefix: "o-".to_string(),
            project_prefix: "p-".to_string(),
        }
    }
}

impl Resolver {
    /// Creates a resolver with the given prefixes. Either prefix may be
    /// empty.
    #[must_use]
    pub fn new(
        namespace_prefix: impl Into<String>,
        organization_prefix: impl Into<String>,
        project_prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
            organization_prefix: organization_prefix.into(),
            project_prefix: project_prefix.into(),
        }
    }

    fn org_prefix(&self) -> String {
        format!("{}{}", self.namespace_prefix, self.organization_prefix)
    }

    fn project_prefix(&self) -> String {
        format!("{}{}", self.namespace_prefix, self.project_prefix)
    }

    /// Returns the storage name of an organization.
    #[must_use]
    pub fn org_storage_name(&self, logical: &str) -> String {
        format!("{}{logical}", self.org_prefix())
    }

    /// Returns the storage name of a project.
    #[must_use]
    pub fn project_storage_name(&self, logical: &str) -> String {
        format!("{}{logical}", self.project_prefix())
    }

    /// Recovers the logical organization name from a storage name.
    pub fn org_from_storage(&self, storage: &str) -> Result<String, ResolverError> {
        strip(storage, &self.org_prefix())
    }

    /// Recovers the logical project name from a storage name.
    pub fn project_from_storage(&self, storage: &str) -> Result<String, ResolverError> {
        strip(storage, &self.project_prefix())
    }
}

fn strip(storage: &str, expected_prefix: &str) -> Result<String, ResolverError> {
    storage
        .strip_prefix(expected_prefix)
        .map(ToString::to_string)
        .ok_or_else(|| ResolverError::PrefixMismatch {
            storage: storage.to_string(),
            expected_prefix: expected_prefix.to_string(),
        })
}
