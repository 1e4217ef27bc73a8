//! Tenant and secret object records.

use std::collections::BTreeMap;

use console_core::meta::{
    MANAGED_BY_LABEL, MANAGED_BY_VALUE, RESOURCE_TYPE_LABEL,
};
use console_core::ResourceType;
use serde::{Deserialize, Serialize};

/// A namespace-like store record representing an organization or a project.
///
/// `name` is the prefixed storage name and is internal to the service; the
/// caller-facing logical name lives in the organization/project label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantObject {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Set once the backing store has begun deleting the object; such
    /// objects are treated as absent.
    #[serde(default)]
    pub deletion_pending: bool,
    /// Optimistic-concurrency token from the last read.
    #[serde(default)]
    pub resource_version: Option<String>,
}

impl TenantObject {
    /// Creates an empty managed object of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, resource_type: ResourceType) -> Self {
        let labels = BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
            (
                RESOURCE_TYPE_LABEL.to_string(),
                resource_type.as_str().to_string(),
            ),
        ]);
        Self {
            name: name.into(),
            labels,
            annotations: BTreeMap::new(),
            deletion_pending: false,
            resource_version: None,
        }
    }

    /// Returns whether the object carries the console's managed-by label.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.labels.get(MANAGED_BY_LABEL).map(String::as_str) == Some(MANAGED_BY_VALUE)
    }

    /// Returns the resource type from the label, if present and known.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.labels
            .get(RESOURCE_TYPE_LABEL)
            .and_then(|v| v.parse().ok())
    }

    /// Returns a label value.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// A secret-like store record scoped to a project.
///
/// `parent_project` is the project's storage name (the namespace the secret
/// lives in). Values are raw bytes; the cluster API carries them
/// base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretObject {
    pub name: String,
    pub parent_project: String,
    #[serde(default)]
    pub data: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub deletion_pending: bool,
    #[serde(default)]
    pub resource_version: Option<String>,
}

impl SecretObject {
    /// Creates an empty managed secret in the given project namespace.
    #[must_use]
    pub fn new(name: impl Into<String>, parent_project: impl Into<String>) -> Self {
        let labels = BTreeMap::from([(
            MANAGED_BY_LABEL.to_string(),
            MANAGED_BY_VALUE.to_string(),
        )]);
        Self {
            name: name.into(),
            parent_project: parent_project.into(),
            data: BTreeMap::new(),
            labels,
            annotations: BTreeMap::new(),
            deletion_pending: false,
            resource_version: None,
        }
    }

    /// Returns whether the secret carries the console's managed-by label.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.labels.get(MANAGED_BY_LABEL).map(String::as_str) == Some(MANAGED_BY_VALUE)
    }

    /// Returns an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}
