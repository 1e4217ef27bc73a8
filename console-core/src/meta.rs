//! Label and annotation keys of managed tenant objects.
//!
//! Every object the console manages carries the managed-by label; objects
//! missing it are invisible to the service. The resource-type label
//! distinguishes organizations from projects sharing the same backing store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label carrying the manager of an object.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`] for objects owned by this service.
pub const MANAGED_BY_VALUE: &str = "console.holos.run";

/// Label distinguishing organization objects from project objects.
pub const RESOURCE_TYPE_LABEL: &str = "console.holos.run/resource-type";
/// Label carrying the logical organization name.
pub const ORGANIZATION_LABEL: &str = "console.holos.run/organization";
/// Label carrying the logical project name.
pub const PROJECT_LABEL: &str = "console.holos.run/project";

/// Annotation carrying the display name.
pub const DISPLAY_NAME_ANNOTATION: &str = "console.holos.run/display-name";
/// Annotation carrying the description.
pub const DESCRIPTION_ANNOTATION: &str = "console.holos.run/description";
/// Annotation carrying the JSON array of user grants (principals are emails).
pub const SHARE_USERS_ANNOTATION: &str = "console.holos.run/share-users";
/// Annotation carrying the JSON array of group grants (principals are roles).
pub const SHARE_GROUPS_ANNOTATION: &str = "console.holos.run/share-groups";

/// The kind of tenant object, as stored in the resource-type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Organization,
    Project,
}

impl ResourceType {
    /// Returns the label value for this resource type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(Self::Organization),
            "project" => Ok(Self::Project),
            _ => Err("unknown resource type"),
        }
    }
}
