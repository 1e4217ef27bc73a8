//! Roles, permissions, and the static role/permission table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A role granted to a principal on one tier.
///
/// Roles are totally ordered; the evaluator always keeps the highest active
/// role per principal. Unknown role strings parse to [`Role::Unspecified`],
/// which holds no permissions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    Unspecified,
    Viewer,
    Editor,
    Owner,
}

impl Role {
    /// Parses a role case-insensitively; unknown strings yield
    /// [`Role::Unspecified`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Self::Viewer,
            "editor" => Self::Editor,
            "owner" => Self::Owner,
            _ => Self::Unspecified,
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Owner => "owner",
        }
    }

    /// Returns whether this role holds the given permission.
    #[must_use]
    pub fn has(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Self::Unspecified => false,
            Self::Viewer => matches!(
                permission,
                SecretsRead
                    | SecretsList
                    | ProjectsRead
                    | ProjectsList
                    | OrganizationsRead
                    | OrganizationsList
            ),
            Self::Editor => {
                Self::Viewer.has(permission)
                    || matches!(permission, SecretsWrite | ProjectsWrite | OrganizationsWrite)
            }
            Self::Owner => {
                Self::Editor.has(permission)
                    || matches!(
                        permission,
                        SecretsDelete
                            | SecretsAdmin
                            | ProjectsDelete
                            | ProjectsAdmin
                            | ProjectsCreate
                            | OrganizationsDelete
                            | OrganizationsAdmin
                            | OrganizationsCreate
                    )
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Returns the higher of two roles.
#[must_use]
pub fn best_role(a: Role, b: Role) -> Role {
    a.max(b)
}

/// An operation on one resource family.
///
/// CREATE exists only for projects and organizations; secrets are created
/// under the write permission of their parent tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    SecretsRead,
    SecretsList,
    SecretsWrite,
    SecretsDelete,
    SecretsAdmin,
    ProjectsRead,
    ProjectsList,
    ProjectsWrite,
    ProjectsCreate,
    ProjectsDelete,
    ProjectsAdmin,
    OrganizationsRead,
    OrganizationsList,
    OrganizationsWrite,
    OrganizationsCreate,
    OrganizationsDelete,
    OrganizationsAdmin,
}
