//! The multi-tier access evaluator.
//!
//! Each tier (secret, project, organization) carries its own active grant
//! maps. Access is granted when any tier yields a role holding the required
//! permission; the display role is the max across all tiers. Organization
//! grants reach a secret only through the project's organization label, so
//! there is no implicit containment.

use std::collections::{BTreeMap, HashMap};

use console_core::meta::{SHARE_GROUPS_ANNOTATION, SHARE_USERS_ANNOTATION};

use crate::grant::{GrantError, active_grants_map, parse_grants};
use crate::role::{Permission, Role};

/// The active grants of one tier, keyed by lower-cased principal.
#[derive(Debug, Clone, Default)]
pub struct TierGrants {
    /// Email principal to role.
    pub users: HashMap<String, Role>,
    /// Role-claim principal to role.
    pub groups: HashMap<String, Role>,
}

impl TierGrants {
    /// Builds the tier from an object's annotations at time `t`.
    pub fn from_annotations(
        annotations: &BTreeMap<String, String>,
        t: i64,
    ) -> Result<Self, GrantError> {
        let users = parse_grants(annotations, SHARE_USERS_ANNOTATION)?;
        let groups = parse_grants(annotations, SHARE_GROUPS_ANNOTATION)?;
        Ok(Self {
            users: active_grants_map(&users, t),
            groups: active_grants_map(&groups, t),
        })
    }

    /// Returns the effective role of the caller on this tier: the max of the
    /// caller's user grant and any of their group grants.
    #[must_use]
    pub fn role_for(&self, email: &str, roles: &[String]) -> Role {
        let user_role = self
            .users
            .get(&email.to_lowercase())
            .copied()
            .unwrap_or_default();
        let group_role = roles
            .iter()
            .filter_map(|r| self.groups.get(&r.to_lowercase()).copied())
            .max()
            .unwrap_or_default();
        user_role.max(group_role)
    }
}

/// An authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether some tier granted the required permission.
    pub allowed: bool,
    /// The max role across all tiers, for UI hinting only.
    pub role: Role,
}

/// Evaluates `permission` for the caller against the given tiers.
///
/// Tiers are consulted independently; a higher-tier grant never shadows a
/// lower one. Grant maps already collapse duplicates to the max role, so the
/// result is order-independent.
#[must_use]
pub fn evaluate(
    tiers: &[TierGrants],
    email: &str,
    roles: &[String],
    permission: Permission,
) -> Decision {
    let mut allowed = false;
    let mut best = Role::Unspecified;
    for tier in tiers {
        let role = tier.role_for(email, roles);
        best = best.max(role);
        if role.has(permission) {
            allowed = true;
        }
    }
    Decision {
        allowed,
        role: best,
    }
}
