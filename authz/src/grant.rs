//! Grant annotations: parsing, serialization, and time-window activation.
//!
//! Grants are stored as JSON arrays in the share-users and share-groups
//! annotations. A missing annotation parses to an empty list; malformed JSON
//! is a typed error carrying the annotation key and is never silently
//! ignored.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Errors from grant annotation handling.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The annotation value is not a valid JSON array of grants.
    #[error("invalid grant annotation {key:?}: {source}")]
    InvalidAnnotation {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single access grant stored in an annotation.
///
/// `principal` is an email address for user grants and a role-claim value
/// for group grants. The optional window bounds are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationGrant {
    pub principal: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl AnnotationGrant {
    /// Creates a grant without a time window.
    #[must_use]
    pub fn new(principal: impl Into<String>, role: Role) -> Self {
        Self {
            principal: principal.into(),
            role,
            nbf: None,
            exp: None,
        }
    }

    /// Returns whether the grant is active at time `t` (Unix seconds).
    ///
    /// Active means `nbf <= t` when `nbf` is set and `t < exp` when `exp`
    /// is set.
    #[must_use]
    pub fn is_active(&self, t: i64) -> bool {
        self.nbf.is_none_or(|nbf| nbf <= t) && self.exp.is_none_or(|exp| t < exp)
    }
}

/// Parses the grant array stored under `key`, treating a missing annotation
/// as an empty list.
pub fn parse_grants(
    annotations: &BTreeMap<String, String>,
    key: &str,
) -> Result<Vec<AnnotationGrant>, GrantError> {
    let Some(raw) = annotations.get(key) else {
        return Ok(Vec::new());
    };
    serde_json::from_str(raw).map_err(|source| GrantError::InvalidAnnotation {
        key: key.to_string(),
        source,
    })
}

/// Serializes grants as a JSON array. Always an array, never a bare object.
#[must_use]
pub fn serialize_grants(grants: &[AnnotationGrant]) -> String {
    serde_json::to_string(grants).unwrap_or_else(|_| "[]".to_string())
}

/// Collapses grants to the highest active role per lower-cased principal at
/// time `t`.
#[must_use]
pub fn active_grants_map(grants: &[AnnotationGrant], t: i64) -> HashMap<String, Role> {
    let mut map: HashMap<String, Role> = HashMap::new();
    for grant in grants {
        if !grant.is_active(t) {
            continue;
        }
        let principal = grant.principal.to_lowercase();
        let entry = map.entry(principal).or_insert(Role::Unspecified);
        *entry = (*entry).max(grant.role);
    }
    map
}
