//! Shared handler helpers: logical names, grant plumbing, and wire message
//! assembly.
//!
//! Logical names are label-first: the resolver is only consulted when the
//! label is absent, and a prefix mismatch filters the object (lists) or
//! reads as absent (direct gets). Storage names never reach a wire message.

use std::collections::BTreeMap;

use authz::{
    AnnotationGrant, GrantError, Role, TierGrants, active_grants_map, parse_grants,
    serialize_grants,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use console_core::meta::{
    DESCRIPTION_ANNOTATION, DISPLAY_NAME_ANNOTATION, ORGANIZATION_LABEL, PROJECT_LABEL,
    SHARE_GROUPS_ANNOTATION, SHARE_USERS_ANNOTATION,
};
use console_core::{Resolver, RpcError};
use storage::{SecretObject, TenantObject};
use tracing::debug;

use crate::rpc;

/// The parsed grant arrays of one object.
#[derive(Debug, Clone, Default)]
pub struct SharedGrants {
    pub users: Vec<AnnotationGrant>,
    pub groups: Vec<AnnotationGrant>,
}

impl SharedGrants {
    /// Parses both share annotations; malformed JSON is INTERNAL and carries
    /// the offending key.
    pub fn parse(annotations: &BTreeMap<String, String>) -> Result<Self, RpcError> {
        let users = parse_grants(annotations, SHARE_USERS_ANNOTATION).map_err(internal_grant)?;
        let groups = parse_grants(annotations, SHARE_GROUPS_ANNOTATION).map_err(internal_grant)?;
        Ok(Self { users, groups })
    }

    /// Collapses to the active grant maps at time `t`.
    #[must_use]
    pub fn tier(&self, t: i64) -> TierGrants {
        TierGrants {
            users: active_grants_map(&self.users, t),
            groups: active_grants_map(&self.groups, t),
        }
    }
}

fn internal_grant(err: GrantError) -> RpcError {
    RpcError::internal(err.to_string())
}

/// Rejects an empty request field.
pub fn require_field(value: &str, field: &str) -> Result<(), RpcError> {
    if value.trim().is_empty() {
        return Err(RpcError::invalid_argument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Returns the logical organization name of a stored object, label-first.
#[must_use]
pub fn logical_org_name(resolver: &Resolver, object: &TenantObject) -> Option<String> {
    if let Some(label) = object.label(ORGANIZATION_LABEL) {
        return Some(label.to_string());
    }
    match resolver.org_from_storage(&object.name) {
        Ok(logical) => Some(logical),
        Err(error) => {
            debug!(%error, "Filtering organization object with foreign prefix");
            None
        }
    }
}

/// Returns the logical project name of a stored object, label-first.
#[must_use]
pub fn logical_project_name(resolver: &Resolver, object: &TenantObject) -> Option<String> {
    if let Some(label) = object.label(PROJECT_LABEL) {
        return Some(label.to_string());
    }
    match resolver.project_from_storage(&object.name) {
        Ok(logical) => Some(logical),
        Err(error) => {
            debug!(%error, "Filtering project object with foreign prefix");
            None
        }
    }
}

/// Applies one metadata field update: absent preserves, empty string deletes
/// the annotation, anything else replaces it.
pub fn apply_annotation(
    annotations: &mut BTreeMap<String, String>,
    key: &str,
    value: Option<&str>,
) {
    match value {
        None => {}
        Some("") => {
            annotations.remove(key);
        }
        Some(value) => {
            annotations.insert(key.to_string(), value.to_string());
        }
    }
}

/// Inserts an unconditional owner grant for the creator unless one is
/// already present.
pub fn ensure_owner_grant(grants: &mut Vec<AnnotationGrant>, email: &str) {
    let already_owner = grants.iter().any(|grant| {
        grant.principal.eq_ignore_ascii_case(email)
            && grant.role == Role::Owner
            && grant.nbf.is_none()
            && grant.exp.is_none()
    });
    if !already_owner {
        grants.push(AnnotationGrant::new(email, Role::Owner));
    }
}

/// Writes both grant arrays back into the annotations.
pub fn store_shared_grants(annotations: &mut BTreeMap<String, String>, shared: &SharedGrants) {
    annotations.insert(
        SHARE_USERS_ANNOTATION.to_string(),
        serialize_grants(&shared.users),
    );
    annotations.insert(
        SHARE_GROUPS_ANNOTATION.to_string(),
        serialize_grants(&shared.groups),
    );
}

/// Validates and converts wire grants.
pub fn grants_from_wire(grants: &[rpc::Grant]) -> Result<Vec<AnnotationGrant>, RpcError> {
    grants
        .iter()
        .map(|grant| {
            if grant.principal.trim().is_empty() {
                return Err(RpcError::invalid_argument(
                    "grant principal must not be empty",
                ));
            }
            let role = Role::parse(&grant.role);
            if role == Role::Unspecified {
                return Err(RpcError::invalid_argument(format!(
                    "unknown grant role {:?}",
                    grant.role
                )));
            }
            Ok(AnnotationGrant {
                principal: grant.principal.clone(),
                role,
                nbf: grant.nbf,
                exp: grant.exp,
            })
        })
        .collect()
}

/// Converts stored grants to the wire shape.
#[must_use]
pub fn grants_to_wire(grants: &[AnnotationGrant]) -> Vec<rpc::Grant> {
    grants
        .iter()
        .map(|grant| rpc::Grant {
            principal: grant.principal.clone(),
            role: grant.role.as_str().to_string(),
            nbf: grant.nbf,
            exp: grant.exp,
        })
        .collect()
}

fn annotation_or_default(object: &TenantObject, key: &str) -> String {
    object.annotation(key).unwrap_or_default().to_string()
}

/// Assembles the organization wire message.
#[must_use]
pub fn organization_message(
    name: String,
    object: &TenantObject,
    shared: &SharedGrants,
    user_role: Option<Role>,
) -> rpc::Organization {
    rpc::Organization {
        name,
        display_name: annotation_or_default(object, DISPLAY_NAME_ANNOTATION),
        description: annotation_or_default(object, DESCRIPTION_ANNOTATION),
        user_role: user_role.map(|role| role.as_str().to_string()),
        user_grants: grants_to_wire(&shared.users),
        group_grants: grants_to_wire(&shared.groups),
    }
}

/// Assembles the project wire message.
#[must_use]
pub fn project_message(
    name: String,
    object: &TenantObject,
    shared: &SharedGrants,
    user_role: Option<Role>,
) -> rpc::Project {
    rpc::Project {
        name,
        organization: object.label(ORGANIZATION_LABEL).map(ToString::to_string),
        display_name: annotation_or_default(object, DISPLAY_NAME_ANNOTATION),
        description: annotation_or_default(object, DESCRIPTION_ANNOTATION),
        user_role: user_role.map(|role| role.as_str().to_string()),
        user_grants: grants_to_wire(&shared.users),
        group_grants: grants_to_wire(&shared.groups),
    }
}

/// Assembles the secret wire message; data only when the operation returns
/// it.
#[must_use]
pub fn secret_message(
    project_logical: String,
    secret: &SecretObject,
    shared: &SharedGrants,
    user_role: Option<Role>,
    include_data: bool,
) -> rpc::Secret {
    rpc::Secret {
        name: secret.name.clone(),
        project: project_logical,
        data: include_data.then(|| encode_wire_data(&secret.data)),
        user_role: user_role.map(|role| role.as_str().to_string()),
        user_grants: grants_to_wire(&shared.users),
        group_grants: grants_to_wire(&shared.groups),
    }
}

/// Decodes base64 wire data into raw bytes.
pub fn decode_wire_data(
    data: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Vec<u8>>, RpcError> {
    data.iter()
        .map(|(key, value)| {
            let bytes = BASE64.decode(value.as_bytes()).map_err(|_| {
                RpcError::invalid_argument(format!("data value {key:?} is not valid base64"))
            })?;
            Ok((key.clone(), bytes))
        })
        .collect()
}

/// Encodes raw bytes as base64 wire data.
#[must_use]
pub fn encode_wire_data(data: &BTreeMap<String, Vec<u8>>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| (key.clone(), BASE64.encode(value)))
        .collect()
}
