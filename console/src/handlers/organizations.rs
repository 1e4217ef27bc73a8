//! OrganizationService handlers.

use authz::{Permission, Role, evaluate};
use axum::{Json, extract::State};
use console_core::meta::{
    DESCRIPTION_ANNOTATION, DISPLAY_NAME_ANNOTATION, ORGANIZATION_LABEL,
};
use console_core::{ResourceType, RpcError};
use observability::{AuditEvent, AuditResource};
use storage::TenantObject;

use crate::error::map_store_error;
use crate::extract::Caller;
use crate::rpc::{
    CreateOrganizationRequest, CreateOrganizationResponse, DeleteOrganizationRequest,
    DeleteOrganizationResponse, GetOrganizationRawRequest, GetOrganizationRawResponse,
    GetOrganizationRequest, GetOrganizationResponse, ListOrganizationsResponse,
    UpdateOrganizationRequest, UpdateOrganizationResponse, UpdateOrganizationSharingRequest,
    UpdateOrganizationSharingResponse,
};
use crate::state::AppState;
use crate::tenant::{
    SharedGrants, apply_annotation, ensure_owner_grant, grants_from_wire, logical_org_name,
    organization_message, require_field, store_shared_grants,
};

async fn load_org(
    state: &AppState,
    name: &str,
) -> Result<(TenantObject, SharedGrants), RpcError> {
    require_field(name, "name")?;
    let storage = state.resolver.org_storage_name(name);
    let object = state
        .store
        .get_tenant_object(ResourceType::Organization, &storage)
        .await
        .map_err(|e| map_store_error(e, "organization", name))?;
    let shared = SharedGrants::parse(&object.annotations)?;
    Ok((object, shared))
}

/// ListOrganizations - every organization the caller holds LIST on.
/// Terminating objects and foreign-prefix names are omitted.
pub async fn list_organizations(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ListOrganizationsResponse>, RpcError> {
    let objects = state
        .store
        .list_tenant_objects(ResourceType::Organization)
        .await
        .map_err(|e| map_store_error(e, "organization", ""))?;

    let now = state.clock.now_unix();
    let mut organizations = Vec::new();
    for object in objects {
        let Some(logical) = logical_org_name(&state.resolver, &object) else {
            continue;
        };
        let shared = SharedGrants::parse(&object.annotations)?;
        let decision = evaluate(
            &[shared.tier(now)],
            &caller.email,
            &caller.roles,
            Permission::OrganizationsList,
        );
        if !decision.allowed {
            continue;
        }
        organizations.push(organization_message(logical, &object, &shared, None));
    }
    organizations.sort_by(|a, b| a.name.cmp(&b.name));

    AuditEvent::new("organization_list", AuditResource::Organization, "", &caller)
        .with_total(organizations.len())
        .success();
    Ok(Json(ListOrganizationsResponse { organizations }))
}

/// GetOrganization - read access; the response carries the caller's best
/// role for display.
pub async fn get_organization(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<GetOrganizationRequest>,
) -> Result<Json<GetOrganizationResponse>, RpcError> {
    let (object, shared) = load_org(&state, &req.name).await?;
    let logical = logical_org_name(&state.resolver, &object)
        .ok_or_else(|| RpcError::not_found(format!("organization {:?} not found", req.name)))?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[shared.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::OrganizationsRead,
    );
    let audit = AuditEvent::new(
        "organization_get",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not read the organization",
        ));
    }
    audit.success();

    Ok(Json(GetOrganizationResponse {
        organization: organization_message(logical, &object, &shared, Some(decision.role)),
    }))
}

/// CreateOrganization - gated by the creator allow-list only, never by
/// existing ownership. The creator lands in share-users as owner.
pub async fn create_organization(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Json<CreateOrganizationResponse>, RpcError> {
    require_field(&req.name, "name")?;

    let audit = AuditEvent::new(
        "organization_create",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !state.creator_policy.allows(&caller.email, &caller.roles) {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not create organizations",
        ));
    }

    let storage = state.resolver.org_storage_name(&req.name);
    let mut object = TenantObject::new(storage, ResourceType::Organization);
    object
        .labels
        .insert(ORGANIZATION_LABEL.to_string(), req.name.clone());
    apply_annotation(
        &mut object.annotations,
        DISPLAY_NAME_ANNOTATION,
        req.display_name.as_deref(),
    );
    apply_annotation(
        &mut object.annotations,
        DESCRIPTION_ANNOTATION,
        req.description.as_deref(),
    );

    let mut shared = SharedGrants::default();
    ensure_owner_grant(&mut shared.users, &caller.email);
    store_shared_grants(&mut object.annotations, &shared);

    let created = state
        .store
        .create_tenant_object(object)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;

    audit.success();
    Ok(Json(CreateOrganizationResponse {
        organization: organization_message(req.name.clone(), &created, &shared, Some(Role::Owner)),
    }))
}

/// UpdateOrganization - WRITE access. Absent fields preserve stored values,
/// empty strings delete the annotation.
pub async fn update_organization(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<UpdateOrganizationResponse>, RpcError> {
    let (mut object, shared) = load_org(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[shared.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::OrganizationsWrite,
    );
    let audit = AuditEvent::new(
        "organization_update",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not update the organization",
        ));
    }

    apply_annotation(
        &mut object.annotations,
        DISPLAY_NAME_ANNOTATION,
        req.display_name.as_deref(),
    );
    apply_annotation(
        &mut object.annotations,
        DESCRIPTION_ANNOTATION,
        req.description.as_deref(),
    );
    let updated = state
        .store
        .update_tenant_object(object)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;

    audit.success();
    Ok(Json(UpdateOrganizationResponse {
        organization: organization_message(req.name.clone(), &updated, &shared, Some(decision.role)),
    }))
}

/// DeleteOrganization - DELETE access; refused while projects still link to
/// the organization.
pub async fn delete_organization(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<DeleteOrganizationRequest>,
) -> Result<Json<DeleteOrganizationResponse>, RpcError> {
    let (object, shared) = load_org(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[shared.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::OrganizationsDelete,
    );
    let audit = AuditEvent::new(
        "organization_delete",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not delete the organization",
        ));
    }

    let projects = state
        .store
        .list_projects_by_org(&req.name)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;
    if !projects.is_empty() {
        return Err(RpcError::failed_precondition(format!(
            "organization {:?} has {} linked projects",
            req.name,
            projects.len()
        )));
    }

    state
        .store
        .delete_tenant_object(ResourceType::Organization, &object.name)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;

    audit.success();
    Ok(Json(DeleteOrganizationResponse {}))
}

/// UpdateOrganizationSharing - ADMIN access; replaces both grant arrays
/// atomically and reports the freshly recomputed user role.
pub async fn update_organization_sharing(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateOrganizationSharingRequest>,
) -> Result<Json<UpdateOrganizationSharingResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let replacement = SharedGrants {
        users: grants_from_wire(&req.user_grants)?,
        groups: grants_from_wire(&req.group_grants)?,
    };

    let (mut object, existing) = load_org(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[existing.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::OrganizationsAdmin,
    );
    let audit = AuditEvent::new(
        "organization_update_sharing",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not administer the organization",
        ));
    }

    store_shared_grants(&mut object.annotations, &replacement);
    let updated = state
        .store
        .update_tenant_object(object)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;

    let user_role = replacement.tier(now).role_for(&caller.email, &caller.roles);
    audit.success();
    Ok(Json(UpdateOrganizationSharingResponse {
        organization: organization_message(
            req.name.clone(),
            &updated,
            &replacement,
            Some(user_role),
        ),
    }))
}

/// GetOrganizationRaw - read access, then the exact stored JSON the
/// authorization decision was made from.
pub async fn get_organization_raw(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<GetOrganizationRawRequest>,
) -> Result<Json<GetOrganizationRawResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let storage = state.resolver.org_storage_name(&req.name);
    let (object, raw) = state
        .store
        .get_tenant_object_raw(ResourceType::Organization, &storage)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.name))?;
    let shared = SharedGrants::parse(&object.annotations)?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[shared.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::OrganizationsRead,
    );
    let audit = AuditEvent::new(
        "organization_get_raw",
        AuditResource::Organization,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not read the organization",
        ));
    }

    audit.success();
    Ok(Json(GetOrganizationRawResponse { raw }))
}
