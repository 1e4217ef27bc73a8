//! ProjectService handlers.
//!
//! Projects mirror the organization handlers, with one addition: when a
//! project carries the organization label, the organization's active grants
//! cascade into every project-tier decision.

use std::collections::HashMap;

use authz::{Permission, Role, TierGrants, evaluate};
use axum::{Json, extract::State};
use console_core::meta::{
    DESCRIPTION_ANNOTATION, DISPLAY_NAME_ANNOTATION, ORGANIZATION_LABEL, PROJECT_LABEL,
};
use console_core::{ResourceType, RpcError};
use observability::{AuditEvent, AuditResource};
use storage::TenantObject;

use crate::error::map_store_error;
use crate::extract::Caller;
use crate::rpc::{
    CreateProjectRequest, CreateProjectResponse, DeleteProjectRequest, DeleteProjectResponse,
    GetProjectRawRequest, GetProjectRawResponse, GetProjectRequest, GetProjectResponse,
    ListProjectsResponse, UpdateProjectRequest, UpdateProjectResponse,
    UpdateProjectSharingRequest, UpdateProjectSharingResponse,
};
use crate::state::AppState;
use crate::tenant::{
    SharedGrants, apply_annotation, ensure_owner_grant, grants_from_wire, logical_project_name,
    project_message, require_field, store_shared_grants,
};

async fn load_project(
    state: &AppState,
    name: &str,
) -> Result<(TenantObject, SharedGrants), RpcError> {
    require_field(name, "name")?;
    let storage = state.resolver.project_storage_name(name);
    let object = state
        .store
        .get_tenant_object(ResourceType::Project, &storage)
        .await
        .map_err(|e| map_store_error(e, "project", name))?;
    let shared = SharedGrants::parse(&object.annotations)?;
    Ok((object, shared))
}

/// Loads the active org-tier grants for a logical org name. A missing
/// organization simply yields no cascade.
async fn org_tier(
    state: &AppState,
    org_logical: &str,
    now: i64,
) -> Result<Option<TierGrants>, RpcError> {
    let storage = state.resolver.org_storage_name(org_logical);
    match state
        .store
        .get_tenant_object(ResourceType::Organization, &storage)
        .await
    {
        Ok(org) => Ok(Some(SharedGrants::parse(&org.annotations)?.tier(now))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(map_store_error(err, "organization", org_logical)),
    }
}

/// The tiers consulted for a project: its own grants, plus the associated
/// organization's when the label is present.
pub(crate) async fn project_tiers(
    state: &AppState,
    object: &TenantObject,
    shared: &SharedGrants,
    now: i64,
) -> Result<Vec<TierGrants>, RpcError> {
    let mut tiers = vec![shared.tier(now)];
    if let Some(org_logical) = object.label(ORGANIZATION_LABEL) {
        if let Some(tier) = org_tier(state, org_logical, now).await? {
            tiers.push(tier);
        }
    }
    Ok(tiers)
}

/// ListProjects - every project the caller holds LIST on, directly or via
/// its organization.
pub async fn list_projects(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<ListProjectsResponse>, RpcError> {
    let objects = state
        .store
        .list_tenant_objects(ResourceType::Project)
        .await
        .map_err(|e| map_store_error(e, "project", ""))?;

    let now = state.clock.now_unix();
    let mut org_tiers: HashMap<String, Option<TierGrants>> = HashMap::new();
    let mut projects = Vec::new();
    for object in objects {
        let Some(logical) = logical_project_name(&state.resolver, &object) else {
            continue;
        };
        let shared = SharedGrants::parse(&object.annotations)?;
        let mut tiers = vec![shared.tier(now)];
        if let Some(org_logical) = object.label(ORGANIZATION_LABEL) {
            if !org_tiers.contains_key(org_logical) {
                let tier = org_tier(&state, org_logical, now).await?;
                org_tiers.insert(org_logical.to_string(), tier);
            }
            if let Some(Some(tier)) = org_tiers.get(org_logical) {
                tiers.push(tier.clone());
            }
        }
        let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsList);
        if !decision.allowed {
            continue;
        }
        projects.push(project_message(logical, &object, &shared, None));
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    AuditEvent::new("project_list", AuditResource::Project, "", &caller)
        .with_total(projects.len())
        .success();
    Ok(Json(ListProjectsResponse { projects }))
}

/// GetProject - read access across the project and org tiers.
pub async fn get_project(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<GetProjectRequest>,
) -> Result<Json<GetProjectResponse>, RpcError> {
    let (object, shared) = load_project(&state, &req.name).await?;
    let logical = logical_project_name(&state.resolver, &object)
        .ok_or_else(|| RpcError::not_found(format!("project {:?} not found", req.name)))?;

    let now = state.clock.now_unix();
    let tiers = project_tiers(&state, &object, &shared, now).await?;
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsRead);
    let audit = AuditEvent::new("project_get", AuditResource::Project, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied("caller may not read the project"));
    }
    audit.success();

    Ok(Json(GetProjectResponse {
        project: project_message(logical, &object, &shared, Some(decision.role)),
    }))
}

/// CreateProject - requires CREATE on the parent organization; the creator
/// lands in the project's share-users as owner.
pub async fn create_project(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<CreateProjectResponse>, RpcError> {
    require_field(&req.name, "name")?;
    require_field(&req.organization, "organization")?;

    let org_storage = state.resolver.org_storage_name(&req.organization);
    let org = state
        .store
        .get_tenant_object(ResourceType::Organization, &org_storage)
        .await
        .map_err(|e| map_store_error(e, "organization", &req.organization))?;
    let org_shared = SharedGrants::parse(&org.annotations)?;

    let now = state.clock.now_unix();
    let decision = evaluate(
        &[org_shared.tier(now)],
        &caller.email,
        &caller.roles,
        Permission::ProjectsCreate,
    );
    let audit = AuditEvent::new("project_create", AuditResource::Project, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not create projects in the organization",
        ));
    }

    let storage = state.resolver.project_storage_name(&req.name);
    let mut object = TenantObject::new(storage, ResourceType::Project);
    object
        .labels
        .insert(PROJECT_LABEL.to_string(), req.name.clone());
    object
        .labels
        .insert(ORGANIZATION_LABEL.to_string(), req.organization.clone());
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
        .map_err(|e| map_store_error(e, "project", &req.name))?;

    audit.success();
    Ok(Json(CreateProjectResponse {
        project: project_message(req.name.clone(), &created, &shared, Some(Role::Owner)),
    }))
}

/// UpdateProject - WRITE access across tiers; same field semantics as
/// organizations.
pub async fn update_project(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<UpdateProjectResponse>, RpcError> {
    let (mut object, shared) = load_project(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let tiers = project_tiers(&state, &object, &shared, now).await?;
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsWrite);
    let audit = AuditEvent::new("project_update", AuditResource::Project, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not update the project",
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
        .map_err(|e| map_store_error(e, "project", &req.name))?;

    audit.success();
    Ok(Json(UpdateProjectResponse {
        project: project_message(req.name.clone(), &updated, &shared, Some(decision.role)),
    }))
}

/// DeleteProject - DELETE access across tiers.
pub async fn delete_project(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<DeleteProjectRequest>,
) -> Result<Json<DeleteProjectResponse>, RpcError> {
    let (object, shared) = load_project(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let tiers = project_tiers(&state, &object, &shared, now).await?;
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsDelete);
    let audit = AuditEvent::new("project_delete", AuditResource::Project, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not delete the project",
        ));
    }

    state
        .store
        .delete_tenant_object(ResourceType::Project, &object.name)
        .await
        .map_err(|e| map_store_error(e, "project", &req.name))?;

    audit.success();
    Ok(Json(DeleteProjectResponse {}))
}

/// UpdateProjectSharing - ADMIN access across tiers; replaces both grant
/// arrays atomically.
pub async fn update_project_sharing(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateProjectSharingRequest>,
) -> Result<Json<UpdateProjectSharingResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let replacement = SharedGrants {
        users: grants_from_wire(&req.user_grants)?,
        groups: grants_from_wire(&req.group_grants)?,
    };

    let (mut object, existing) = load_project(&state, &req.name).await?;

    let now = state.clock.now_unix();
    let tiers = project_tiers(&state, &object, &existing, now).await?;
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsAdmin);
    let audit = AuditEvent::new(
        "project_update_sharing",
        AuditResource::Project,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not administer the project",
        ));
    }

    store_shared_grants(&mut object.annotations, &replacement);
    let updated = state
        .store
        .update_tenant_object(object)
        .await
        .map_err(|e| map_store_error(e, "project", &req.name))?;

    let mut new_tiers = vec![replacement.tier(now)];
    if let Some(org_logical) = updated.label(ORGANIZATION_LABEL) {
        if let Some(tier) = org_tier(&state, org_logical, now).await? {
            new_tiers.push(tier);
        }
    }
    let user_role = evaluate(
        &new_tiers,
        &caller.email,
        &caller.roles,
        Permission::ProjectsRead,
    )
    .role;

    audit.success();
    Ok(Json(UpdateProjectSharingResponse {
        project: project_message(req.name.clone(), &updated, &replacement, Some(user_role)),
    }))
}

/// GetProjectRaw - read access, then the exact stored JSON the decision was
/// made from.
pub async fn get_project_raw(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<GetProjectRawRequest>,
) -> Result<Json<GetProjectRawResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let storage = state.resolver.project_storage_name(&req.name);
    let (object, raw) = state
        .store
        .get_tenant_object_raw(ResourceType::Project, &storage)
        .await
        .map_err(|e| map_store_error(e, "project", &req.name))?;
    let shared = SharedGrants::parse(&object.annotations)?;

    let now = state.clock.now_unix();
    let tiers = project_tiers(&state, &object, &shared, now).await?;
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::ProjectsRead);
    let audit = AuditEvent::new(
        "project_get_raw",
        AuditResource::Project,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied("caller may not read the project"));
    }

    audit.success();
    Ok(Json(GetProjectRawResponse { raw }))
}
