//! SecretsService handlers.
//!
//! Secret access consults up to three tiers: the secret's own grants, the
//! parent project's, and - only when the project carries the organization
//! label - the organization's. There is no implicit containment.

use authz::{Permission, Role, TierGrants, evaluate};
use axum::{Json, extract::State};
use console_core::{ResourceType, RpcError};
use observability::{AuditEvent, AuditResource};
use storage::{SecretObject, TenantObject};

use crate::error::map_store_error;
use crate::extract::Caller;
use crate::handlers::projects::project_tiers;
use crate::rpc::{
    CreateSecretRequest, CreateSecretResponse, DeleteSecretRequest, DeleteSecretResponse,
    GetSecretRequest, GetSecretResponse, ListSecretsRequest, ListSecretsResponse,
    UpdateSecretRequest, UpdateSecretResponse, UpdateSecretSharingRequest,
    UpdateSecretSharingResponse,
};
use crate::state::AppState;
use crate::tenant::{
    SharedGrants, decode_wire_data, ensure_owner_grant, grants_from_wire, require_field,
    secret_message, store_shared_grants,
};

/// The parent-project context of a secrets RPC: the project object and the
/// tiers above the secret (project, then org when linked).
struct ProjectContext {
    object: TenantObject,
    parent_tiers: Vec<TierGrants>,
}

async fn load_project_context(
    state: &AppState,
    project_logical: &str,
    now: i64,
) -> Result<ProjectContext, RpcError> {
    require_field(project_logical, "project")?;
    let storage = state.resolver.project_storage_name(project_logical);
    let object = state
        .store
        .get_tenant_object(ResourceType::Project, &storage)
        .await
        .map_err(|e| map_store_error(e, "project", project_logical))?;
    let shared = SharedGrants::parse(&object.annotations)?;
    let parent_tiers = project_tiers(state, &object, &shared, now).await?;
    Ok(ProjectContext {
        object,
        parent_tiers,
    })
}

fn secret_tiers(shared: &SharedGrants, context: &ProjectContext, now: i64) -> Vec<TierGrants> {
    let mut tiers = vec![shared.tier(now)];
    tiers.extend(context.parent_tiers.iter().cloned());
    tiers
}

async fn load_secret(
    state: &AppState,
    context: &ProjectContext,
    name: &str,
) -> Result<(SecretObject, SharedGrants), RpcError> {
    require_field(name, "name")?;
    let secret = state
        .store
        .get_secret(&context.object.name, name)
        .await
        .map_err(|e| map_store_error(e, "secret", name))?;
    let shared = SharedGrants::parse(&secret.annotations)?;
    Ok((secret, shared))
}

/// ListSecrets - every secret in the project the caller holds LIST on.
/// Data never appears in list responses.
pub async fn list_secrets(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<ListSecretsRequest>,
) -> Result<Json<ListSecretsResponse>, RpcError> {
    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;

    let stored = state
        .store
        .list_secrets(&context.object.name)
        .await
        .map_err(|e| map_store_error(e, "project", &req.project))?;

    let mut secrets = Vec::new();
    for secret in stored {
        let shared = SharedGrants::parse(&secret.annotations)?;
        let tiers = secret_tiers(&shared, &context, now);
        let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::SecretsList);
        if !decision.allowed {
            continue;
        }
        secrets.push(secret_message(
            req.project.clone(),
            &secret,
            &shared,
            None,
            false,
        ));
    }
    secrets.sort_by(|a, b| a.name.cmp(&b.name));

    AuditEvent::new("secret_list", AuditResource::Secret, &req.project, &caller)
        .with_total(secrets.len())
        .success();
    Ok(Json(ListSecretsResponse { secrets }))
}

/// GetSecret - READ access across all three tiers; the response carries the
/// decoded data.
pub async fn get_secret(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<GetSecretRequest>,
) -> Result<Json<GetSecretResponse>, RpcError> {
    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;
    let (secret, shared) = load_secret(&state, &context, &req.name).await?;

    let tiers = secret_tiers(&shared, &context, now);
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::SecretsRead);
    let audit = AuditEvent::new("secret_get", AuditResource::Secret, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied("caller may not read the secret"));
    }

    audit.success();
    Ok(Json(GetSecretResponse {
        secret: secret_message(req.project.clone(), &secret, &shared, Some(decision.role), true),
    }))
}

/// CreateSecret - WRITE access on the parent tiers (the secret does not
/// exist yet); the creator lands in share-users as owner.
pub async fn create_secret(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateSecretRequest>,
) -> Result<Json<CreateSecretResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;

    let decision = evaluate(
        &context.parent_tiers,
        &caller.email,
        &caller.roles,
        Permission::SecretsWrite,
    );
    let audit = AuditEvent::new("secret_create", AuditResource::Secret, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not create secrets in the project",
        ));
    }

    let mut secret = SecretObject::new(&req.name, &context.object.name);
    secret.data = decode_wire_data(&req.data)?;
    let mut shared = SharedGrants::default();
    ensure_owner_grant(&mut shared.users, &caller.email);
    store_shared_grants(&mut secret.annotations, &shared);

    let created = state
        .store
        .create_secret(secret)
        .await
        .map_err(|e| map_store_error(e, "secret", &req.name))?;

    audit.success();
    Ok(Json(CreateSecretResponse {
        secret: secret_message(req.project.clone(), &created, &shared, Some(Role::Owner), true),
    }))
}

/// UpdateSecret - WRITE access across all three tiers. Absent data
/// preserves the stored values; a present map replaces them.
pub async fn update_secret(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateSecretRequest>,
) -> Result<Json<UpdateSecretResponse>, RpcError> {
    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;
    let (mut secret, shared) = load_secret(&state, &context, &req.name).await?;

    let tiers = secret_tiers(&shared, &context, now);
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::SecretsWrite);
    let audit = AuditEvent::new("secret_update", AuditResource::Secret, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not update the secret",
        ));
    }

    if let Some(data) = &req.data {
        secret.data = decode_wire_data(data)?;
    }
    let updated = state
        .store
        .update_secret(secret)
        .await
        .map_err(|e| map_store_error(e, "secret", &req.name))?;

    audit.success();
    Ok(Json(UpdateSecretResponse {
        secret: secret_message(req.project.clone(), &updated, &shared, Some(decision.role), true),
    }))
}

/// DeleteSecret - DELETE access across all three tiers.
pub async fn delete_secret(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<DeleteSecretRequest>,
) -> Result<Json<DeleteSecretResponse>, RpcError> {
    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;
    let (secret, shared) = load_secret(&state, &context, &req.name).await?;

    let tiers = secret_tiers(&shared, &context, now);
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::SecretsDelete);
    let audit = AuditEvent::new("secret_delete", AuditResource::Secret, &req.name, &caller);
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not delete the secret",
        ));
    }

    state
        .store
        .delete_secret(&context.object.name, &secret.name)
        .await
        .map_err(|e| map_store_error(e, "secret", &req.name))?;

    audit.success();
    Ok(Json(DeleteSecretResponse {}))
}

/// UpdateSharing - ADMIN access across all three tiers; replaces both grant
/// arrays atomically.
pub async fn update_secret_sharing(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UpdateSecretSharingRequest>,
) -> Result<Json<UpdateSecretSharingResponse>, RpcError> {
    require_field(&req.name, "name")?;
    let replacement = SharedGrants {
        users: grants_from_wire(&req.user_grants)?,
        groups: grants_from_wire(&req.group_grants)?,
    };

    let now = state.clock.now_unix();
    let context = load_project_context(&state, &req.project, now).await?;
    let (mut secret, existing) = load_secret(&state, &context, &req.name).await?;

    let tiers = secret_tiers(&existing, &context, now);
    let decision = evaluate(&tiers, &caller.email, &caller.roles, Permission::SecretsAdmin);
    let audit = AuditEvent::new(
        "secret_update_sharing",
        AuditResource::Secret,
        &req.name,
        &caller,
    );
    if !decision.allowed {
        audit.denied();
        return Err(RpcError::permission_denied(
            "caller may not administer the secret",
        ));
    }

    store_shared_grants(&mut secret.annotations, &replacement);
    let updated = state
        .store
        .update_secret(secret)
        .await
        .map_err(|e| map_store_error(e, "secret", &req.name))?;

    let new_tiers = secret_tiers(&replacement, &context, now);
    let user_role = evaluate(
        &new_tiers,
        &caller.email,
        &caller.roles,
        Permission::SecretsRead,
    )
    .role;

    audit.success();
    Ok(Json(UpdateSecretSharingResponse {
        secret: secret_message(
            req.project.clone(),
            &updated,
            &replacement,
            Some(user_role),
            false,
        ),
    }))
}
