//! Route definitions for the console service.
//!
//! RPC methods are unary JSON POSTs under the fixed
//! `/holos.console.v1alpha1.<Service>/<Method>` prefix, behind the strict
//! auth interceptor. GetVersion runs under the optional interceptor. Health
//! endpoints stay outside request tracing unless configured otherwise.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};
use console_core::RpcCode;
use observability::Telemetry;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, organizations, projects, secrets, version};
use crate::state::AppState;

/// Counts each RPC and labels failures with the wire code the error carried.
async fn track_rpc(request: Request, next: Next) -> Response {
    let method = request
        .uri()
        .path()
        .rsplit('/')
        .next()
        .unwrap_or("unknown")
        .to_string();
    Telemetry::record_rpc(&method);
    let response = next.run(request).await;
    if let Some(code) = response.extensions().get::<RpcCode>() {
        Telemetry::record_rpc_failure(&method, code.as_str());
    }
    response
}

/// Creates the axum router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let verifier = state.verifier.clone();

    let rpc = Router::new()
        .route(
            "/holos.console.v1alpha1.OrganizationService/ListOrganizations",
            post(organizations::list_organizations),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/GetOrganization",
            post(organizations::get_organization),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/CreateOrganization",
            post(organizations::create_organization),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/UpdateOrganization",
            post(organizations::update_organization),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/DeleteOrganization",
            post(organizations::delete_organization),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/UpdateOrganizationSharing",
            post(organizations::update_organization_sharing),
        )
        .route(
            "/holos.console.v1alpha1.OrganizationService/GetOrganizationRaw",
            post(organizations::get_organization_raw),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/ListProjects",
            post(projects::list_projects),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/GetProject",
            post(projects::get_project),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/CreateProject",
            post(projects::create_project),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/UpdateProject",
            post(projects::update_project),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/DeleteProject",
            post(projects::delete_project),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/UpdateProjectSharing",
            post(projects::update_project_sharing),
        )
        .route(
            "/holos.console.v1alpha1.ProjectService/GetProjectRaw",
            post(projects::get_project_raw),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/ListSecrets",
            post(secrets::list_secrets),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/GetSecret",
            post(secrets::get_secret),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/CreateSecret",
            post(secrets::create_secret),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/UpdateSecret",
            post(secrets::update_secret),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/DeleteSecret",
            post(secrets::delete_secret),
        )
        .route(
            "/holos.console.v1alpha1.SecretsService/UpdateSharing",
            post(secrets::update_secret_sharing),
        )
        .layer(axum::middleware::from_fn_with_state::<_, std::sync::Arc<authn::Verifier>, (axum::extract::State<std::sync::Arc<authn::Verifier>>, axum::extract::Request)>(
            verifier.clone(),
            authn::require_auth,
        ));

    let open = Router::new()
        .route(
            "/holos.console.v1alpha1.VersionService/GetVersion",
            post(version::get_version),
        )
        .layer(axum::middleware::from_fn_with_state(
            verifier,
            authn::optional_auth,
        ));

    let api = Router::new()
        .merge(rpc)
        .merge(open)
        .layer(axum::middleware::from_fn(track_rpc))
        .layer(TraceLayer::new_for_http());

    let probes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics));
    let probes = if state.options.log_health_checks {
        probes.layer(TraceLayer::new_for_http())
    } else {
        probes
    };

    Router::new().merge(api).merge(probes).with_state(state)
}
