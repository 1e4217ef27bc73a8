//! End-to-end RPC tests: real router, real token verification against a mock
//! issuer, in-memory store with the production visibility semantics.

use std::sync::Arc;

use authn::{Verifier, VerifierConfig};
use authz::{AnnotationGrant, Role, serialize_grants};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::AUTHORIZATION};
use clap::Parser;
use config::Options;
use console_core::meta::{
    ORGANIZATION_LABEL, PROJECT_LABEL, SHARE_GROUPS_ANNOTATION, SHARE_USERS_ANNOTATION,
};
use console_core::{Clock, ResourceType};
use holos_console::AppState;
use holos_console::routes::create_router;
use serde_json::{Value, json};
use storage::{MemoryStore, SecretObject, TenantObject};
use testing::{TokenMint, mount_oidc_issuer};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG_SVC: &str = "/holos.console.v1alpha1.OrganizationService";
const PROJECT_SVC: &str = "/holos.console.v1alpha1.ProjectService";
const SECRETS_SVC: &str = "/holos.console.v1alpha1.SecretsService";
const VERSION_SVC: &str = "/holos.console.v1alpha1.VersionService";

struct TestServer {
    router: Router,
    issuer: MockServer,
    store: Arc<MemoryStore>,
}

impl TestServer {
    /// Builds a server against a freshly mounted mock issuer.
    async fn start(clock: Clock, extra_args: &[&str]) -> Self {
        let issuer = MockServer::start().await;
        mount_oidc_issuer(&issuer).await;
        Self::start_with_issuer(issuer, clock, extra_args).await
    }

    /// Builds a server against a caller-prepared issuer (e.g. one that is
    /// down).
    async fn start_with_issuer(issuer: MockServer, clock: Clock, extra_args: &[&str]) -> Self {
        let mut args = vec![
            "holos-console",
            "--plain-http",
            "--client-id",
            "console",
            "--issuer",
        ];
        let issuer_uri = issuer.uri();
        args.push(&issuer_uri);
        args.extend_from_slice(extra_args);
        let options = Options::parse_from(args);

        let store = Arc::new(MemoryStore::new());
        let verifier = Arc::new(Verifier::new(VerifierConfig {
            issuer: options.issuer(),
            client_id: options.client_id.clone(),
            roles_claim: options.roles_claim.clone(),
            http_client: reqwest::Client::new(),
        }));
        let state = AppState::new(Arc::new(options), store.clone(), verifier, clock, None);
        Self {
            router: create_router(state),
            issuer,
            store,
        }
    }

    fn token(&self, email: &str, groups: &[&str]) -> String {
        TokenMint::new(self.issuer.uri(), "console")
            .user(email)
            .groups(groups)
            .sign()
    }

    async fn rpc(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn user_grants(grants: &[(&str, Role)]) -> String {
    let grants: Vec<AnnotationGrant> = grants
        .iter()
        .map(|(principal, role)| AnnotationGrant::new(*principal, *role))
        .collect();
    serialize_grants(&grants)
}

fn org_object(logical: &str, share_users: &str, share_groups: &str) -> TenantObject {
    let mut object = TenantObject::new(
        format!("holos-o-{logical}"),
        ResourceType::Organization,
    );
    object
        .labels
        .insert(ORGANIZATION_LABEL.to_string(), logical.to_string());
    object
        .annotations
        .insert(SHARE_USERS_ANNOTATION.to_string(), share_users.to_string());
    object.annotations.insert(
        SHARE_GROUPS_ANNOTATION.to_string(),
        share_groups.to_string(),
    );
    object
}

fn project_object(logical: &str, org: Option<&str>, share_users: &str) -> TenantObject {
    let mut object = TenantObject::new(format!("holos-p-{logical}"), ResourceType::Project);
    object
        .labels
        .insert(PROJECT_LABEL.to_string(), logical.to_string());
    if let Some(org) = org {
        object
            .labels
            .insert(ORGANIZATION_LABEL.to_string(), org.to_string());
    }
    object
        .annotations
        .insert(SHARE_USERS_ANNOTATION.to_string(), share_users.to_string());
    object
}

fn secret_object(name: &str, project_storage: &str, data: &[(&str, &[u8])]) -> SecretObject {
    let mut secret = SecretObject::new(name, project_storage);
    for (key, value) in data {
        secret.data.insert((*key).to_string(), value.to_vec());
    }
    secret
}

// --- S7: bearer handling ---

#[tokio::test]
async fn test_missing_bearer_is_unauthenticated() {
    let server = TestServer::start(Clock::System, &[]).await;
    let (status, body) = server
        .rpc(&format!("{ORG_SVC}/ListOrganizations"), None, json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn test_empty_and_non_bearer_tokens_are_unauthenticated() {
    let server = TestServer::start(Clock::System, &[]).await;
    for header in ["Bearer ", "Token abc"] {
        let request = Request::builder()
            .method("POST")
            .uri(format!("{ORG_SVC}/ListOrganizations"))
            .header("content-type", "application/json")
            .header(AUTHORIZATION, header)
            .body(Body::from("{}"))
            .unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{header:?}");
    }
}

#[tokio::test]
async fn test_version_needs_no_token() {
    let server = TestServer::start(Clock::System, &[]).await;
    let (status, body) = server
        .rpc(&format!("{VERSION_SVC}/GetVersion"), None, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// --- S1: prefix filtering ---

#[tokio::test]
async fn test_list_organizations_filters_foreign_prefixes() {
    let server = TestServer::start(Clock::System, &[]).await;
    let grants = user_grants(&[("alice@example.com", Role::Viewer)]);
    server
        .store
        .put_tenant_object(org_object("acme", &grants, "[]"))
        .await;
    // Same resource-type label, same grants, but a storage name from a
    // different deployment and no organization label.
    let mut foreign = org_object("beta", &grants, "[]");
    foreign.name = "other-o-beta".to_string();
    foreign.labels.remove(ORGANIZATION_LABEL);
    server.store.put_tenant_object(foreign).await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/ListOrganizations"),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let organizations = body["organizations"].as_array().unwrap();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0]["name"], "acme");
}

#[tokio::test]
async fn test_list_filters_unshared_organizations() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Viewer)]),
            "[]",
        ))
        .await;
    server
        .store
        .put_tenant_object(org_object(
            "rival",
            &user_grants(&[("eve@example.com", Role::Owner)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (_, body) = server
        .rpc(
            &format!("{ORG_SVC}/ListOrganizations"),
            Some(&token),
            json!({}),
        )
        .await;
    let organizations = body["organizations"].as_array().unwrap();
    assert_eq!(organizations.len(), 1);
    assert_eq!(organizations[0]["name"], "acme");
}

// --- Organization CRUD ---

#[tokio::test]
async fn test_get_organization_reports_user_role() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Editor)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganization"),
            Some(&token),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"]["name"], "acme");
    assert_eq!(body["organization"]["userRole"], "editor");
}

#[tokio::test]
async fn test_get_missing_organization_is_not_found() {
    let server = TestServer::start(Clock::System, &[]).await;
    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganization"),
            Some(&token),
            json!({"name": "ghost"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    // The storage name never surfaces.
    assert!(!body["message"].as_str().unwrap().contains("holos-o-"));
}

#[tokio::test]
async fn test_empty_name_is_invalid_argument() {
    let server = TestServer::start(Clock::System, &[]).await;
    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganization"),
            Some(&token),
            json!({"name": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn test_update_organization_field_semantics() {
    let server = TestServer::start(Clock::System, &[]).await;
    let mut org = org_object(
        "acme",
        &user_grants(&[("alice@example.com", Role::Editor)]),
        "[]",
    );
    org.annotations.insert(
        "console.holos.run/display-name".to_string(),
        "Acme Corp".to_string(),
    );
    org.annotations.insert(
        "console.holos.run/description".to_string(),
        "Original description".to_string(),
    );
    server.store.put_tenant_object(org).await;

    let token = server.token("alice@example.com", &[]);
    // Absent display name preserves it; empty description deletes it.
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/UpdateOrganization"),
            Some(&token),
            json!({"name": "acme", "description": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"]["displayName"], "Acme Corp");
    assert_eq!(body["organization"]["description"], "");
}

#[tokio::test]
async fn test_update_requires_write() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Viewer)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/UpdateOrganization"),
            Some(&token),
            json!({"name": "acme", "displayName": "New"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");
}

#[tokio::test]
async fn test_update_sharing_requires_admin_and_recomputes_role() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Owner)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/UpdateOrganizationSharing"),
            Some(&token),
            json!({
                "name": "acme",
                "userGrants": [{"principal": "alice@example.com", "role": "editor"}],
                "groupGrants": [{"principal": "eng", "role": "viewer"}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // Alice demoted herself; the response reflects the new grants.
    assert_eq!(body["organization"]["userRole"], "editor");

    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/UpdateOrganizationSharing"),
            Some(&token),
            json!({"name": "acme", "userGrants": [], "groupGrants": []}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_sharing_rejects_unknown_roles() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Owner)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/UpdateOrganizationSharing"),
            Some(&token),
            json!({
                "name": "acme",
                "userGrants": [{"principal": "bob@example.com", "role": "superuser"}],
                "groupGrants": [],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn test_get_organization_raw_returns_stored_json() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Viewer)]),
            "[]",
        ))
        .await;

    let token = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganizationRaw"),
            Some(&token),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(body["raw"].as_str().unwrap()).unwrap();
    assert_eq!(raw["name"], "holos-o-acme");

    // Read access is still required.
    let carol = server.token("carol@example.com", &[]);
    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganizationRaw"),
            Some(&carol),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// --- S3: creation gated by allow-list ---

#[tokio::test]
async fn test_create_organization_allow_list() {
    let server = TestServer::start(
        Clock::System,
        &["--org-creator-users", "alice@example.com"],
    )
    .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/CreateOrganization"),
            Some(&alice),
            json!({"name": "new", "displayName": "New Org"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"]["name"], "new");
    assert_eq!(body["organization"]["userRole"], "owner");

    // Invariant: the creator shows up as owner on a subsequent get.
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/GetOrganization"),
            Some(&alice),
            json!({"name": "new"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let grants = body["organization"]["userGrants"].as_array().unwrap();
    assert!(grants.iter().any(|grant| {
        grant["principal"] == "alice@example.com" && grant["role"] == "owner"
    }));

    // Bob is not on the allow-list, ownership elsewhere does not help.
    let bob = server.token("bob@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/CreateOrganization"),
            Some(&bob),
            json!({"name": "bobs"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");
}

#[tokio::test]
async fn test_create_organization_role_allow_list_and_disable_flag() {
    let server = TestServer::start(
        Clock::System,
        &[
            "--disable-org-creation",
            "--org-creator-roles",
            "platform-admins",
        ],
    )
    .await;

    // The allow-list wins over the disable flag.
    let admin = server.token("dana@example.com", &["platform-admins"]);
    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/CreateOrganization"),
            Some(&admin),
            json!({"name": "platform"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let outsider = server.token("eve@example.com", &["eng"]);
    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/CreateOrganization"),
            Some(&outsider),
            json!({"name": "nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_duplicate_organization_already_exists() {
    let server = TestServer::start(
        Clock::System,
        &["--org-creator-users", "alice@example.com"],
    )
    .await;
    server
        .store
        .put_tenant_object(org_object("acme", "[]", "[]"))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/CreateOrganization"),
            Some(&alice),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_exists");
}

// --- S4: deletion precondition ---

#[tokio::test]
async fn test_delete_organization_blocked_by_linked_projects() {
    let server = TestServer::start(Clock::System, &[]).await;
    let owner = user_grants(&[("alice@example.com", Role::Owner)]);
    server
        .store
        .put_tenant_object(org_object("acme", &owner, "[]"))
        .await;
    server
        .store
        .put_tenant_object(project_object("api", Some("acme"), "[]"))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/DeleteOrganization"),
            Some(&alice),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["code"], "failed_precondition");
    assert!(body["message"].as_str().unwrap().contains('1'));

    // Owner access cascades from the org, so alice can delete the project.
    let (status, _) = server
        .rpc(
            &format!("{PROJECT_SVC}/DeleteProject"),
            Some(&alice),
            json!({"name": "api"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/DeleteOrganization"),
            Some(&alice),
            json!({"name": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// --- Projects ---

#[tokio::test]
async fn test_create_project_requires_org_create_permission() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[
                ("alice@example.com", Role::Owner),
                ("bob@example.com", Role::Editor),
            ]),
            "[]",
        ))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{PROJECT_SVC}/CreateProject"),
            Some(&alice),
            json!({"name": "api", "organization": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["name"], "api");
    assert_eq!(body["project"]["organization"], "acme");
    assert_eq!(body["project"]["userRole"], "owner");

    // Editors cannot create.
    let bob = server.token("bob@example.com", &[]);
    let (status, _) = server
        .rpc(
            &format!("{PROJECT_SVC}/CreateProject"),
            Some(&bob),
            json!({"name": "web", "organization": "acme"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The organization field is required.
    let (status, body) = server
        .rpc(
            &format!("{PROJECT_SVC}/CreateProject"),
            Some(&alice),
            json!({"name": "orphan"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn test_project_access_cascades_from_org() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "acme",
            &user_grants(&[("alice@example.com", Role::Editor)]),
            "[]",
        ))
        .await;
    server
        .store
        .put_tenant_object(project_object("api", Some("acme"), "[]"))
        .await;
    // A project without the organization label gets no cascade.
    server
        .store
        .put_tenant_object(project_object("standalone", None, "[]"))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{PROJECT_SVC}/GetProject"),
            Some(&alice),
            json!({"name": "api"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["userRole"], "editor");

    let (status, _) = server
        .rpc(
            &format!("{PROJECT_SVC}/GetProject"),
            Some(&alice),
            json!({"name": "standalone"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = server
        .rpc(&format!("{PROJECT_SVC}/ListProjects"), Some(&alice), json!({}))
        .await;
    let projects = body["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "api");
}

// --- S2: secret tier cascade ---

#[tokio::test]
async fn test_secret_tier_cascade() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "o",
            "[]",
            &user_grants(&[("eng", Role::Editor)]),
        ))
        .await;
    server
        .store
        .put_tenant_object(project_object(
            "p",
            Some("o"),
            &user_grants(&[("alice@example.com", Role::Viewer)]),
        ))
        .await;
    server
        .store
        .put_secret(secret_object("s", "holos-p-p", &[("k", b"v")]))
        .await;

    // Alice reads via the project grant.
    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{SECRETS_SVC}/GetSecret"),
            Some(&alice),
            json!({"project": "p", "name": "s"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"]["name"], "s");
    assert_eq!(body["secret"]["project"], "p");

    // Bob writes via the org role grant cascading through the org label.
    let bob = server.token("bob@example.com", &["eng"]);
    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/UpdateSecret"),
            Some(&bob),
            json!({"project": "p", "name": "s", "data": {"k": "bmV3"}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Carol holds nothing on any tier.
    let carol = server.token("carol@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{SECRETS_SVC}/GetSecret"),
            Some(&carol),
            json!({"project": "p", "name": "s"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");
}

#[tokio::test]
async fn test_org_grants_do_not_reach_unlinked_project_secrets() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(org_object(
            "o",
            &user_grants(&[("alice@example.com", Role::Owner)]),
            "[]",
        ))
        .await;
    // The project does not carry the organization label.
    server
        .store
        .put_tenant_object(project_object("p", None, "[]"))
        .await;
    server
        .store
        .put_secret(secret_object("s", "holos-p-p", &[("k", b"v")]))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/GetSecret"),
            Some(&alice),
            json!({"project": "p", "name": "s"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_secret_lifecycle_and_list_hides_data() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(project_object(
            "p",
            None,
            &user_grants(&[("alice@example.com", Role::Owner)]),
        ))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{SECRETS_SVC}/CreateSecret"),
            Some(&alice),
            json!({"project": "p", "name": "db", "data": {"password": "aHVudGVyMg=="}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"]["data"]["password"], "aHVudGVyMg==");
    // The creator lands in share-users as owner.
    let grants = body["secret"]["userGrants"].as_array().unwrap();
    assert!(grants.iter().any(|grant| {
        grant["principal"] == "alice@example.com" && grant["role"] == "owner"
    }));

    let (status, body) = server
        .rpc(
            &format!("{SECRETS_SVC}/ListSecrets"),
            Some(&alice),
            json!({"project": "p"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let secrets = body["secrets"].as_array().unwrap();
    assert_eq!(secrets.len(), 1);
    assert!(secrets[0].get("data").is_none());

    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/DeleteSecret"),
            Some(&alice),
            json!({"project": "p", "name": "db"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/GetSecret"),
            Some(&alice),
            json!({"project": "p", "name": "db"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_secret_sharing_grants_direct_access() {
    let server = TestServer::start(Clock::System, &[]).await;
    server
        .store
        .put_tenant_object(project_object(
            "p",
            None,
            &user_grants(&[("alice@example.com", Role::Owner)]),
        ))
        .await;
    server
        .store
        .put_secret(secret_object("s", "holos-p-p", &[("k", b"v")]))
        .await;

    let alice = server.token("alice@example.com", &[]);
    let (status, body) = server
        .rpc(
            &format!("{SECRETS_SVC}/UpdateSharing"),
            Some(&alice),
            json!({
                "project": "p",
                "name": "s",
                "userGrants": [{"principal": "frank@example.com", "role": "viewer"}],
                "groupGrants": [],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"]["userRole"], "owner");

    // Frank now reads via the secret's own tier.
    let frank = server.token("frank@example.com", &[]);
    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/GetSecret"),
            Some(&frank),
            json!({"project": "p", "name": "s"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // But a viewer cannot administer sharing.
    let (status, _) = server
        .rpc(
            &format!("{SECRETS_SVC}/UpdateSharing"),
            Some(&frank),
            json!({"project": "p", "name": "s", "userGrants": [], "groupGrants": []}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// --- S5: time-windowed grants ---

#[tokio::test]
async fn test_time_windowed_grant_activation() {
    let windowed = serialize_grants(&[AnnotationGrant {
        principal: "bob@example.com".to_string(),
        role: Role::Viewer,
        nbf: Some(100),
        exp: Some(200),
    }]);

    for (t, expected) in [
        (99, StatusCode::FORBIDDEN),
        (150, StatusCode::OK),
        (200, StatusCode::FORBIDDEN),
    ] {
        let server = TestServer::start(Clock::Fixed(t), &[]).await;
        server
            .store
            .put_tenant_object(org_object("acme", &windowed, "[]"))
            .await;
        let bob = server.token("bob@example.com", &[]);
        let (status, _) = server
            .rpc(
                &format!("{ORG_SVC}/GetOrganization"),
                Some(&bob),
                json!({"name": "acme"}),
            )
            .await;
        assert_eq!(status, expected, "at t={t}");
    }
}

// --- S6: verifier retry ---

#[tokio::test]
async fn test_verifier_outage_then_recovery() {
    let issuer = MockServer::start().await;
    // Discovery is down for the first request only.
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&issuer)
        .await;

    let server = TestServer::start_with_issuer(issuer, Clock::System, &[]).await;
    let token = server.token("alice@example.com", &[]);

    let (status, body) = server
        .rpc(
            &format!("{ORG_SVC}/ListOrganizations"),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "unavailable");

    // Issuer recovers; the same deployment now serves requests.
    mount_oidc_issuer(&server.issuer).await;
    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/ListOrganizations"),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The cached verifier answers the third call without a new discovery.
    let discovery_count = |requests: &[wiremock::Request]| {
        requests
            .iter()
            .filter(|r| r.url.path() == "/.well-known/openid-configuration")
            .count()
    };
    let before = discovery_count(&server.issuer.received_requests().await.unwrap());
    let (status, _) = server
        .rpc(
            &format!("{ORG_SVC}/ListOrganizations"),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let after = discovery_count(&server.issuer.received_requests().await.unwrap());
    assert_eq!(before, after);
}

// --- Invariant: storage names never surface ---

#[tokio::test]
async fn test_responses_never_leak_storage_names() {
    let server = TestServer::start(Clock::System, &[]).await;
    let owner = user_grants(&[("alice@example.com", Role::Owner)]);
    server
        .store
        .put_tenant_object(org_object("acme", &owner, "[]"))
        .await;
    server
        .store
        .put_tenant_object(project_object("api", Some("acme"), &owner))
        .await;
    server
        .store
        .put_secret(secret_object("db", "holos-p-api", &[("k", b"v")]))
        .await;

    let alice = server.token("alice@example.com", &[]);
    for (path, body) in [
        (format!("{ORG_SVC}/ListOrganizations"), json!({})),
        (format!("{ORG_SVC}/GetOrganization"), json!({"name": "acme"})),
        (format!("{PROJECT_SVC}/ListProjects"), json!({})),
        (format!("{PROJECT_SVC}/GetProject"), json!({"name": "api"})),
        (
            format!("{SECRETS_SVC}/ListSecrets"),
            json!({"project": "api"}),
        ),
        (
            format!("{SECRETS_SVC}/GetSecret"),
            json!({"project": "api", "name": "db"}),
        ),
    ] {
        let (status, value) = server.rpc(&path, Some(&alice), body).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        let text = value.to_string();
        assert!(!text.contains("holos-o-"), "{path} leaked: {text}");
        assert!(!text.contains("holos-p-"), "{path} leaked: {text}");
    }
}

// --- Health surface ---

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestServer::start(Clock::System, &[]).await;
    for path in ["/healthz", "/readyz"] {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = server.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}
