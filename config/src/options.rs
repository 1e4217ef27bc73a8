//! Recognized configuration options and their derivations.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use authz::CreatorPolicy;
use clap::Parser;
use console_core::Resolver;
use thiserror::Error;

/// Errors validating or materializing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {listen:?}: {reason}")]
    InvalidListen { listen: String, reason: String },

    #[error("failed to read CA bundle {path:?}: {source}")]
    CaFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CA bundle {path:?}: {source}")]
    CaParse {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Command-line and environment configuration of the console.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "holos-console",
    version,
    about = "Control plane for organizations, projects, and secrets"
)]
pub struct Options {
    /// Bind address of the HTTP listener.
    #[arg(long, env = "HOLOS_LISTEN", default_value = "0.0.0.0:8443")]
    pub listen: String,

    /// Serve plain HTTP; TLS termination is delegated upstream.
    #[arg(long, env = "HOLOS_PLAIN_HTTP")]
    pub plain_http: bool,

    /// Public base URL; derived from the listen address when unset.
    #[arg(long, env = "HOLOS_ORIGIN")]
    pub origin: Option<String>,

    /// OIDC issuer URL; derived as `{origin}/dex` when unset.
    #[arg(long, env = "HOLOS_ISSUER")]
    pub issuer: Option<String>,

    /// Expected audience of presented ID tokens.
    #[arg(long, env = "HOLOS_CLIENT_ID", default_value = "holos-console")]
    pub client_id: String,

    /// Wire claim used to populate caller roles.
    #[arg(long, env = "HOLOS_ROLES_CLAIM", default_value = "groups")]
    pub roles_claim: String,

    /// Prefix shared by every storage name of this deployment.
    #[arg(long, env = "HOLOS_NAMESPACE_PREFIX", default_value = "holos-")]
    pub namespace_prefix: String,

    /// Prefix of organization storage names, after the namespace prefix.
    #[arg(long, env = "HOLOS_ORGANIZATION_PREFIX", default_value = "o-")]
    pub organization_prefix: String,

    /// Prefix of project storage names, after the namespace prefix.
    #[arg(long, env = "HOLOS_PROJECT_PREFIX", default_value = "p-")]
    pub project_prefix: String,

    /// Refuse organization creation for callers not on an allow-list.
    #[arg(long, env = "HOLOS_DISABLE_ORG_CREATION")]
    pub disable_org_creation: bool,

    /// Emails allowed to create organizations (comma separated).
    #[arg(long, env = "HOLOS_ORG_CREATOR_USERS", value_delimiter = ',')]
    pub org_creator_users: Vec<String>,

    /// Role-claim values allowed to create organizations (comma separated).
    #[arg(long, env = "HOLOS_ORG_CREATOR_ROLES", value_delimiter = ',')]
    pub org_creator_roles: Vec<String>,

    /// ID token lifetime in seconds. Embedded identity provider only.
    #[arg(long, env = "HOLOS_ID_TOKEN_TTL", default_value_t = 3600)]
    pub id_token_ttl: u64,

    /// Refresh token lifetime in seconds. Embedded identity provider only.
    #[arg(long, env = "HOLOS_REFRESH_TOKEN_TTL", default_value_t = 86400)]
    pub refresh_token_ttl: u64,

    /// Include health endpoints in request tracing.
    #[arg(long, env = "HOLOS_LOG_HEALTH_CHECKS")]
    pub log_health_checks: bool,

    /// Default log filter, overridable via RUST_LOG.
    #[arg(long, env = "HOLOS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Base URL of the cluster-manager API.
    #[arg(
        long,
        env = "HOLOS_CLUSTER_URL",
        default_value = "https://kubernetes.default.svc"
    )]
    pub cluster_url: String,

    /// Bearer token for the cluster-manager API.
    #[arg(long, env = "HOLOS_CLUSTER_TOKEN")]
    pub cluster_token: Option<String>,

    /// Extra root CA bundle (PEM) trusted for outbound TLS. Certificate
    /// verification itself is never disabled.
    #[arg(long, env = "HOLOS_CA_FILE")]
    pub ca_file: Option<PathBuf>,
}

impl Options {
    /// Returns the parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidListen {
                listen: self.listen.clone(),
                reason: e.to_string(),
            })
    }

    /// Returns the public base URL, deriving it from the listen address when
    /// not configured. The wildcard host normalizes to `localhost`.
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(origin) = &self.origin {
            return origin.trim_end_matches('/').to_string();
        }
        let scheme = if self.plain_http { "http" } else { "https" };
        let (host, port) = self
            .listen
            .rsplit_once(':')
            .unwrap_or((self.listen.as_str(), "8443"));
        let host = match host {
            "" | "0.0.0.0" | "[::]" | "::" => "localhost",
            other => other,
        };
        format!("{scheme}://{host}:{port}")
    }

    /// Returns the OIDC issuer, deriving `{origin}/dex` when not configured.
    #[must_use]
    pub fn issuer(&self) -> String {
        match &self.issuer {
            Some(issuer) => issuer.trim_end_matches('/').to_string(),
            None => format!("{}/dex", self.origin()),
        }
    }

    /// Returns the name resolver for this deployment's prefixes.
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(
            self.namespace_prefix.clone(),
            self.organization_prefix.clone(),
            self.project_prefix.clone(),
        )
    }

    /// Returns the creator policy gating organization creation.
    #[must_use]
    pub fn creator_policy(&self) -> CreatorPolicy {
        CreatorPolicy {
            disable_creation: self.disable_org_creation,
            users: self.org_creator_users.clone(),
            roles: self.org_creator_roles.clone(),
        }
    }

    /// Builds the outbound HTTP client: bounded timeout, optional extra root
    /// CA, certificate verification always on.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(15));
        if let Some(path) = &self.ca_file {
            let pem = std::fs::read(path).map_err(|source| ConfigError::CaFile {
                path: path.clone(),
                source,
            })?;
            let certificate =
                reqwest::Certificate::from_pem(&pem).map_err(|source| ConfigError::CaParse {
                    path: path.clone(),
                    source,
                })?;
            builder = builder.add_root_certificate(certificate);
        }
        builder.build().map_err(ConfigError::HttpClient)
    }
}
