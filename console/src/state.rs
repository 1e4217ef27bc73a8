//! Application state shared by all handlers.

use std::sync::Arc;

use authn::Verifier;
use authz::CreatorPolicy;
use config::Options;
use console_core::{Clock, Resolver};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::TenantStore;

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Parsed configuration.
    pub options: Arc<Options>,
    /// Name resolver for this deployment's prefixes.
    pub resolver: Resolver,
    /// Policy gating organization creation.
    pub creator_policy: CreatorPolicy,
    /// The backing object store.
    pub store: Arc<dyn TenantStore>,
    /// Bearer-token verifier.
    pub verifier: Arc<Verifier>,
    /// Time source for grant-window evaluation.
    pub clock: Clock,
    /// Prometheus render handle; absent when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates the state, deriving the resolver and creator policy from the
    /// options.
    #[must_use]
    pub fn new(
        options: Arc<Options>,
        store: Arc<dyn TenantStore>,
        verifier: Arc<Verifier>,
        clock: Clock,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let resolver = options.resolver();
        let creator_policy = options.creator_policy();
        Self {
            options,
            resolver,
            creator_policy,
            store,
            verifier,
            clock,
            metrics,
        }
    }
}
