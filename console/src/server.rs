//! Server setup and lifecycle.

use std::sync::Arc;

use authn::{Verifier, VerifierConfig};
use config::Options;
use console_core::Clock;
use storage::{ClusterClient, ClusterConfig};
use tokio::net::TcpListener;
use tokio::signal;

use crate::routes::create_router;
use crate::state::AppState;

/// The console HTTP server.
pub struct ConsoleServer {
    state: AppState,
}

impl ConsoleServer {
    /// Creates a server instance from existing state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Runs the HTTP server.
    ///
    /// Blocks until shutdown is requested via SIGINT or SIGTERM; in-flight
    /// requests drain before the listener closes.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.state.options.socket_addr()?;
        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(%addr, origin = %self.state.options.origin(), "Holos Console starting");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Holos Console stopped");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Builds state from configuration and runs the server.
pub async fn run_server(options: Options) -> anyhow::Result<()> {
    let http_client = options.http_client()?;

    let store = Arc::new(ClusterClient::new(
        ClusterConfig {
            base_url: options.cluster_url.trim_end_matches('/').to_string(),
            token: options.cluster_token.clone(),
        },
        http_client.clone(),
    ));
    let verifier = Arc::new(Verifier::new(VerifierConfig {
        issuer: options.issuer(),
        client_id: options.client_id.clone(),
        roles_claim: options.roles_claim.clone(),
        http_client,
    }));
    let metrics = observability::install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?;

    let state = AppState::new(
        Arc::new(options),
        store,
        verifier,
        Clock::System,
        Some(metrics),
    );
    ConsoleServer::new(state).run().await
}
