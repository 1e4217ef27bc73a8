//! Health, readiness, and metrics endpoints.

use axum::extract::State;
use console_core::RpcError;

use crate::state::AppState;

/// GET /healthz - 200 while the process is up.
pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /readyz - 200 once the backing store answers.
pub async fn readyz(State(state): State<AppState>) -> Result<&'static str, RpcError> {
    state
        .store
        .ready()
        .await
        .map_err(|error| {
            tracing::warn!(%error, "Readiness probe failed");
            RpcError::unavailable("backing store not ready")
        })?;
    Ok("ok")
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<String, RpcError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| RpcError::unavailable("metrics recorder not installed"))
}
