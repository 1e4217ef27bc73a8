//! Prometheus recorder and per-RPC counters.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder and returns the handle the
/// metrics endpoint renders from.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Per-RPC counters.
pub struct Telemetry;

impl Telemetry {
    /// Counts one RPC invocation.
    pub fn record_rpc(method: &str) {
        counter!("rpc_requests_total", "method" => method.to_string()).increment(1);
    }

    /// Counts one failed RPC with its wire code.
    pub fn record_rpc_failure(method: &str, code: &str) {
        counter!(
            "rpc_failures_total",
            "method" => method.to_string(),
            "code" => code.to_string()
        )
        .increment(1);
    }
}
