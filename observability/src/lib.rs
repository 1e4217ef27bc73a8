//! # Holos Console Observability
//!
//! Structured audit events with a stable action/resource taxonomy, and the
//! Prometheus recorder with per-RPC counters.

pub mod audit;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use audit::{AuditEvent, AuditResource};
pub use telemetry::{Telemetry, install_recorder};
