//! # Holos Console
//!
//! The control-plane service: typed RPC handlers over organizations,
//! projects, and secrets. Every RPC authenticates the caller's ID token,
//! loads the target objects from the cluster-manager store, evaluates the
//! grant annotations, and answers with logical names only - the storage
//! prefix scheme never leaves the process.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod rpc;
pub mod server;
pub mod state;
pub mod tenant;

pub use server::{ConsoleServer, run_server};
pub use state::AppState;
