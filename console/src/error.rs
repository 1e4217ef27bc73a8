//! Store error to RPC code mapping.

use console_core::RpcError;
use storage::StoreError;
use tracing::error;

/// Maps a store failure to the wire error for the named resource.
///
/// Messages are built from the caller-facing kind and logical name; store
/// messages may mention storage names and are logged instead of surfaced.
pub fn map_store_error(err: StoreError, kind: &str, logical_name: &str) -> RpcError {
    match err {
        StoreError::NotFound { .. } => {
            RpcError::not_found(format!("{kind} {logical_name:?} not found"))
        }
        StoreError::AlreadyExists { .. } => {
            RpcError::already_exists(format!("{kind} {logical_name:?} already exists"))
        }
        StoreError::Conflict { .. } => RpcError::aborted(format!(
            "{kind} {logical_name:?} was modified concurrently, retry"
        )),
        StoreError::BadRequest { message } => {
            error!(%message, kind, "Backing store rejected the request");
            RpcError::invalid_argument(format!("{kind} {logical_name:?} request was rejected"))
        }
        StoreError::Unavailable { message } => {
            error!(%message, kind, "Backing store unavailable");
            RpcError::unavailable("backing store unavailable")
        }
        StoreError::Transport(source) => {
            error!(error = %source, kind, "Backing store transport failure");
            RpcError::unavailable("backing store unavailable")
        }
        StoreError::Forbidden { message } | StoreError::Unauthorized { message } => {
            error!(%message, kind, "Backing store refused service credentials");
            RpcError::internal("backing store refused the request")
        }
        StoreError::Decode(source) => {
            error!(error = %source, kind, "Malformed object in backing store");
            RpcError::internal("malformed object in backing store")
        }
        StoreError::Other { message } => {
            error!(%message, kind, "Unclassified backing store error");
            RpcError::internal("backing store error")
        }
    }
}
