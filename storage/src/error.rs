//! Error types for the store adapter.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Typed kinds of backing-store failures.
///
/// The RPC layer maps these onto wire codes; messages here may mention
/// storage names and must never be surfaced to callers verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist, is pending deletion, or has the wrong
    /// resource type.
    #[error("object not found: {name}")]
    NotFound { name: String },

    /// An object with this name already exists.
    #[error("object already exists: {name}")]
    AlreadyExists { name: String },

    /// The backing API refused the operation for the service account.
    #[error("forbidden by backing store: {message}")]
    Forbidden { message: String },

    /// The service account credentials were rejected.
    #[error("unauthorized against backing store: {message}")]
    Unauthorized { message: String },

    /// The backing API rejected the request as malformed.
    #[error("invalid request to backing store: {message}")]
    BadRequest { message: String },

    /// Optimistic-concurrency version conflict on write.
    #[error("write conflict on {name}")]
    Conflict { name: String },

    /// The backing API is unreachable or failing transiently.
    #[error("backing store unavailable: {message}")]
    Unavailable { message: String },

    /// Transport-level failure talking to the backing API.
    #[error("backing store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A stored object could not be decoded.
    #[error("malformed stored object: {0}")]
    Decode(#[from] serde_json::Error),

    /// Anything the adapter cannot classify.
    #[error("backing store error: {message}")]
    Other { message: String },
}

impl StoreError {
    /// Returns whether the error indicates a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
