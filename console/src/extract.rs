//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use console_core::{Claims, RpcError};

/// The authenticated caller, extracted from the claims the auth middleware
/// attached to the request. Rejects with `UNAUTHENTICATED` when absent.
pub struct Caller(pub Claims);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| RpcError::unauthenticated("no identity attached to request"))
    }
}
