//! Axum middleware attaching validated claims to requests.
//!
//! Only `Authorization: Bearer <jwt>` is accepted; forwarded-identity
//! headers are never trusted. Verification failures map to
//! `UNAUTHENTICATED`, verifier initialization failures to `UNAVAILABLE`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use console_core::{Claims, RpcError};

use crate::verifier::{AuthError, Verifier};

/// Strict interceptor: every request must carry a valid bearer token.
pub async fn require_auth(
    State(verifier): State<Arc<Verifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, RpcError> {
    let claims = authenticate(&verifier, &request).await?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Optional interceptor: requests without an `Authorization` header pass
/// through claimless; a present header must still validate.
pub async fn optional_auth(
    State(verifier): State<Arc<Verifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, RpcError> {
    if request.headers().get(AUTHORIZATION).is_none() {
        return Ok(next.run(request).await);
    }
    let claims = authenticate(&verifier, &request).await?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

async fn authenticate(verifier: &Verifier, request: &Request) -> Result<Claims, RpcError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| RpcError::unauthenticated("missing authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| RpcError::unauthenticated("malformed authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| RpcError::unauthenticated("authorization header is not a bearer token"))?;
    if token.is_empty() {
        return Err(RpcError::unauthenticated("empty bearer token"));
    }

    verifier.verify(token).await.map_err(|error| match error {
        AuthError::Unavailable(_) => RpcError::unavailable(error.to_string()),
        AuthError::Unauthenticated(_) => RpcError::unauthenticated(error.to_string()),
    })
}
