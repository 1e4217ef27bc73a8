//! VersionService.

use axum::Json;

use crate::rpc::GetVersionResponse;

/// GetVersion - reports the product version. Served under the optional
/// interceptor; a token is never required.
pub async fn get_version() -> Json<GetVersionResponse> {
    Json(GetVersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
