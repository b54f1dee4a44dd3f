//! The caller's own identity.

use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;

/// Response for `GET /v1/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// User id.
    pub user_id: i64,
    /// Account name.
    pub username: String,
}

/// Return the identity attached by the session middleware.
pub async fn me(AuthUser(identity): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: identity.user_id.get(),
        username: identity.username,
    })
}
