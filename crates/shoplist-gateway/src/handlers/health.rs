//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use shoplist_store::UserDirectory;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `secret_expired` once sessions can no longer verify.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check handler. Public.
///
/// Reports `503` once the session secret is past its validity window, since
/// every authenticated request fails from then on.
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health<D>(State(state): State<SharedState<D>>) -> impl IntoResponse
where
    D: UserDirectory + 'static,
{
    let (code, status) = if state.auth.secrets().valid_until() < Utc::now() {
        (StatusCode::SERVICE_UNAVAILABLE, "secret_expired")
    } else {
        (StatusCode::OK, "healthy")
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
    };
    (code, Json(response))
}
