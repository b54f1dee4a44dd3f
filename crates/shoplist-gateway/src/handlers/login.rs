//! Login.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use shoplist_store::UserDirectory;

use super::blocking;
use super::users::CredentialsRequest;
use crate::error::ApiError;
use crate::state::SharedState;

/// A freshly issued session token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The bearer token.
    pub token: String,
    /// Always `"Bearer"`.
    pub token_type: &'static str,
    /// When the token stops working.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Exchange a username and password for a session token.
///
/// # Errors
///
/// `InvalidCredentials` for an unknown user or a wrong password.
pub async fn login<D>(
    State(state): State<SharedState<D>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    D: UserDirectory + 'static,
{
    let auth = Arc::clone(&state.auth);
    let issued = blocking(move || Ok(auth.login(body.username.trim(), &body.password)?)).await?;

    Ok(Json(LoginResponse {
        expires_at: issued.expires_at(),
        token: issued.token,
        token_type: "Bearer",
    }))
}
