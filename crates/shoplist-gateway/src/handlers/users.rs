//! Account creation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use shoplist_auth::hash_password;
use shoplist_store::UserDirectory;

use super::blocking;
use crate::error::ApiError;
use crate::state::SharedState;

/// Username and password, used by signup and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Account name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Response for a created account.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    /// Assigned user id.
    pub id: i64,
    /// Account name.
    pub username: String,
}

/// Create an account. Mounted behind the IP allow-list.
///
/// # Errors
///
/// `BadRequest` for an empty username or password, `Conflict` if the
/// username is taken.
pub async fn create_user<D>(
    State(state): State<SharedState<D>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: UserDirectory + 'static,
{
    let username = body.username.trim().to_string();
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let auth = std::sync::Arc::clone(&state.auth);
    let user = blocking(move || {
        let hash = hash_password(&body.password)?;
        Ok(auth.directory().create_user(&username, &hash)?)
    })
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Account created");

    let response = CreateUserResponse {
        id: user.id.get(),
        username: user.username,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
