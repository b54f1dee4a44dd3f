//! Authentication middleware and extractors.
//!
//! Three layers gate the router:
//!
//! - [`require_session`] checks `Authorization: Bearer <token>` and attaches
//!   the resolved [`Identity`] to the request
//! - [`require_admin`] checks the admin key header (and, if configured, the
//!   session token as well)
//! - [`require_allowed_ip`] checks the peer address against the allow-list
//!
//! Handlers behind [`require_session`] take an [`AuthUser`].

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use shoplist_core::Identity;
use shoplist_store::UserDirectory;

use crate::error::ApiError;
use crate::state::SharedState;

/// The identity attached by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

fn verify_session<D: UserDirectory>(state: &SharedState<D>, request: &Request) -> Result<Identity, ApiError> {
    let header = header_str(request, AUTHORIZATION.as_str());
    Ok(state.auth.verifier().verify_header(header)?)
}

/// Reject requests without a live session token.
///
/// # Errors
///
/// `Unauthorized` for any verification failure; `Internal` for backend faults.
pub async fn require_session<D>(
    State(state): State<SharedState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    D: UserDirectory + 'static,
{
    let identity = verify_session(&state, &request)?;
    tracing::debug!(user_id = %identity.user_id, "Session verified");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Reject requests without a valid admin key.
///
/// # Errors
///
/// `Unauthorized` for a missing or invalid key, `Forbidden` for a key without
/// privilege or with the wrong embedded master key.
pub async fn require_admin<D>(
    State(state): State<SharedState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    D: UserDirectory + 'static,
{
    let key = header_str(&request, &state.config.admin_header);
    state.auth.admin().verify(key)?;

    if state.config.admin_requires_session {
        let identity = verify_session(&state, &request)?;
        tracing::info!(user_id = %identity.user_id, "Admin request with session");
        request.extensions_mut().insert(identity);
    } else {
        tracing::info!(path = %request.uri().path(), "Admin request");
    }

    Ok(next.run(request).await)
}

/// Reject requests whose peer address is not on the allow-list.
///
/// # Errors
///
/// `Forbidden` if the address is not allowed.
pub async fn require_allowed_ip<D>(
    State(state): State<SharedState<D>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    D: UserDirectory + 'static,
{
    state.auth.allowlist().check(peer.ip())?;
    Ok(next.run(request).await)
}
