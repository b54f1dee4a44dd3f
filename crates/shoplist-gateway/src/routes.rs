//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use shoplist_store::UserDirectory;

use crate::auth::{require_admin, require_allowed_ip, require_session};
use crate::handlers::{admin, health, login, me, users};
use crate::state::{GatewayState, SharedState};

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/login` - Exchange credentials for a session token
///
/// ## Allow-listed origins
/// - `POST /v1/users` - Create an account
///
/// ## Session (`Authorization: Bearer <token>`)
/// - `GET /v1/me` - The caller's identity
///
/// ## Admin (admin key header)
/// - `GET /v1/admin/ledger` - Ledger size
/// - `POST /v1/admin/ledger/compact` - Drop tokens that no longer verify
/// - `POST /v1/admin/secrets/reload` - Re-read secret files
///
/// The peer address for the allow-list comes from `ConnectInfo`, so serve
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router<D>(state: GatewayState<D>) -> Router
where
    D: UserDirectory + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state: SharedState<D> = Arc::new(state);

    let signup: Router<SharedState<D>> = Router::new()
        .route("/v1/users", post(users::create_user::<D>))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_allowed_ip::<D>));

    let session: Router<SharedState<D>> = Router::new()
        .route("/v1/me", get(me::me))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_session::<D>));

    let admin: Router<SharedState<D>> = Router::new()
        .route("/v1/admin/ledger", get(admin::ledger_status::<D>))
        .route("/v1/admin/ledger/compact", post(admin::compact_ledger::<D>))
        .route("/v1/admin/secrets/reload", post(admin::reload_secrets::<D>))
        .route_layer(from_fn_with_state(Arc::clone(&state), require_admin::<D>));

    Router::new()
        .route("/health", get(health::health::<D>))
        .route("/v1/login", post(login::login::<D>))
        .merge(signup)
        .merge(session)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_seconds)))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
