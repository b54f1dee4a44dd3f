//! HTTP gateway for the shopping list server.
//!
//! This crate exposes the authentication core over HTTP:
//!
//! - account creation, gated by the IP allow-list
//! - password login returning a bearer token
//! - session-protected routes behind `require_session`
//! - admin routes behind the admin key header
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Clients                          │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                    shoplist-gateway                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐   │
//! │  │ IP / session│  │   Router    │  │   Error mapping │   │
//! │  │ / admin     │  │ + Handlers  │  │   {"error": ..} │   │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//!         ┌──────────────┐           ┌──────────────┐
//!         │ shoplist-auth│──────────▶│shoplist-store│
//!         └──────────────┘           └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use shoplist_auth::{AuthConfig, AuthService};
//! use shoplist_gateway::{create_router, GatewayConfig, GatewayState};
//! use shoplist_store::RocksDirectory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Arc::new(RocksDirectory::open("/tmp/shoplist/users")?);
//! let auth = Arc::new(AuthService::load(&AuthConfig::in_dir("/tmp/shoplist"), directory)?);
//!
//! let state = GatewayState::new(auth, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::AuthUser;
pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::{GatewayState, SharedState};

/// Install the global `tracing` subscriber used by the binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shoplist=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
