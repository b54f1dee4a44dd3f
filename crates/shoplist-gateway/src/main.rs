//! Shopping list server: HTTP gateway entry point.
//!
//! Configuration comes from environment variables. Every auth file defaults
//! to a path under `DATA_DIR`. The process exits without serving if any
//! secret file is missing, still holds the placeholder, is malformed or
//! expired, or if the IP allow-list cannot be loaded.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shoplist_auth::{AuthConfig, AuthService, BearerMode};
use shoplist_gateway::{create_router, init_tracing, GatewayConfig, GatewayState};
use shoplist_store::RocksDirectory;

fn env_path(name: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(name).map_or(default, PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    tracing::info!("Starting shopping list gateway");

    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/shoplist".into()));
    let timeout_minutes: u64 = std::env::var("TOKEN_TIMEOUT_MINUTES")
        .map_or(Ok(15), |v| v.parse())?;
    let bearer_mode: BearerMode = std::env::var("BEARER_MODE")
        .map_or(Ok(BearerMode::Strict), |v| v.parse())?;
    let admin_requires_session = std::env::var("ADMIN_REQUIRES_SESSION")
        .is_ok_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

    let defaults = AuthConfig::in_dir(&data_dir);
    let auth_config = AuthConfig {
        token_timeout: Duration::from_secs(timeout_minutes.saturating_mul(60)),
        bearer_mode,
        secret_path: env_path("SECRET_PATH", defaults.secret_path.clone()),
        admin_secret_path: env_path("ADMIN_SECRET_PATH", defaults.admin_secret_path.clone()),
        admin_master_key_path: env_path("ADMIN_MASTER_KEY_PATH", defaults.admin_master_key_path.clone()),
        ledger_path: env_path("TOKEN_LEDGER_PATH", defaults.ledger_path.clone()),
        ip_whitelist_path: env_path("IP_WHITELIST_PATH", defaults.ip_whitelist_path.clone()),
        ..defaults
    };

    tracing::info!(
        listen_addr = %listen_addr,
        data_dir = %data_dir.display(),
        secret_path = %auth_config.secret_path.display(),
        admin_secret_path = %auth_config.admin_secret_path.display(),
        admin_master_key_path = %auth_config.admin_master_key_path.display(),
        ledger_path = %auth_config.ledger_path.display(),
        ip_whitelist_path = %auth_config.ip_whitelist_path.display(),
        timeout_minutes,
        bearer_mode = ?bearer_mode,
        admin_requires_session,
        "Gateway configuration loaded"
    );

    let users_path = data_dir.join("users");
    tracing::info!(path = %users_path.display(), "Opening RocksDB user directory");
    let directory = Arc::new(RocksDirectory::open(&users_path)?);

    let auth = match AuthService::load(&auth_config, directory) {
        Ok(auth) => Arc::new(auth),
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "Refusing to serve");
            return Err(e.into());
        }
    };

    let gateway_config = GatewayConfig {
        listen_addr: listen_addr.clone(),
        admin_requires_session,
        ..GatewayConfig::default()
    };
    let app = create_router(GatewayState::new(auth, gateway_config));

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
