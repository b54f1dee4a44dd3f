//! Mint an admin API key.
//!
//! Reads the admin signing secret and the master key from the same paths as
//! the gateway and prints a key valid for `VALID_DAYS` days (default 365) to
//! stdout. Present it in the `x-api-key` header on admin routes.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use shoplist_auth::{AdminKeyIssuer, AuthConfig, SecretStore, SessionCodec};
use shoplist_gateway::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/shoplist".into()));
    let defaults = AuthConfig::in_dir(&data_dir);
    let admin_secret_path = std::env::var_os("ADMIN_SECRET_PATH")
        .map_or(defaults.admin_secret_path.clone(), PathBuf::from);
    let master_key_path = std::env::var_os("ADMIN_MASTER_KEY_PATH")
        .map_or(defaults.admin_master_key_path.clone(), PathBuf::from);
    let valid_days: i64 = std::env::var("VALID_DAYS").map_or(Ok(365), |v| v.parse())?;

    let issuer = AdminKeyIssuer::new(
        SecretStore::load(admin_secret_path)?.into(),
        SecretStore::load(master_key_path)?.into(),
        SessionCodec::new(defaults.issuer, defaults.leeway_seconds),
    );
    let key = issuer.mint(Utc::now() + Duration::days(valid_days))?;

    println!("{key}");
    Ok(())
}
