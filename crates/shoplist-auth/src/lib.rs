//! Session tokens, admin keys, and origin checks for the shopping list server.
//!
//! This crate owns every security decision the HTTP layer delegates:
//!
//! - [`SecretStore`]: the on-disk HMAC secret and its validity window
//! - [`TokenLedger`]: the durable set of tokens this server has issued
//! - [`TokenIssuer`] / [`TokenVerifier`]: minting and checking session tokens
//! - [`AdminKeyVerifier`]: the long-lived admin API key with a master-key check
//! - [`IpAllowList`]: origins permitted to create accounts
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│  TokenVerifier   │────▶│  UserDirectory   │
//! │   middleware     │     │                  │     │  (store crate)   │
//! └───────┬──────────┘     └───┬──────────┬───┘     └──────────────────┘
//!         │                    │          │
//!         │           ┌────────▼───┐  ┌───▼──────────┐
//!         │           │ SecretStore│  │ TokenLedger  │
//!         │           │ (file)     │  │ (file)       │
//!         │           └────────▲───┘  └───▲──────────┘
//!         │                    │          │
//!         │           ┌────────┴──────────┴───┐
//!         └──────────▶│      TokenIssuer      │
//!            login    └───────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shoplist_auth::{AuthConfig, AuthService};
//! use shoplist_core::{Identity, UserId};
//! use shoplist_store::RocksDirectory;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Arc::new(RocksDirectory::open("/tmp/shoplist-users")?);
//! let auth = AuthService::load(&AuthConfig::default(), directory)?;
//!
//! let user = Identity::new(UserId::new(1)?, "alice");
//! let issued = auth.issuer().issue(&user)?;
//!
//! let header = format!("Bearer {}", issued.token);
//! let identity = auth.verifier().verify_header(Some(&header))?;
//! assert_eq!(identity, user);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod admin;
pub mod allowlist;
pub mod claims;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod password;
pub mod secret;
pub mod service;
pub mod verifier;

pub use admin::{AdminClaims, AdminKeyIssuer, AdminKeyVerifier};
pub use allowlist::IpAllowList;
pub use claims::{Claims, SessionCodec};
pub use error::{AuthError, Result};
pub use issuer::{IssuedToken, TokenIssuer};
pub use ledger::{Compaction, TokenLedger};
pub use password::{hash_password, verify_password};
pub use secret::{Secret, SecretStore};
pub use service::AuthService;
pub use verifier::{extract_bearer, TokenVerifier};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Issuer claim stamped into every token this server signs.
pub const DEFAULT_ISSUER: &str = "shopping-list-server";

/// How strictly the `Authorization` header is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BearerMode {
    /// Only `Bearer <token>` is accepted.
    #[default]
    Strict,
    /// A bare `<token>` without the scheme is also accepted.
    Lenient,
}

impl FromStr for BearerMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown bearer mode: {other}")),
        }
    }
}

/// Configuration for the authentication core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Value of the `iss` claim.
    pub issuer: String,
    /// Lifetime of a session token.
    pub token_timeout: Duration,
    /// Clock skew tolerated on `exp` and `nbf`, in seconds.
    pub leeway_seconds: u64,
    /// Parsing mode for the `Authorization` header.
    pub bearer_mode: BearerMode,
    /// Session signing secret (`{"Secret", "ValidUntil"}`).
    pub secret_path: PathBuf,
    /// Admin key signing secret, same shape as the session secret.
    pub admin_secret_path: PathBuf,
    /// Master key compared against the admin key's `key` claim.
    pub admin_master_key_path: PathBuf,
    /// Newline-delimited issued-token ledger.
    pub ledger_path: PathBuf,
    /// JSON array of allowed IPs and `/16` prefixes.
    pub ip_whitelist_path: PathBuf,
}

impl AuthConfig {
    /// Build a configuration with every file placed under `dir`.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            secret_path: dir.join("secret.json"),
            admin_secret_path: dir.join("admin_secret.json"),
            admin_master_key_path: dir.join("admin_master_key.json"),
            ledger_path: dir.join("tokens.txt"),
            ip_whitelist_path: dir.join("ip_whitelist.json"),
            ..Self::default()
        }
    }

    /// Get the token timeout as a `chrono` duration.
    #[must_use]
    pub fn token_timeout_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.token_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            token_timeout: Duration::from_secs(15 * 60),
            leeway_seconds: 0,
            bearer_mode: BearerMode::Strict,
            secret_path: PathBuf::from("secret.json"),
            admin_secret_path: PathBuf::from("admin_secret.json"),
            admin_master_key_path: PathBuf::from("admin_master_key.json"),
            ledger_path: PathBuf::from("tokens.txt"),
            ip_whitelist_path: PathBuf::from("ip_whitelist.json"),
        }
    }
}

/// Short, non-reversible identifier for a token, safe to log.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let hash = blake3::hash(token.as_bytes());
    hash.to_hex().as_str()[..16].to_string()
}
