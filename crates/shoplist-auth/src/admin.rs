//! Long-lived admin API keys.
//!
//! An admin key is a JWT signed with its own secret (never the session
//! secret). Two checks gate it beyond the signature: the `admin` claim must be
//! `true`, and the embedded `key` claim must equal the value of a separate
//! master-key file held on the server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::claims::SessionCodec;
use crate::error::{AuthError, Result};
use crate::fingerprint;
use crate::secret::SecretStore;

/// Claims carried by an admin key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Must match the master key file.
    pub key: String,
    /// Must be `true`.
    #[serde(default)]
    pub admin: bool,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// The key's `ValidUntil` (unix seconds).
    pub exp: i64,
    /// Issuer.
    pub iss: String,
}

/// Verifies admin keys presented on admin routes.
pub struct AdminKeyVerifier {
    admin_secret: Arc<SecretStore>,
    master_key: Arc<SecretStore>,
    codec: SessionCodec,
}

impl AdminKeyVerifier {
    /// Create a verifier from the admin signing secret and the master key.
    #[must_use]
    pub fn new(admin_secret: Arc<SecretStore>, master_key: Arc<SecretStore>, codec: SessionCodec) -> Self {
        Self {
            admin_secret,
            master_key,
            codec,
        }
    }

    /// Verify a raw admin key header value.
    ///
    /// # Errors
    ///
    /// - `MissingToken` if the header is absent or blank
    /// - `InvalidAdminKey` if the key does not parse, is not HMAC-signed, or
    ///   fails signature or expiry checks
    /// - `SecretExpired` if the admin secret or master key is past its window
    /// - `InsufficientPrivilege` if `admin` is not `true`
    /// - `KeyMismatch` if the embedded key differs from the master key
    pub fn verify(&self, raw: Option<&str>) -> Result<AdminClaims> {
        let token = raw.map(str::trim).filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;

        SessionCodec::check_algorithm(token).map_err(|e| AuthError::InvalidAdminKey(e.to_string()))?;

        let secret = self.admin_secret.current()?;
        let claims: AdminClaims = self
            .codec
            .decode(token, &secret, &["exp", "iss"])
            .map_err(|e| AuthError::InvalidAdminKey(e.to_string()))?;

        if !claims.admin {
            return Err(AuthError::InsufficientPrivilege);
        }

        let master = self.master_key.current()?;
        if !bool::from(claims.key.as_bytes().ct_eq(master.as_bytes())) {
            return Err(AuthError::KeyMismatch);
        }

        tracing::debug!(key = %fingerprint(token), "Admin key accepted");
        Ok(claims)
    }
}

/// Mints admin keys for operators.
pub struct AdminKeyIssuer {
    admin_secret: Arc<SecretStore>,
    master_key: Arc<SecretStore>,
    codec: SessionCodec,
}

impl AdminKeyIssuer {
    /// Create an issuer from the admin signing secret and the master key.
    #[must_use]
    pub fn new(admin_secret: Arc<SecretStore>, master_key: Arc<SecretStore>, codec: SessionCodec) -> Self {
        Self {
            admin_secret,
            master_key,
            codec,
        }
    }

    /// Sign an admin key valid until `valid_until`, embedding the master key.
    ///
    /// # Errors
    ///
    /// - `SecretExpired` if either secret is past its window
    /// - `SigningFailure` if encoding fails
    pub fn mint(&self, valid_until: DateTime<Utc>) -> Result<String> {
        let secret = self.admin_secret.current()?;
        let master = self.master_key.current()?;

        let claims = AdminClaims {
            key: master.secret,
            admin: true,
            iat: Utc::now().timestamp(),
            exp: valid_until.timestamp(),
            iss: self.codec.issuer().to_string(),
        };
        let token = self.codec.encode(&claims, &secret)?;
        tracing::info!(key = %fingerprint(&token), %valid_until, "Minted admin key");
        Ok(token)
    }
}
