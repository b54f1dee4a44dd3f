//! Session token issuance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shoplist_core::Identity;

use crate::claims::{Claims, SessionCodec};
use crate::error::{AuthError, Result};
use crate::fingerprint;
use crate::ledger::TokenLedger;
use crate::secret::SecretStore;

/// A freshly signed token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact JWT.
    pub token: String,
    /// The signed claims.
    pub claims: Claims,
}

impl IssuedToken {
    /// When the token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }
}

/// Mints session tokens and records them in the ledger.
///
/// Callers must have verified the user's credentials already. Every call
/// produces a new, independently valid token; concurrent sessions for one
/// user are allowed.
pub struct TokenIssuer {
    secrets: Arc<SecretStore>,
    ledger: Arc<TokenLedger>,
    codec: SessionCodec,
    timeout: chrono::Duration,
}

impl TokenIssuer {
    /// Create an issuer.
    #[must_use]
    pub fn new(
        secrets: Arc<SecretStore>,
        ledger: Arc<TokenLedger>,
        codec: SessionCodec,
        timeout: chrono::Duration,
    ) -> Self {
        Self {
            secrets,
            ledger,
            codec,
            timeout,
        }
    }

    /// Issue a login token for `identity`.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentity` if the username is empty
    /// - `SecretExpired` if the signing secret is past its window
    /// - `SigningFailure` if encoding fails
    /// - `Ledger` if the token cannot be recorded
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken> {
        self.issue_with_admin(identity, false)
    }

    /// Issue a token with an explicit `admin` claim.
    ///
    /// # Errors
    ///
    /// Same as [`TokenIssuer::issue`].
    pub fn issue_with_admin(&self, identity: &Identity, admin: bool) -> Result<IssuedToken> {
        if identity.username.is_empty() {
            return Err(AuthError::InvalidIdentity("empty username".to_string()));
        }

        let secret = self.secrets.current()?;
        let claims = Claims::new(identity, admin, self.codec.issuer(), Utc::now(), self.timeout);

        let token = self.codec.encode(&claims, &secret).inspect_err(|e| {
            tracing::error!(error = %e, user_id = %identity.user_id, "Token signing failed");
        })?;
        self.ledger.append(&token)?;

        tracing::info!(
            user_id = %identity.user_id,
            username = %identity.username,
            token = %fingerprint(&token),
            expires_at = claims.exp,
            "Issued session token"
        );
        Ok(IssuedToken { token, claims })
    }
}
