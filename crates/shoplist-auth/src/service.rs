//! Wiring for the authentication core.

use std::sync::Arc;

use shoplist_store::UserDirectory;

use crate::admin::{AdminKeyIssuer, AdminKeyVerifier};
use crate::allowlist::IpAllowList;
use crate::claims::SessionCodec;
use crate::error::Result;
use crate::issuer::{IssuedToken, TokenIssuer};
use crate::ledger::{Compaction, TokenLedger};
use crate::password::{reject_unknown_user, verify_password};
use crate::secret::SecretStore;
use crate::verifier::TokenVerifier;
use crate::AuthConfig;

/// Every authentication component, built from one [`AuthConfig`].
pub struct AuthService<D: UserDirectory> {
    secrets: Arc<SecretStore>,
    admin_secret: Arc<SecretStore>,
    master_key: Arc<SecretStore>,
    ledger: Arc<TokenLedger>,
    directory: Arc<D>,
    codec: SessionCodec,
    issuer: TokenIssuer,
    verifier: TokenVerifier<D>,
    admin: AdminKeyVerifier,
    allowlist: IpAllowList,
}

impl<D: UserDirectory> AuthService<D> {
    /// Load secrets, the allow-list and the ledger, refusing to start on any
    /// unusable file.
    ///
    /// All three secret files are checked before failing, so a first run
    /// writes every missing placeholder at once.
    ///
    /// # Errors
    ///
    /// - `SecretNotProvisioned` / `SecretFile` for a missing or bad secret file
    /// - `SecretExpired` if any secret is already past its window
    /// - `AllowList` for a missing or malformed allow-list
    /// - `Ledger` if the ledger cannot be read or compacted
    pub fn load(config: &AuthConfig, directory: Arc<D>) -> Result<Self> {
        let secrets = SecretStore::load(&config.secret_path);
        let admin_secret = SecretStore::load(&config.admin_secret_path);
        let master_key = SecretStore::load(&config.admin_master_key_path);
        let secrets = Arc::new(secrets?);
        let admin_secret = Arc::new(admin_secret?);
        let master_key = Arc::new(master_key?);

        for store in [&secrets, &admin_secret, &master_key] {
            store.current()?;
        }

        let allowlist = IpAllowList::load(&config.ip_whitelist_path)?;

        let codec = SessionCodec::new(config.issuer.clone(), config.leeway_seconds);
        let ledger = Arc::new(TokenLedger::open_verified(
            &config.ledger_path,
            &secrets,
            &codec,
        )?);

        let issuer = TokenIssuer::new(
            Arc::clone(&secrets),
            Arc::clone(&ledger),
            codec.clone(),
            config.token_timeout_chrono(),
        );
        let verifier = TokenVerifier::new(
            Arc::clone(&secrets),
            Arc::clone(&ledger),
            Arc::clone(&directory),
            codec.clone(),
            config.bearer_mode,
        );
        let admin = AdminKeyVerifier::new(
            Arc::clone(&admin_secret),
            Arc::clone(&master_key),
            codec.clone(),
        );

        tracing::info!(
            issuer = %config.issuer,
            timeout_secs = config.token_timeout.as_secs(),
            bearer_mode = ?config.bearer_mode,
            secret_valid_until = %secrets.valid_until(),
            tracked_tokens = ledger.len(),
            "Authentication ready"
        );

        Ok(Self {
            secrets,
            admin_secret,
            master_key,
            ledger,
            directory,
            codec,
            issuer,
            verifier,
            admin,
            allowlist,
        })
    }

    /// Check a username and password, then issue a session token.
    ///
    /// Unknown users and wrong passwords both yield `InvalidCredentials`,
    /// and both pay for one Argon2 verification.
    ///
    /// A failure to record the login time is logged; the issued token is
    /// still returned.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, a directory lookup error, or any error from
    /// [`TokenIssuer::issue`].
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let Some(user) = self.directory.get_user_by_username(username)? else {
            return Err(reject_unknown_user(password));
        };
        verify_password(password, &user.password_hash)?;

        let issued = self.issuer.issue(&user.identity())?;
        if let Err(e) = self.directory.update_last_login(user.id) {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record login time");
        }
        Ok(issued)
    }

    /// Re-verify every ledger entry against the current secret.
    ///
    /// # Errors
    ///
    /// `SecretExpired` (the ledger is left untouched) or `Ledger`.
    pub fn compact_ledger(&self) -> Result<Compaction> {
        self.ledger.compact_verified(&self.secrets, &self.codec)
    }

    /// Re-read all three secret files.
    ///
    /// Each store keeps its previous value if its file fails to load.
    ///
    /// # Errors
    ///
    /// The first load error encountered.
    pub fn reload_secrets(&self) -> Result<()> {
        let results = [
            self.secrets.reload(),
            self.admin_secret.reload(),
            self.master_key.reload(),
        ];
        results.into_iter().collect()
    }

    /// The session token issuer.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// The session token verifier.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier<D> {
        &self.verifier
    }

    /// The admin key verifier.
    #[must_use]
    pub fn admin(&self) -> &AdminKeyVerifier {
        &self.admin
    }

    /// An issuer for admin keys, sharing this service's secrets.
    #[must_use]
    pub fn admin_key_issuer(&self) -> AdminKeyIssuer {
        AdminKeyIssuer::new(
            Arc::clone(&self.admin_secret),
            Arc::clone(&self.master_key),
            self.codec.clone(),
        )
    }

    /// The account-creation allow-list.
    #[must_use]
    pub fn allowlist(&self) -> &IpAllowList {
        &self.allowlist
    }

    /// The session secret.
    #[must_use]
    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    /// The issued-token ledger.
    #[must_use]
    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// The user directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }
}
