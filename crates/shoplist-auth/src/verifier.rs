//! Session token verification.
//!
//! Verification runs these checks in order and stops at the first failure:
//!
//! 1. extract the token from the `Authorization` header
//! 2. require an HMAC algorithm in the token header
//! 3. require an unexpired secret, then check the signature
//! 4. check `nbf` and `exp`
//! 5. resolve the subject in the user directory and compare usernames
//! 6. require the exact token string to be in the ledger

use std::sync::Arc;

use shoplist_core::Identity;
use shoplist_store::UserDirectory;

use crate::claims::SessionCodec;
use crate::error::{AuthError, Result};
use crate::ledger::TokenLedger;
use crate::secret::SecretStore;
use crate::{fingerprint, BearerMode};

/// Pull the token out of an `Authorization` header value.
///
/// # Errors
///
/// - `MissingToken` if the header is absent or blank
/// - `MalformedToken` if the value is not `Bearer <token>` (or, in lenient
///   mode, a single bare token)
pub fn extract_bearer(header: Option<&str>, mode: BearerMode) -> Result<&str> {
    let value = header.map(str::trim).filter(|v| !v.is_empty());
    let value = value.ok_or(AuthError::MissingToken)?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match (parts.as_slice(), mode) {
        ([scheme, token], _) if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        ([token], BearerMode::Lenient) if !token.eq_ignore_ascii_case("bearer") => Ok(*token),
        _ => Err(AuthError::MalformedToken(
            "expected `Bearer <token>`".to_string(),
        )),
    }
}

/// Decides whether a bearer token is a live session for a real user.
pub struct TokenVerifier<D: UserDirectory> {
    secrets: Arc<SecretStore>,
    ledger: Arc<TokenLedger>,
    directory: Arc<D>,
    codec: SessionCodec,
    bearer_mode: BearerMode,
}

impl<D: UserDirectory> TokenVerifier<D> {
    /// Create a verifier.
    #[must_use]
    pub fn new(
        secrets: Arc<SecretStore>,
        ledger: Arc<TokenLedger>,
        directory: Arc<D>,
        codec: SessionCodec,
        bearer_mode: BearerMode,
    ) -> Self {
        Self {
            secrets,
            ledger,
            directory,
            codec,
            bearer_mode,
        }
    }

    /// Verify the raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Any error from [`extract_bearer`] or [`TokenVerifier::verify`].
    pub fn verify_header(&self, header: Option<&str>) -> Result<Identity> {
        let token = extract_bearer(header, self.bearer_mode)?;
        self.verify(token)
    }

    /// Verify a bare token string.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` / `InvalidSignatureAlgorithm` for header problems
    /// - `SecretExpired` if the secret is past its window
    /// - `BadSignature`, `TokenExpired`, `TokenNotYetValid` from decoding
    /// - `UnknownUser` / `IdentityMismatch` from the directory check
    /// - `TokenNotIssuedByServer` if the ledger has no record of the token
    /// - `Directory` / `Ledger` for backend failures
    pub fn verify(&self, token: &str) -> Result<Identity> {
        SessionCodec::check_algorithm(token)?;

        let secret = self.secrets.current()?;
        let claims = self.codec.decode_session(token, &secret)?;
        let user_id = claims.user_id()?;

        let user = self
            .directory
            .get_user(user_id)?
            .ok_or(AuthError::UnknownUser(user_id))?;
        if user.username != claims.username {
            return Err(AuthError::IdentityMismatch { user_id });
        }

        if !self.ledger.contains(token)? {
            tracing::warn!(
                user_id = %user_id,
                token = %fingerprint(token),
                "Validly signed token is not in the ledger"
            );
            return Err(AuthError::TokenNotIssuedByServer);
        }

        Ok(user.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Claims;
    use crate::issuer::TokenIssuer;
    use crate::testutil::{write_secret, write_secret_until};
    use chrono::{Duration, Utc};
    use shoplist_store::MemoryDirectory;
    use tempfile::TempDir;

    const ISSUER: &str = "shopping-list-server";

    struct Fixture {
        _dir: TempDir,
        secrets: Arc<SecretStore>,
        ledger: Arc<TokenLedger>,
        directory: Arc<MemoryDirectory>,
        issuer: TokenIssuer,
        verifier: TokenVerifier<MemoryDirectory>,
    }

    fn fixture_with(mode: BearerMode) -> Fixture {
        let dir = TempDir::new().unwrap();
        let secrets = Arc::new(SecretStore::load(write_secret(dir.path(), "secret.json", "current")).unwrap());
        let ledger = Arc::new(TokenLedger::open(dir.path().join("tokens.txt"), |_| true).unwrap());
        let directory = Arc::new(MemoryDirectory::new());
        let codec = SessionCodec::new(ISSUER, 0);

        let issuer = TokenIssuer::new(
            Arc::clone(&secrets),
            Arc::clone(&ledger),
            codec.clone(),
            Duration::minutes(10),
        );
        let verifier = TokenVerifier::new(
            Arc::clone(&secrets),
            Arc::clone(&ledger),
            Arc::clone(&directory),
            codec,
            mode,
        );

        Fixture {
            _dir: dir,
            secrets,
            ledger,
            directory,
            issuer,
            verifier,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(BearerMode::Strict)
    }

    impl Fixture {
        fn user(&self, name: &str) -> Identity {
            self.directory.create_user(name, "hash").unwrap().identity()
        }

        /// Sign claims out-of-band, bypassing the issuer and the ledger.
        fn sign(&self, claims: &Claims, secret_value: &str) -> String {
            let secret = crate::secret::Secret::new(secret_value, Utc::now() + Duration::days(1));
            SessionCodec::new(ISSUER, 0).encode(claims, &secret).unwrap()
        }
    }

    #[test]
    fn issued_token_roundtrips_identity() {
        let f = fixture();
        for name in ["alice", "bob", "carol"] {
            let identity = f.user(name);
            let issued = f.issuer.issue(&identity).unwrap();

            let header = format!("Bearer {}", issued.token);
            assert_eq!(f.verifier.verify_header(Some(&header)).unwrap(), identity);
        }
    }

    #[test]
    fn missing_header() {
        let f = fixture();
        assert!(matches!(
            f.verifier.verify_header(None),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            f.verifier.verify_header(Some("   ")),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn strict_mode_requires_scheme() {
        let f = fixture();
        let issued = f.issuer.issue(&f.user("alice")).unwrap();

        assert!(matches!(
            f.verifier.verify_header(Some(&issued.token)),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            f.verifier.verify_header(Some(&format!("Token {}", issued.token))),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn lenient_mode_accepts_bare_token() {
        let f = fixture_with(BearerMode::Lenient);
        let identity = f.user("alice");
        let issued = f.issuer.issue(&identity).unwrap();

        assert_eq!(
            f.verifier.verify_header(Some(&issued.token)).unwrap(),
            identity
        );
        assert!(f.verifier.verify_header(Some("Bearer")).is_err());
    }

    #[test]
    fn extract_bearer_forms() {
        assert_eq!(extract_bearer(Some("Bearer abc"), BearerMode::Strict).unwrap(), "abc");
        assert_eq!(extract_bearer(Some("bearer   abc "), BearerMode::Strict).unwrap(), "abc");
        assert!(extract_bearer(Some("Bearer a b"), BearerMode::Lenient).is_err());
        assert!(extract_bearer(Some("abc"), BearerMode::Strict).is_err());
        assert_eq!(extract_bearer(Some("abc"), BearerMode::Lenient).unwrap(), "abc");
    }

    #[test]
    fn expired_token_rejected() {
        let f = fixture();
        let identity = f.user("alice");
        let claims = Claims::new(&identity, false, ISSUER, Utc::now() - Duration::hours(1), Duration::minutes(10));
        let token = f.sign(&claims, "current");
        f.ledger.append(&token).unwrap();

        assert!(matches!(f.verifier.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn not_yet_valid_token_rejected() {
        let f = fixture();
        let identity = f.user("alice");
        let claims = Claims::new(&identity, false, ISSUER, Utc::now() + Duration::hours(1), Duration::minutes(10));
        let token = f.sign(&claims, "current");
        f.ledger.append(&token).unwrap();

        assert!(matches!(
            f.verifier.verify(&token),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn foreign_key_is_bad_signature() {
        let f = fixture();
        let identity = f.user("alice");
        let claims = Claims::new(&identity, false, ISSUER, Utc::now(), Duration::minutes(10));
        let token = f.sign(&claims, "some-other-key");

        assert!(matches!(f.verifier.verify(&token), Err(AuthError::BadSignature)));
    }

    #[test]
    fn out_of_band_token_not_in_ledger() {
        let f = fixture();
        let identity = f.user("alice");
        let claims = Claims::new(&identity, false, ISSUER, Utc::now(), Duration::minutes(10));
        let token = f.sign(&claims, "current");

        assert!(matches!(
            f.verifier.verify(&token),
            Err(AuthError::TokenNotIssuedByServer)
        ));
    }

    #[test]
    fn single_character_edits_invalidate_token() {
        let f = fixture();
        let issued = f.issuer.issue(&f.user("alice")).unwrap();
        let original = issued.token.as_bytes();

        for i in 0..original.len() {
            if original[i] == b'.' {
                continue;
            }
            let mut mutated = original.to_vec();
            mutated[i] = if original[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(mutated).unwrap();

            assert!(
                f.verifier.verify(&mutated).is_err(),
                "edit at byte {i} was accepted"
            );
        }

        let sig_start = issued.token.rfind('.').unwrap() + 1;
        let mut mutated = issued.token.clone().into_bytes();
        mutated[sig_start] = if mutated[sig_start] == b'A' { b'B' } else { b'A' };
        assert!(matches!(
            f.verifier.verify(&String::from_utf8(mutated).unwrap()),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn unknown_user_rejected() {
        let f = fixture();
        let identity = f.user("alice");
        let issued = f.issuer.issue(&identity).unwrap();

        f.directory.remove_user(identity.user_id);
        assert!(matches!(
            f.verifier.verify(&issued.token),
            Err(AuthError::UnknownUser(id)) if id == identity.user_id
        ));
    }

    #[test]
    fn renamed_user_is_identity_mismatch() {
        let f = fixture();
        let identity = f.user("alice");
        let issued = f.issuer.issue(&identity).unwrap();

        f.directory.rename_user(identity.user_id, "alicia").unwrap();
        assert!(matches!(
            f.verifier.verify(&issued.token),
            Err(AuthError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn expired_secret_fails_before_signature_check() {
        let f = fixture();
        let identity = f.user("alice");
        let issued = f.issuer.issue(&identity).unwrap();

        write_secret_until(
            f.secrets.path().parent().unwrap(),
            "secret.json",
            "current",
            Utc::now() - Duration::minutes(1),
        );
        f.secrets.reload().unwrap();

        assert!(matches!(
            f.verifier.verify(&issued.token),
            Err(AuthError::SecretExpired(_))
        ));
    }

    #[test]
    fn rotation_invalidates_outstanding_tokens() {
        let f = fixture();
        let identity = f.user("alice");
        let issued = f.issuer.issue(&identity).unwrap();

        write_secret(f.secrets.path().parent().unwrap(), "secret.json", "rotated");
        f.secrets.reload().unwrap();

        assert!(matches!(
            f.verifier.verify(&issued.token),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn subject_must_be_numeric() {
        let f = fixture();
        let mut claims = Claims::new(&f.user("alice"), false, ISSUER, Utc::now(), Duration::minutes(10));
        claims.sub = "alice".to_string();
        let token = f.sign(&claims, "current");

        assert!(matches!(
            f.verifier.verify(&token),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn concurrent_issuance_keeps_every_token() {
        let f = Arc::new(fixture());
        let identities: Vec<_> = (0..16).map(|i| f.user(&format!("user-{i}"))).collect();

        let handles: Vec<_> = identities
            .into_iter()
            .map(|identity| {
                let f = Arc::clone(&f);
                std::thread::spawn(move || f.issuer.issue(&identity).unwrap().token)
            })
            .collect();
        let tokens: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(f.ledger.len(), 16);
        for token in &tokens {
            assert!(f.ledger.contains(token).unwrap());
            assert!(f.verifier.verify(token).is_ok());
        }

        let reopened = TokenLedger::open(f.ledger.path(), |_| true).unwrap();
        assert_eq!(reopened.len(), 16);
    }

    #[test]
    fn startup_compaction_drops_tokens_from_old_secret() {
        let f = fixture();
        let identity = f.user("alice");
        let old = f.issuer.issue(&identity).unwrap();

        write_secret(f.secrets.path().parent().unwrap(), "secret.json", "rotated");
        f.secrets.reload().unwrap();
        let fresh = f.issuer.issue(&identity).unwrap();

        let codec = SessionCodec::new(ISSUER, 0);
        let reopened = TokenLedger::open_verified(f.ledger.path(), &f.secrets, &codec).unwrap();
        assert!(!reopened.contains(&old.token).unwrap());
        assert!(reopened.contains(&fresh.token).unwrap());
        assert_eq!(reopened.len(), 1);
    }
}
