//! Token claims and the HMAC codec.
//!
//! Every token this server signs uses HS256. Decoding accepts the whole HMAC
//! family and nothing else: the header's `alg` is checked before any key
//! material is touched, so an `RS256`/`ES256`/`none` header can never be
//! verified against the shared secret.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shoplist_core::{Identity, UserId};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::secret::Secret;

/// Algorithm used when signing.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted when verifying.
pub const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a decimal string.
    pub sub: String,
    /// Username at issuance time.
    pub username: String,
    /// Always `false` for login tokens.
    #[serde(default)]
    pub admin: bool,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Not before (unix seconds).
    pub nbf: i64,
    /// Expires at (unix seconds); always `nbf + timeout`.
    pub exp: i64,
    /// Issuer.
    pub iss: String,
    /// Unique token id, so repeated logins yield distinct tokens.
    pub jti: String,
}

impl Claims {
    /// Build claims for `identity`, valid from `now` for `timeout`.
    #[must_use]
    pub fn new(
        identity: &Identity,
        admin: bool,
        issuer: &str,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Self {
        let nbf = now.timestamp();
        Self {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            admin,
            iat: nbf,
            nbf,
            exp: nbf.saturating_add(timeout.num_seconds()),
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Parse the subject into a user id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if `sub` is not a valid id.
    pub fn user_id(&self) -> Result<UserId> {
        self.sub
            .parse()
            .map_err(|e| AuthError::MalformedToken(format!("sub: {e}")))
    }

    /// When the token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Returns `true` for HS256, HS384 and HS512.
#[must_use]
pub fn is_hmac(alg: Algorithm) -> bool {
    HMAC_ALGORITHMS.contains(&alg)
}

/// Encodes and decodes HMAC-signed tokens for one issuer.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    issuer: String,
    leeway_seconds: u64,
}

impl SessionCodec {
    /// Create a codec.
    #[must_use]
    pub fn new(issuer: impl Into<String>, leeway_seconds: u64) -> Self {
        Self {
            issuer: issuer.into(),
            leeway_seconds,
        }
    }

    /// The issuer stamped into and required from tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `claims` with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SigningFailure` if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T, secret: &Secret) -> Result<String> {
        encode(
            &Header::new(SIGNING_ALGORITHM),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::SigningFailure(e.to_string()))
    }

    /// Parse the header and require an HMAC algorithm.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` if the header cannot be parsed
    /// - `InvalidSignatureAlgorithm` if `alg` is not HMAC
    pub fn check_algorithm(token: &str) -> Result<Algorithm> {
        let header =
            decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        if !is_hmac(header.alg) {
            return Err(AuthError::InvalidSignatureAlgorithm(format!(
                "{:?}",
                header.alg
            )));
        }
        Ok(header.alg)
    }

    /// Verify a session token's signature and temporal claims.
    ///
    /// # Errors
    ///
    /// See [`SessionCodec::decode`].
    pub fn decode_session(&self, token: &str, secret: &Secret) -> Result<Claims> {
        self.decode(token, secret, &["exp", "nbf", "iss", "sub"])
    }

    /// Verify a token's algorithm, signature, issuer, and `exp`/`nbf`.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` / `InvalidSignatureAlgorithm` from the header check
    /// - `BadSignature` if the signature does not match `secret`
    /// - `TokenExpired` / `TokenNotYetValid` for temporal claims
    /// - `MalformedToken` for missing claims or a wrong issuer
    pub fn decode<T: DeserializeOwned>(
        &self,
        token: &str,
        secret: &Secret,
        required_claims: &[&str],
    ) -> Result<T> {
        Self::check_algorithm(token)?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = required_claims.contains(&"nbf");
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(required_claims);

        decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignatureAlgorithm(e.to_string())
                }
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::*;
    use chrono::Duration;

    fn secret(value: &str) -> Secret {
        Secret::new(value, Utc::now() + Duration::days(1))
    }

    fn identity() -> Identity {
        Identity::new(UserId::new(7).unwrap(), "grace")
    }

    fn codec() -> SessionCodec {
        SessionCodec::new("shopping-list-server", 0)
    }

    /// Assemble a token with an arbitrary header and no valid signature.
    fn forge(header: &serde_json::Value, claims: &Claims) -> String {
        let h = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap());
        let c = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{h}.{c}.c2lnbmF0dXJl")
    }

    #[test]
    fn claims_window_matches_timeout() {
        let now = Utc::now();
        let claims = Claims::new(&identity(), false, "iss", now, Duration::minutes(15));

        assert_eq!(claims.nbf, now.timestamp());
        assert_eq!(claims.exp, claims.nbf + 900);
        assert_eq!(claims.sub, "7");
        assert!(!claims.admin);
        assert_eq!(claims.user_id().unwrap(), identity().user_id);
    }

    #[test]
    fn claims_are_unique_per_issue() {
        let now = Utc::now();
        let a = Claims::new(&identity(), false, "iss", now, Duration::minutes(1));
        let b = Claims::new(&identity(), false, "iss", now, Duration::minutes(1));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn encode_then_decode() {
        let codec = codec();
        let secret = secret("k1");
        let claims = Claims::new(&identity(), false, codec.issuer(), Utc::now(), Duration::minutes(5));

        let token = codec.encode(&claims, &secret).unwrap();
        assert_eq!(codec.decode_session(&token, &secret).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let codec = codec();
        let claims = Claims::new(&identity(), false, codec.issuer(), Utc::now(), Duration::minutes(5));
        let token = codec.encode(&claims, &secret("k1")).unwrap();

        assert!(matches!(
            codec.decode_session(&token, &secret("k2")),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn expired_and_immature_tokens() {
        let codec = codec();
        let secret = secret("k1");

        let past = Utc::now() - Duration::hours(2);
        let expired = Claims::new(&identity(), false, codec.issuer(), past, Duration::minutes(5));
        let token = codec.encode(&expired, &secret).unwrap();
        assert!(matches!(
            codec.decode_session(&token, &secret),
            Err(AuthError::TokenExpired)
        ));

        let future = Utc::now() + Duration::hours(2);
        let immature = Claims::new(&identity(), false, codec.issuer(), future, Duration::minutes(5));
        let token = codec.encode(&immature, &secret).unwrap();
        assert!(matches!(
            codec.decode_session(&token, &secret),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn foreign_issuer_rejected() {
        let codec = codec();
        let secret = secret("k1");
        let claims = Claims::new(&identity(), false, "someone-else", Utc::now(), Duration::minutes(5));
        let token = codec.encode(&claims, &secret).unwrap();

        assert!(matches!(
            codec.decode_session(&token, &secret),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn asymmetric_and_none_algorithms_rejected() {
        let claims = Claims::new(&identity(), false, "shopping-list-server", Utc::now(), Duration::minutes(5));

        for alg in ["RS256", "ES256", "EdDSA"] {
            let token = forge(&serde_json::json!({ "alg": alg, "typ": "JWT" }), &claims);
            assert!(
                matches!(
                    SessionCodec::check_algorithm(&token),
                    Err(AuthError::InvalidSignatureAlgorithm(_))
                ),
                "{alg} accepted"
            );
        }

        let none = forge(&serde_json::json!({ "alg": "none" }), &claims);
        assert!(SessionCodec::check_algorithm(&none).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            SessionCodec::check_algorithm("not-a-token"),
            Err(AuthError::MalformedToken(_))
        ));
    }
}
