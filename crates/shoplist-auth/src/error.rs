//! Authentication error types.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use shoplist_core::UserId;
use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication.
///
/// The `Display` text is meant for logs. Clients only ever see the generic
/// message chosen by the HTTP layer from [`AuthError::http_status_code`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("missing token")]
    MissingToken,

    /// The credential is not a well-formed token.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token header names a non-HMAC algorithm.
    #[error("invalid signature algorithm: {0}")]
    InvalidSignatureAlgorithm(String),

    /// The token signature does not match the current secret.
    #[error("bad signature")]
    BadSignature,

    /// The signing secret is past its validity window.
    #[error("secret expired at {0}")]
    SecretExpired(DateTime<Utc>),

    /// The token's `exp` claim has passed.
    #[error("token expired")]
    TokenExpired,

    /// The token's `nbf` claim is in the future.
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// The token subject does not exist in the user directory.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// The directory's username for the subject differs from the claimed one.
    #[error("identity mismatch for user {user_id}")]
    IdentityMismatch {
        /// The subject of the token.
        user_id: UserId,
    },

    /// The token verifies but is not in the issued-token ledger.
    #[error("token not issued by this server")]
    TokenNotIssuedByServer,

    /// The admin key failed parsing or signature verification.
    #[error("invalid admin key: {0}")]
    InvalidAdminKey(String),

    /// The admin key does not carry `admin: true`.
    #[error("insufficient privilege")]
    InsufficientPrivilege,

    /// The admin key's embedded key does not match the master key.
    #[error("admin key mismatch")]
    KeyMismatch,

    /// The caller's address is not on the allow-list.
    #[error("ip not allowed: {0}")]
    IpNotAllowed(IpAddr),

    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A secret file was missing (a placeholder has been written) or still
    /// holds the placeholder value.
    #[error("secret file {} must be provisioned before serving", .0.display())]
    SecretNotProvisioned(PathBuf),

    /// A secret file could not be read or parsed.
    #[error("secret file error: {0}")]
    SecretFile(String),

    /// The IP allow-list could not be loaded.
    #[error("ip allow-list error: {0}")]
    AllowList(String),

    /// The token ledger could not be read or written.
    #[error("token ledger error: {0}")]
    Ledger(String),

    /// Encoding a token failed.
    #[error("signing failure: {0}")]
    SigningFailure(String),

    /// A password could not be hashed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// The identity handed to the issuer is unusable.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The user directory returned an error.
    #[error("user directory error: {0}")]
    Directory(String),
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingToken
            | Self::MalformedToken(_)
            | Self::InvalidSignatureAlgorithm(_)
            | Self::BadSignature
            | Self::SecretExpired(_)
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::UnknownUser(_)
            | Self::IdentityMismatch { .. }
            | Self::TokenNotIssuedByServer
            | Self::InvalidAdminKey(_)
            | Self::InvalidCredentials => 401,
            Self::InsufficientPrivilege | Self::KeyMismatch | Self::IpNotAllowed(_) => 403,
            Self::SecretNotProvisioned(_)
            | Self::SecretFile(_)
            | Self::AllowList(_)
            | Self::Ledger(_)
            | Self::SigningFailure(_)
            | Self::PasswordHash(_)
            | Self::InvalidIdentity(_)
            | Self::Directory(_) => 500,
        }
    }

    /// A stable, machine-friendly name for this error, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidSignatureAlgorithm(_) => "invalid_signature_algorithm",
            Self::BadSignature => "bad_signature",
            Self::SecretExpired(_) => "secret_expired",
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::UnknownUser(_) => "unknown_user",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::TokenNotIssuedByServer => "token_not_issued_by_server",
            Self::InvalidAdminKey(_) => "invalid_admin_key",
            Self::InsufficientPrivilege => "insufficient_privilege",
            Self::KeyMismatch => "key_mismatch",
            Self::IpNotAllowed(_) => "ip_not_allowed",
            Self::InvalidCredentials => "invalid_credentials",
            Self::SecretNotProvisioned(_) => "secret_not_provisioned",
            Self::SecretFile(_) => "secret_file",
            Self::AllowList(_) => "allow_list",
            Self::Ledger(_) => "ledger",
            Self::SigningFailure(_) => "signing_failure",
            Self::PasswordHash(_) => "password_hash",
            Self::InvalidIdentity(_) => "invalid_identity",
            Self::Directory(_) => "directory",
        }
    }

    /// Returns `true` for operator-side faults rather than a bad credential.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.http_status_code() >= 500
    }
}

impl From<shoplist_store::StoreError> for AuthError {
    fn from(err: shoplist_store::StoreError) -> Self {
        Self::Directory(err.to_string())
    }
}
