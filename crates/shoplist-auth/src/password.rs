//! Argon2id password hashing.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{AuthError, Result};

/// Hash `password` into a PHC string with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check `password` against a stored PHC string.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on a mismatch or an unreadable hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        tracing::warn!(error = %e, "Stored password hash is unreadable");
        AuthError::InvalidCredentials
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Hash checked when the username is unknown, built on first use.
static UNKNOWN_USER_HASH: OnceLock<String> = OnceLock::new();

/// Spend the same Argon2 work as [`verify_password`] on an account that does
/// not exist. Returns the `InvalidCredentials` error to report.
#[must_use]
pub fn reject_unknown_user(password: &str) -> AuthError {
    let hash = UNKNOWN_USER_HASH
        .get_or_init(|| hash_password("unknown-user").unwrap_or_default());
    // Even a match is rejected: the account does not exist.
    let _ = verify_password(password, hash);
    AuthError::InvalidCredentials
}

/// Whether [`reject_unknown_user`] has built its hash yet.
#[cfg(test)]
pub(crate) fn unknown_user_hash_ready() -> bool {
    UNKNOWN_USER_HASH.get().is_some_and(|h| h.starts_with("$argon2id$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn unreadable_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("pw", "plaintext"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn unknown_user_still_runs_argon2() {
        assert!(matches!(
            reject_unknown_user("unknown-user"),
            AuthError::InvalidCredentials
        ));
        assert!(unknown_user_hash_ready());
    }
}
