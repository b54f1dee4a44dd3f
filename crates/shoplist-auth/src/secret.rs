//! On-disk signing secrets and their validity window.
//!
//! A secret file is a JSON object `{"Secret": "...", "ValidUntil": "<RFC 3339>"}`.
//! The same shape is used for the session secret, the admin-key secret, and
//! the admin master key.
//!
//! On first run the file does not exist. [`SecretStore::load`] then writes a
//! placeholder valid for three months and fails with
//! [`AuthError::SecretNotProvisioned`]: an operator must replace the value
//! before the server will start.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Months, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Marker written on first run. Never accepted as a real secret.
pub const PLACEHOLDER_SECRET: &str = "REPLACE-ME: generate a long random value for this secret";

/// How long a freshly written placeholder claims to be valid.
const PLACEHOLDER_VALIDITY: Months = Months::new(3);

/// A symmetric secret with an expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Secret {
    /// The raw secret value.
    pub secret: String,
    /// The secret must not be used after this instant.
    pub valid_until: DateTime<Utc>,
}

impl Secret {
    /// Create a secret.
    #[must_use]
    pub fn new(value: impl Into<String>, valid_until: DateTime<Utc>) -> Self {
        Self {
            secret: value.into(),
            valid_until,
        }
    }

    /// The placeholder written when no secret file exists.
    #[must_use]
    pub fn placeholder(now: DateTime<Utc>) -> Self {
        let valid_until = now
            .checked_add_months(PLACEHOLDER_VALIDITY)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(PLACEHOLDER_SECRET, valid_until)
    }

    /// The secret value as bytes, for HMAC keys.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Returns `true` once `now` is past `valid_until`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// Returns `true` if this is the first-run placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.secret == PLACEHOLDER_SECRET
    }

    /// Write the secret file, replacing any existing one via rename.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SecretFile` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| AuthError::SecretFile(format!("encode: {e}")))?;
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, path))
            .map_err(|e| AuthError::SecretFile(format!("{}: {e}", path.display())))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("secret", &"<redacted>")
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

/// Holds one secret loaded from a file.
///
/// Reads are lock-free in practice (an uncontended `RwLock`); only
/// [`SecretStore::reload`] takes the write side.
pub struct SecretStore {
    path: PathBuf,
    secret: RwLock<Secret>,
    /// Set once the expiry has been logged; cleared by a reload.
    expiry_logged: AtomicBool,
}

impl SecretStore {
    /// Load the secret at `path`.
    ///
    /// # Errors
    ///
    /// - `SecretNotProvisioned` if the file was missing (a placeholder has now
    ///   been written) or still holds the placeholder
    /// - `SecretFile` if the file is unreadable, malformed, or empty
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(secret) = read_secret_file(&path)? else {
            provision_placeholder(&path)?;
            return Err(AuthError::SecretNotProvisioned(path));
        };
        tracing::debug!(path = %path.display(), valid_until = %secret.valid_until, "Loaded secret");

        Ok(Self {
            path,
            secret: RwLock::new(secret),
            expiry_logged: AtomicBool::new(false),
        })
    }

    /// The current secret, if it has not expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SecretExpired` once the validity window has passed.
    pub fn current(&self) -> Result<Secret> {
        self.current_at(Utc::now())
    }

    /// Like [`SecretStore::current`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SecretExpired` if `now` is past the validity window.
    pub fn current_at(&self, now: DateTime<Utc>) -> Result<Secret> {
        let secret = self.secret.read();
        if secret.is_expired_at(now) {
            if !self.expiry_logged.swap(true, Ordering::Relaxed) {
                tracing::error!(
                    path = %self.path.display(),
                    valid_until = %secret.valid_until,
                    "Secret has expired; rotate it"
                );
            }
            return Err(AuthError::SecretExpired(secret.valid_until));
        }
        Ok(secret.clone())
    }

    /// Re-read the backing file, replacing the in-memory secret.
    ///
    /// The previous secret stays active if the file cannot be loaded. Never
    /// writes to disk.
    ///
    /// # Errors
    ///
    /// - `SecretFile` if the file is missing, unreadable, malformed, or empty
    /// - `SecretNotProvisioned` if the file holds the placeholder
    pub fn reload(&self) -> Result<()> {
        let secret = read_secret_file(&self.path)?.ok_or_else(|| {
            AuthError::SecretFile(format!("{}: file is missing", self.path.display()))
        })?;
        tracing::info!(path = %self.path.display(), valid_until = %secret.valid_until, "Reloaded secret");
        *self.secret.write() = secret;
        self.expiry_logged.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// End of the current secret's validity window.
    #[must_use]
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.secret.read().valid_until
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("path", &self.path)
            .field("valid_until", &self.valid_until())
            .finish_non_exhaustive()
    }
}

/// Read and validate a secret file. `None` if the file does not exist.
fn read_secret_file(path: &Path) -> Result<Option<Secret>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AuthError::SecretFile(format!("{}: {e}", path.display()))),
    };

    let secret: Secret = serde_json::from_slice(&raw)
        .map_err(|e| AuthError::SecretFile(format!("{}: {e}", path.display())))?;

    if secret.is_placeholder() {
        return Err(AuthError::SecretNotProvisioned(path.to_path_buf()));
    }
    if secret.secret.is_empty() {
        return Err(AuthError::SecretFile(format!(
            "{}: secret value is empty",
            path.display()
        )));
    }
    Ok(Some(secret))
}

/// Write the placeholder with create-new semantics, so racing processes
/// leave exactly one file behind.
fn provision_placeholder(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AuthError::SecretFile(format!("{}: {e}", parent.display())))?;
    }

    let placeholder = Secret::placeholder(Utc::now());
    let json = serde_json::to_vec_pretty(&placeholder)
        .map_err(|e| AuthError::SecretFile(format!("encode: {e}")))?;

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(&json)
                .and_then(|()| file.sync_all())
                .map_err(|e| AuthError::SecretFile(format!("{}: {e}", path.display())))?;
            tracing::error!(
                path = %path.display(),
                valid_until = %placeholder.valid_until,
                "No secret found; wrote a placeholder. Replace its value and restart"
            );
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(AuthError::SecretFile(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_secret, write_secret_until};
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn first_run_writes_placeholder_and_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");

        let result = SecretStore::load(&path);
        assert!(matches!(result, Err(AuthError::SecretNotProvisioned(_))));

        let written: Secret =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(!written.secret.is_empty());
        assert!(written.is_placeholder());

        let days = (written.valid_until - Utc::now()).num_days();
        assert!((88..=92).contains(&days), "validity was {days} days");
    }

    #[test]
    fn placeholder_file_stays_unusable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");

        let _ = SecretStore::load(&path);
        let before = std::fs::read(&path).unwrap();

        let result = SecretStore::load(&path);
        assert!(matches!(result, Err(AuthError::SecretNotProvisioned(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn file_uses_pascal_case_fields() {
        let secret = Secret::new("s3cret", Utc::now());
        let json = serde_json::to_value(&secret).unwrap();
        assert_eq!(json["Secret"], "s3cret");
        assert!(json["ValidUntil"].is_string());
    }

    #[test]
    fn loads_provisioned_secret() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "hunter2");

        let store = SecretStore::load(&path).unwrap();
        assert_eq!(store.current().unwrap().as_bytes(), b"hunter2");
        assert_eq!(store.path(), path);
    }

    #[test]
    fn expired_secret_fails_closed() {
        let dir = TempDir::new().unwrap();
        let valid_until = Utc::now() - Duration::minutes(1);
        let path = write_secret_until(dir.path(), "secret.json", "old", valid_until);

        let store = SecretStore::load(&path).unwrap();
        assert!(matches!(store.current(), Err(AuthError::SecretExpired(_))));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "edge");
        let store = SecretStore::load(&path).unwrap();
        let until = store.valid_until();

        assert!(store.current_at(until).is_ok());
        assert!(store
            .current_at(until + Duration::seconds(1))
            .is_err());
    }

    #[test]
    fn malformed_and_empty_files_rejected() {
        let dir = TempDir::new().unwrap();

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, b"not json").unwrap();
        assert!(matches!(
            SecretStore::load(&garbage),
            Err(AuthError::SecretFile(_))
        ));

        let empty = write_secret(dir.path(), "empty.json", "");
        assert!(matches!(
            SecretStore::load(&empty),
            Err(AuthError::SecretFile(_))
        ));
    }

    #[test]
    fn reload_picks_up_rotation() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "first");
        let store = SecretStore::load(&path).unwrap();

        write_secret(dir.path(), "secret.json", "second");
        store.reload().unwrap();
        assert_eq!(store.current().unwrap().as_bytes(), b"second");
    }

    #[test]
    fn failed_reload_keeps_previous_secret() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "keep");
        let store = SecretStore::load(&path).unwrap();

        std::fs::write(&path, b"{").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.current().unwrap().as_bytes(), b"keep");
    }

    #[test]
    fn reload_of_missing_file_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "keep");
        let store = SecretStore::load(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(store.reload(), Err(AuthError::SecretFile(_))));
        assert!(!path.exists());
        assert_eq!(store.current().unwrap().as_bytes(), b"keep");
    }

    #[test]
    fn expiry_is_logged_once_until_reload() {
        let dir = TempDir::new().unwrap();
        let path = write_secret(dir.path(), "secret.json", "aging");
        let store = SecretStore::load(&path).unwrap();
        let later = Utc::now() + Duration::days(2);

        assert!(store.current_at(later).is_err());
        assert!(store.expiry_logged.load(Ordering::Relaxed));
        assert!(store.current_at(later).is_err());

        write_secret(dir.path(), "secret.json", "fresh");
        store.reload().unwrap();
        assert!(!store.expiry_logged.load(Ordering::Relaxed));
    }

    #[test]
    fn debug_redacts_value() {
        let secret = Secret::new("do-not-print", Utc::now());
        assert!(!format!("{secret:?}").contains("do-not-print"));
    }
}
