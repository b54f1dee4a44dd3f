//! Durable record of the tokens this server has issued.
//!
//! A token is only accepted if it is both cryptographically valid and present
//! in the ledger. This rejects tokens that were signed with a leaked or
//! rotated-out secret but never went through the login path.
//!
//! # File format
//!
//! Plain text, one token per line. Commas are also accepted as separators
//! when reading. Normal operation appends; the compaction pass rewrites the
//! file through a temporary file and a rename.
//!
//! # Concurrency
//!
//! A single mutex guards the in-memory set and every write to the file, so
//! concurrent logins never lose entries. [`TokenLedger::contains`] falls back
//! to re-reading the file on a miss, which lets several processes share one
//! ledger file.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::claims::SessionCodec;
use crate::error::{AuthError, Result};
use crate::fingerprint;
use crate::secret::SecretStore;

/// Outcome of a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Compaction {
    /// Tokens that still verify and were kept.
    pub retained: usize,
    /// Tokens that no longer verify and were removed.
    pub dropped: usize,
}

/// Issued-token ledger backed by a file.
pub struct TokenLedger {
    path: PathBuf,
    tokens: Mutex<HashSet<String>>,
}

impl TokenLedger {
    /// Open the ledger at `path`, keeping only tokens for which `is_valid`
    /// returns `true` and rewriting the file with that subset.
    ///
    /// A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Ledger` if the file cannot be read or rewritten.
    pub fn open<F>(path: impl Into<PathBuf>, is_valid: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        let ledger = Self {
            path: path.into(),
            tokens: Mutex::new(HashSet::new()),
        };
        let outcome = ledger.compact(is_valid)?;
        tracing::info!(
            path = %ledger.path.display(),
            retained = outcome.retained,
            dropped = outcome.dropped,
            "Token ledger loaded"
        );
        Ok(ledger)
    }

    /// Open the ledger, re-verifying each entry against the current secret.
    ///
    /// # Errors
    ///
    /// Fails with `SecretExpired` if the secret is unusable, or with
    /// `AuthError::Ledger` on I/O errors.
    pub fn open_verified(
        path: impl Into<PathBuf>,
        secrets: &SecretStore,
        codec: &SessionCodec,
    ) -> Result<Self> {
        let secret = secrets.current()?;
        Self::open(path, |token| codec.decode_session(token, &secret).is_ok())
    }

    /// Drop every token for which `is_valid` returns `false`, from memory and
    /// from disk.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Ledger` if the file cannot be read or rewritten.
    pub fn compact<F>(&self, is_valid: F) -> Result<Compaction>
    where
        F: Fn(&str) -> bool,
    {
        let mut tokens = self.tokens.lock();

        let mut candidates = read_tokens(&self.path)?;
        candidates.extend(tokens.iter().cloned());

        let (retained, dropped): (HashSet<String>, HashSet<String>) =
            candidates.into_iter().partition(|t| is_valid(t.as_str()));

        write_atomic(&self.path, &retained)?;

        let outcome = Compaction {
            retained: retained.len(),
            dropped: dropped.len(),
        };
        *tokens = retained;
        Ok(outcome)
    }

    /// Compact against the current secret.
    ///
    /// # Errors
    ///
    /// Fails with `SecretExpired` before touching the file if the secret is
    /// unusable, so an expired secret never wipes the ledger.
    pub fn compact_verified(
        &self,
        secrets: &SecretStore,
        codec: &SessionCodec,
    ) -> Result<Compaction> {
        let secret = secrets.current()?;
        let outcome = self.compact(|token| codec.decode_session(token, &secret).is_ok())?;
        tracing::info!(
            retained = outcome.retained,
            dropped = outcome.dropped,
            "Token ledger compacted"
        );
        Ok(outcome)
    }

    /// Record a newly issued token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Ledger` if the append fails; the token is then not
    /// recorded in memory either.
    pub fn append(&self, token: &str) -> Result<()> {
        let mut tokens = self.tokens.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ledger_io(&self.path, &e))?;
        let line = format!("{token}\n");
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| ledger_io(&self.path, &e))?;

        tokens.insert(token.to_string());
        tracing::debug!(token = %fingerprint(token), "Token recorded");
        Ok(())
    }

    /// Returns `true` if `token` was issued by this server (or by another
    /// process sharing the ledger file).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Ledger` if the file must be consulted and cannot be read.
    pub fn contains(&self, token: &str) -> Result<bool> {
        if self.tokens.lock().contains(token) {
            return Ok(true);
        }

        let on_disk = read_tokens(&self.path)?;
        if on_disk.contains(token) {
            self.tokens.lock().insert(token.to_string());
            return Ok(true);
        }
        Ok(false)
    }

    /// Number of tokens currently held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Returns `true` if no tokens are held in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ledger_io(path: &Path, err: &std::io::Error) -> AuthError {
    AuthError::Ledger(format!("{}: {err}", path.display()))
}

fn read_tokens(path: &Path) -> Result<HashSet<String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(ledger_io(path, &e)),
    };

    Ok(raw
        .split(['\n', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

fn write_atomic(path: &Path, tokens: &HashSet<String>) -> Result<()> {
    let tmp = path.with_extension("tmp");

    let mut body = String::new();
    for token in tokens {
        body.push_str(token);
        body.push('\n');
    }

    let mut file = std::fs::File::create(&tmp).map_err(|e| ledger_io(&tmp, &e))?;
    file.write_all(body.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| ledger_io(&tmp, &e))?;
    std::fs::rename(&tmp, path).map_err(|e| ledger_io(path, &e))
}
