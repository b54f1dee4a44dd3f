//! Core identifier types.
//!
//! User IDs are the integer primary keys of the relational user table. They
//! travel inside token claims as decimal strings and are parsed back into
//! [`UserId`] on verification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The value is not a decimal integer.
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    /// The value is zero or negative.
    #[error("user id must be positive, got {0}")]
    NonPositive(i64),
}

/// A positive integer user identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Create a `UserId` from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns `IdError::NonPositive` if `value <= 0`.
    pub const fn new(value: i64) -> Result<Self, IdError> {
        if value <= 0 {
            return Err(IdError::NonPositive(value));
        }
        Ok(Self(value))
    }

    /// Return the underlying integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Big-endian bytes, suitable as an ordered storage key.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Decode a `UserId` from big-endian key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not 8 bytes long or encodes a
    /// non-positive value.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, IdError> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| IdError::InvalidUserId(format!("{} key bytes", bytes.len())))?;
        Self::new(i64::from_be_bytes(arr))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| IdError::InvalidUserId(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for UserId {
    type Error = IdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// A verified identity attached to a request after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The user's primary key.
    pub user_id: UserId,
    /// The username the token was issued for.
    pub username: String,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
