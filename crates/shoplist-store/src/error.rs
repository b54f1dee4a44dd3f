//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// Another account already uses this username.
    #[error("username already taken: {0}")]
    UsernameTaken(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored key could not be decoded into an identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] shoplist_core::IdError),
}
