//! User directory storage for the shopping list server.
//!
//! The authentication core consumes a small, synchronous data-access interface
//! for resolving users. This crate defines that interface ([`UserDirectory`])
//! and provides a `RocksDB` implementation plus an in-memory one for tests.
//!
//! # Architecture
//!
//! The `RocksDB` implementation uses the following column families:
//!
//! - `users`: Primary user records, keyed by `user_id`
//! - `users_by_name`: Exact-match username index
//! - `meta`: The user id counter
//!
//! # Example
//!
//! ```no_run
//! use shoplist_store::{RocksDirectory, UserDirectory};
//!
//! let directory = RocksDirectory::open("/tmp/shoplist-users").unwrap();
//! let user = directory.create_user("alice", "$argon2id$...").unwrap();
//!
//! let found = directory.get_user(user.id).unwrap();
//! assert_eq!(found.map(|u| u.username), Some("alice".to_string()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryDirectory;
pub use rocks::RocksDirectory;
pub use types::User;

use shoplist_core::UserId;

/// Identity lookups consumed by the authentication core.
///
/// Implementations must be cheap to call from request handlers; every
/// session verification performs one `get_user`.
pub trait UserDirectory: Send + Sync {
    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Get a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Create a user with the next free ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UsernameTaken` if the username already exists.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<User>;

    /// Record a successful login for the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn update_last_login(&self, user_id: UserId) -> Result<()>;
}
