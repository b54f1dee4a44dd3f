//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary user records, keyed by big-endian `user_id`.
    pub const USERS: &str = "users";

    /// Index: users by name, keyed by `username`, value is the user id.
    pub const USERS_BY_NAME: &str = "users_by_name";

    /// Bookkeeping values such as the id counter.
    pub const META: &str = "meta";
}

/// Key in [`cf::META`] holding the last allocated user id.
pub const LAST_USER_ID_KEY: &[u8] = b"last_user_id";

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::USERS, cf::USERS_BY_NAME, cf::META]
}
