//! Key encoding utilities for `RocksDB`.

use shoplist_core::{IdError, UserId};

/// Encode a user key (big-endian id, so iteration follows id order).
#[must_use]
pub fn user_key(user_id: UserId) -> [u8; 8] {
    user_id.to_be_bytes()
}

/// Encode a username index key.
#[must_use]
pub fn username_key(username: &str) -> Vec<u8> {
    username.as_bytes().to_vec()
}

/// Decode a user id stored as an index value or key.
///
/// # Errors
///
/// Returns an error if the bytes do not encode a valid user id.
pub fn decode_user_id(bytes: &[u8]) -> Result<UserId, IdError> {
    UserId::from_be_bytes(bytes)
}
