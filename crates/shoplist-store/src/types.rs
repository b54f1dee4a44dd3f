//! Domain types stored in the user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shoplist_core::{Identity, UserId};

/// A user account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Argon2 PHC string of the user's password.
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// The identity this account authenticates as.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone())
    }
}
