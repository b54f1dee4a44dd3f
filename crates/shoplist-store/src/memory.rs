//! In-memory user directory for tests.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use shoplist_core::UserId;

use crate::error::{Result, StoreError};
use crate::types::User;
use crate::UserDirectory;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    by_name: HashMap<String, UserId>,
    last_id: i64,
}

/// A `UserDirectory` backed by hash maps.
#[derive(Default)]
pub struct MemoryDirectory {
    tables: RwLock<Tables>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a user's name in place, keeping the id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    pub fn rename_user(&self, user_id: UserId, new_name: &str) -> Result<()> {
        let mut tables = self.tables.write();
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        let old_name = std::mem::replace(&mut user.username, new_name.to_string());
        tables.by_name.remove(&old_name);
        tables.by_name.insert(new_name.to_string(), user_id);
        Ok(())
    }

    /// Remove a user entirely.
    pub fn remove_user(&self, user_id: UserId) {
        let mut tables = self.tables.write();
        if let Some(user) = tables.users.remove(&user_id) {
            tables.by_name.remove(&user.username);
        }
    }
}

impl UserDirectory for MemoryDirectory {
    fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&user_id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read();
        Ok(tables
            .by_name
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut tables = self.tables.write();
        if tables.by_name.contains_key(username) {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }

        let id = UserId::new(tables.last_id + 1)?;
        tables.last_id = id.get();

        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        tables.by_name.insert(username.to_string(), id);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn update_last_login(&self, user_id: UserId) -> Result<()> {
        let mut tables = self.tables.write();
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }
}
