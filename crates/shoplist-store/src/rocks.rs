//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksDirectory` implementation of the `UserDirectory` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
    WriteBatch,
};
use shoplist_core::UserId;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, LAST_USER_ID_KEY};
use crate::types::User;
use crate::UserDirectory;

/// RocksDB-backed user directory.
pub struct RocksDirectory {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes id allocation and the username uniqueness check.
    create_lock: Mutex<()>,
}

impl RocksDirectory {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            create_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn last_user_id(&self) -> Result<i64> {
        let cf_meta = self.cf(cf::META)?;
        let raw = self
            .db
            .get_cf(&cf_meta, LAST_USER_ID_KEY)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match raw {
            Some(bytes) => Ok(keys::decode_user_id(&bytes)?.get()),
            None => Ok(0),
        }
    }

    fn put_user(&self, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let value = Self::serialize(user)?;

        self.db
            .put_cf(&cf_users, keys::user_key(user.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl UserDirectory for RocksDirectory {
    fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let cf = self.cf(cf::USERS)?;

        self.db
            .get_cf(&cf, keys::user_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let cf_by_name = self.cf(cf::USERS_BY_NAME)?;

        let Some(raw_id) = self
            .db
            .get_cf(&cf_by_name, keys::username_key(username))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        self.get_user(keys::decode_user_id(&raw_id)?)
    }

    fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_name = self.cf(cf::USERS_BY_NAME)?;
        let cf_meta = self.cf(cf::META)?;

        let _guard = self.create_lock.lock();

        let name_key = keys::username_key(username);
        let taken = self
            .db
            .get_cf(&cf_by_name, &name_key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }

        let id = UserId::new(self.last_user_id()? + 1)?;
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        let id_bytes = keys::user_key(id);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_users, id_bytes, Self::serialize(&user)?);
        batch.put_cf(&cf_by_name, &name_key, id_bytes);
        batch.put_cf(&cf_meta, LAST_USER_ID_KEY, id_bytes);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(user_id = %id, username = %username, "Created user");
        Ok(user)
    }

    fn update_last_login(&self, user_id: UserId) -> Result<()> {
        let mut user = self.get_user(user_id)?.ok_or(StoreError::NotFound)?;
        user.last_login_at = Some(Utc::now());
        self.put_user(&user)
    }
}
