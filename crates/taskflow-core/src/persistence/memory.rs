//! In-memory key-value storage.
//!
//! Used by tests and by callers that want a store without durability.  Writes
//! can be made to fail on demand to exercise the persistence-failure path.

use std::collections::HashMap;

use super::{KeyValueStorage, StorageError};

/// A `HashMap`-backed [`KeyValueStorage`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    fail_writes: bool,
    write_count: u32,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `key` with `value`, as if written by a previous run.
    pub fn with_item(mut self, key: &str, value: &str) -> Self {
        self.items.insert(key.to_string(), value.to_string());
        self
    }

    /// Makes every subsequent `set_item`/`remove_item` fail with
    /// [`StorageError::Unavailable`].
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful `set_item` calls.
    pub fn write_count(&self) -> u32 {
        self.write_count
    }

    /// Raw stored text for `key`.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        self.items.insert(key.to_string(), value.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        self.items.remove(key);
        Ok(())
    }
}
