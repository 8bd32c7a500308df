//! Durable storage seam and the persisted settings layout.
//!
//! The store never talks to a file or a database directly.  It talks to a
//! [`KeyValueStorage`]: a string-keyed map of JSON text, the same shape a
//! browser's local storage or a desktop app's settings file provides.  The
//! whole persisted record lives under one fixed key, [`STORAGE_KEY`], and every
//! write replaces the previous value wholesale, so writes are idempotent and
//! can be retried without coordination.
//!
//! # Sub-modules
//!
//! - **`record`** – [`PersistedSettings`](record::PersistedSettings), the pure
//!   projection of live state that is written to storage, plus the
//!   default-reconciling read path.
//! - **`memory`** – [`MemoryStorage`](memory::MemoryStorage), a `HashMap`
//!   backend for tests and headless use.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::settings::ConfigState;

pub mod memory;
pub mod record;

use record::PersistedSettings;

/// Fixed, versionless key the settings record is stored under.
pub const STORAGE_KEY: &str = "taskflow-settings";

/// Errors reported by a [`KeyValueStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium refused the operation (read-only, quota, injected failure).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A file-system error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The medium holds data that could not be parsed.
    #[error("stored data could not be parsed: {0}")]
    Parse(String),

    /// A value could not be encoded for the medium.
    #[error("failed to serialize value: {0}")]
    Serialize(String),
}

/// String-keyed durable storage holding JSON text values.
///
/// Implementations must treat `set_item` as a full replace of the value under
/// `key`.  `get_item` returns `Ok(None)` for keys that were never written.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStorage: Send {
    /// Reads the value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Replaces the value stored under `key`.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Deletes `key`.  Deleting a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Outcome of reading the persisted record at startup.
#[derive(Debug)]
pub enum Hydration {
    /// Nothing stored yet (first run).
    Missing,
    /// A record was found and reconciled with defaults.
    Restored(ConfigState),
    /// A record was found but is not a settings record.
    Corrupt(String),
    /// The medium could not be read.
    Unreadable(StorageError),
}

impl Hydration {
    /// The state to expose: the restored record, or defaults for every other
    /// outcome.
    pub fn into_state(self) -> ConfigState {
        match self {
            Self::Restored(state) => state,
            Self::Missing | Self::Corrupt(_) | Self::Unreadable(_) => ConfigState::default(),
        }
    }
}

/// Reads and reconciles the persisted record from `storage`.
pub fn hydrate(storage: &dyn KeyValueStorage) -> Hydration {
    match storage.get_item(STORAGE_KEY) {
        Ok(None) => Hydration::Missing,
        Ok(Some(raw)) => match serde_json::from_str::<PersistedSettings>(&raw) {
            Ok(record) => Hydration::Restored(record.into_state()),
            Err(e) => Hydration::Corrupt(e.to_string()),
        },
        Err(e) => Hydration::Unreadable(e),
    }
}

/// Writes the persisted projection of `state` under [`STORAGE_KEY`].
///
/// # Errors
///
/// Returns [`StorageError::Serialize`] if the record cannot be serialized, or
/// whatever the backend reports for the write.
pub fn persist(storage: &mut dyn KeyValueStorage, state: &ConfigState) -> Result<(), StorageError> {
    let record = PersistedSettings::from(state);
    let json = serde_json::to_string(&record).map_err(|e| StorageError::Serialize(e.to_string()))?;
    storage.set_item(STORAGE_KEY, &json)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
