//! File-backed key-value storage.
//!
//! The file holds one map of key → value.  With the default JSON format the
//! settings record looks like:
//!
//! ```json
//! {
//!   "taskflow-settings": {
//!     "backendToken": "keyXXXX",
//!     "messagingConfig": { "botToken": "", "authorizedUsers": [] },
//!     "cacheDuration": "medium"
//!   }
//! }
//! ```
//!
//! A path ending in `.toml` switches the on-disk format to TOML, with each key
//! becoming a table.  Values handed to [`set_item`](KeyValueStorage::set_item)
//! must be JSON text; they are stored structurally (not as escaped strings) so
//! the file stays hand-editable.
//!
//! The file is re-read on every access and rewritten whole on every write.
//! A file that no longer parses is renamed to `<name>.corrupt` on the next
//! write, so a damaged file never blocks saving and its bytes are kept for
//! manual recovery.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use taskflow_core::{KeyValueStorage, StorageError};
use tracing::{debug, warn};

/// On-disk encoding of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Picks the format from the file extension; anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// [`KeyValueStorage`] persisted to a single JSON or TOML file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    format: FileFormat,
}

impl FileStorage {
    /// Creates storage backed by `path`.  Nothing is touched on disk until the
    /// first access; the format follows the extension (see [`FileFormat::from_path`]).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::from_path(&path);
        Self { path, format }
    }

    /// The settings file this storage reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// On-disk encoding chosen at construction.
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Reads the whole map.  A missing or empty file is an empty map.
    fn read_map(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match self.format {
            FileFormat::Json => serde_json::from_str(&content)
                .map_err(|e| StorageError::Parse(format!("{}: {e}", self.path.display()))),
            FileFormat::Toml => toml::from_str(&content)
                .map_err(|e| StorageError::Parse(format!("{}: {e}", self.path.display()))),
        }
    }

    /// Reads the map ahead of a write.  An unparseable file is moved aside and
    /// the write starts from an empty map.
    fn read_map_for_write(&self) -> Result<Map<String, Value>, StorageError> {
        match self.read_map() {
            Err(StorageError::Parse(reason)) => {
                let aside = self.corrupt_path();
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    %reason,
                    "settings file unparseable, moving it aside"
                );
                std::fs::rename(&self.path, &aside).map_err(|source| StorageError::Io {
                    path: aside.clone(),
                    source,
                })?;
                Ok(Map::new())
            }
            other => other,
        }
    }

    /// `settings.json` → `settings.json.corrupt`, next to the original.
    fn corrupt_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    /// Rewrites the whole map, creating the parent directory if needed.
    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        let content = match self.format {
            FileFormat::Json => serde_json::to_string_pretty(map)
                .map_err(|e| StorageError::Serialize(e.to_string()))?,
            FileFormat::Toml => {
                toml::to_string_pretty(map).map_err(|e| StorageError::Serialize(e.to_string()))?
            }
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "settings file written");
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.read_map()?;
        map.get(key)
            .map(|value| serde_json::to_string(value).map_err(|e| StorageError::Serialize(e.to_string())))
            .transpose()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let value: Value = serde_json::from_str(value)
            .map_err(|e| StorageError::Serialize(format!("value for {key:?} is not JSON: {e}")))?;
        let mut map = self.read_map_for_write()?;
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map_for_write()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
