//! Storage infrastructure: the settings file on disk.
//!
//! [`file::FileStorage`] implements [`taskflow_core::KeyValueStorage`] over a
//! single file in the platform-appropriate config directory:
//!
//! - Windows: `%APPDATA%\TaskFlow\settings.json`
//! - Linux and other Unix: `$XDG_CONFIG_HOME/taskflow/settings.json`, falling
//!   back to `~/.config/taskflow/settings.json`
//! - macOS: `~/Library/Application Support/TaskFlow/settings.json`
//!
//! Keeping the file-system details here means the store and its mutators never
//! learn where or how the record is kept.

use std::path::PathBuf;

use thiserror::Error;

pub mod file;

/// File name used when no explicit store path is configured.
pub const DEFAULT_FILE_NAME: &str = "settings.json";

/// Error resolving the default settings location.
#[derive(Debug, Error)]
pub enum ConfigPathError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,
}

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`ConfigPathError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigPathError> {
    platform_config_dir().ok_or(ConfigPathError::NoPlatformConfigDir)
}

/// Resolves the full default path of the settings file.
///
/// # Errors
///
/// Returns [`ConfigPathError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn default_store_path() -> Result<PathBuf, ConfigPathError> {
    Ok(config_dir()?.join(DEFAULT_FILE_NAME))
}

/// Directory created under the platform config base.  Windows and macOS use
/// the product name; other Unix systems follow the lowercase XDG habit.
#[cfg(any(target_os = "windows", target_os = "macos"))]
const APP_DIR_NAME: &str = "TaskFlow";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const APP_DIR_NAME: &str = "taskflow";

fn platform_config_dir() -> Option<PathBuf> {
    platform_config_base().map(|base| base.join(APP_DIR_NAME))
}

/// Reads a directory from the environment; unset and empty are both absent.
#[cfg_attr(not(any(unix, windows)), allow(dead_code))]
fn env_dir(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Per-user config base for the current OS.
fn platform_config_base() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        // Roaming profile.
        env_dir("APPDATA")
    }

    #[cfg(target_os = "macos")]
    {
        env_dir("HOME").map(|home| home.join("Library").join("Application Support"))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        // XDG_CONFIG_HOME wins over the ~/.config fallback.
        env_dir("XDG_CONFIG_HOME").or_else(|| env_dir("HOME").map(|home| home.join(".config")))
    }

    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}
