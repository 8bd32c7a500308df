//! The persisted subset of [`ConfigState`].
//!
//! [`PersistedSettings`] is written as camelCase JSON with no schema version:
//!
//! ```json
//! {
//!   "backendToken": "", "backendBaseId": "",
//!   "backendPrimaryTable": "", "backendSecondaryTable": "",
//!   "messagingConfig": { "botToken": "", "authorizedUsers": [] },
//!   "darkMode": false, "cacheDuration": "medium", "isConfigured": false
//! }
//! ```
//!
//! On read, the record is shallow-merged over the defaults: a missing field
//! keeps its default, and a missing or `null` `messagingConfig` becomes the
//! canonical empty value.  Unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::settings::{CacheDuration, ConfigState, MessagingConfig};

/// Wire layout of the persisted settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSettings {
    pub backend_token: String,
    pub backend_base_id: String,
    pub backend_primary_table: String,
    pub backend_secondary_table: String,
    #[serde(deserialize_with = "null_as_default")]
    pub messaging_config: MessagingConfig,
    pub dark_mode: bool,
    pub cache_duration: CacheDuration,
    pub is_configured: bool,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self::from(&ConfigState::default())
    }
}

impl From<&ConfigState> for PersistedSettings {
    fn from(state: &ConfigState) -> Self {
        Self {
            backend_token: state.backend_token.clone(),
            backend_base_id: state.backend_base_id.clone(),
            backend_primary_table: state.backend_primary_table.clone(),
            backend_secondary_table: state.backend_secondary_table.clone(),
            messaging_config: state.messaging_config.clone(),
            dark_mode: state.dark_mode,
            cache_duration: state.cache_duration,
            is_configured: state.is_configured,
        }
    }
}

impl PersistedSettings {
    /// Rebuilds live state from the record.
    ///
    /// Duplicate user ids written by an older or hand-edited record are
    /// collapsed with the upsert rule.
    pub fn into_state(self) -> ConfigState {
        ConfigState {
            backend_token: self.backend_token,
            backend_base_id: self.backend_base_id,
            backend_primary_table: self.backend_primary_table,
            backend_secondary_table: self.backend_secondary_table,
            messaging_config: self.messaging_config.normalized(),
            dark_mode: self.dark_mode,
            cache_duration: self.cache_duration,
            is_configured: self.is_configured,
        }
    }
}

/// Treats an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
