//! Command bridge: exposes the settings store to UI and CLI front-ends.
//!
//! Every command function takes the shared [`AppState`], runs exactly one store
//! operation under the store mutex, and answers with a [`CommandResult`] so
//! the caller always receives the same shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//!
//! # Data Transfer Objects
//!
//! [`SettingsDto`] is the view handed to front-ends.  Secrets are masked down to
//! their last four characters; integration clients that need the real tokens
//! read [`ConfigStore::snapshot`] in-process instead.
//!
//! Mutating commands reply with the updated settings.  If the store changed in
//! memory but the settings file could not be written, the command reports an
//! error so the user knows the change will not survive a restart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use taskflow_core::{
    AuthorizedUser, CacheDuration, ConfigState, ConfigStore, KeyValueStorage, MessagingConfigPatch,
};

/// Number of trailing characters of a secret left visible in DTOs.
const VISIBLE_SECRET_CHARS: usize = 4;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared between command handlers.
///
/// The async mutex keeps the store's one-mutator-at-a-time model when several
/// commands arrive concurrently.
pub struct AppState {
    pub store: Mutex<ConfigStore>,
}

impl AppState {
    /// Opens the store on `storage`, hydrating from whatever it holds.
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(ConfigStore::new(storage)),
        })
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One authorized user as exchanged with front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedUserDto {
    pub id: String,
    pub username: String,
    pub first_name: String,
}

impl From<&AuthorizedUser> for AuthorizedUserDto {
    fn from(u: &AuthorizedUser) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            first_name: u.first_name.clone(),
        }
    }
}

impl From<AuthorizedUserDto> for AuthorizedUser {
    fn from(dto: AuthorizedUserDto) -> Self {
        AuthorizedUser::new(dto.id, dto.username, dto.first_name)
    }
}

/// Backend credentials submitted as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfigDto {
    pub token: String,
    pub base_id: String,
    pub primary_table: String,
    pub secondary_table: String,
}

/// Partial messaging update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingConfigDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_users: Option<Vec<AuthorizedUserDto>>,
}

impl From<MessagingConfigDto> for MessagingConfigPatch {
    fn from(dto: MessagingConfigDto) -> Self {
        Self {
            bot_token: dto.bot_token,
            authorized_users: dto
                .authorized_users
                .map(|users| users.into_iter().map(AuthorizedUser::from).collect()),
        }
    }
}

/// Settings view returned by every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDto {
    pub backend_token: String,
    pub backend_base_id: String,
    pub backend_primary_table: String,
    pub backend_secondary_table: String,
    pub bot_token: String,
    pub authorized_users: Vec<AuthorizedUserDto>,
    pub dark_mode: bool,
    pub cache_duration: CacheDuration,
    /// Cache lifetime in seconds; `null` for unlimited.
    pub cache_ttl_secs: Option<u64>,
    pub is_configured: bool,
}

impl From<&ConfigState> for SettingsDto {
    fn from(s: &ConfigState) -> Self {
        Self {
            backend_token: mask_secret(&s.backend_token),
            backend_base_id: s.backend_base_id.clone(),
            backend_primary_table: s.backend_primary_table.clone(),
            backend_secondary_table: s.backend_secondary_table.clone(),
            bot_token: mask_secret(&s.messaging_config.bot_token),
            authorized_users: s
                .messaging_config
                .authorized_users
                .iter()
                .map(AuthorizedUserDto::from)
                .collect(),
            dark_mode: s.dark_mode,
            cache_duration: s.cache_duration,
            cache_ttl_secs: s.cache_duration.ttl().map(|d| d.as_secs()),
            is_configured: s.is_configured,
        }
    }
}

/// Masks all but the last few characters of `secret`.
///
/// Empty secrets stay empty so the UI can tell "unset" from "set".
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len == 0 {
        return String::new();
    }
    if len <= VISIBLE_SECRET_CHARS {
        return "*".repeat(len);
    }
    let tail: String = secret.chars().skip(len - VISIBLE_SECRET_CHARS).collect();
    format!("{}{tail}", "*".repeat(len - VISIBLE_SECRET_CHARS))
}

/// Reply envelope shared by every command.
///
/// Exactly one of `data` and `error` is present; the absent one is left out of
/// the serialized reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    /// Successful reply carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed reply; `msg` is shown to the user verbatim.
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Replies with the current settings, or with an error if the last write to
/// the settings file failed.
fn settings_reply(store: &ConfigStore) -> CommandResult<SettingsDto> {
    match store.persist_error() {
        Some(e) => CommandResult::err(format!("settings changed but could not be saved: {e}")),
        None => CommandResult::ok(SettingsDto::from(&*store.snapshot())),
    }
}

/// Returns the current settings with secrets masked.
pub async fn get_settings(state: Arc<AppState>) -> CommandResult<SettingsDto> {
    let store = state.store.lock().await;
    CommandResult::ok(SettingsDto::from(&*store.snapshot()))
}

/// Saves the four backend fields as a unit and marks the app configured.
pub async fn set_backend_config(
    state: Arc<AppState>,
    backend: BackendConfigDto,
) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.set_backend_config(
        backend.token,
        backend.base_id,
        backend.primary_table,
        backend.secondary_table,
    );
    settings_reply(&store)
}

/// Merges a partial messaging update; omitted fields are kept.
pub async fn set_messaging_config(
    state: Arc<AppState>,
    messaging: MessagingConfigDto,
) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.set_messaging_config(messaging.into());
    settings_reply(&store)
}

/// Authorizes a user, replacing any entry with the same id.
pub async fn add_authorized_user(
    state: Arc<AppState>,
    user: AuthorizedUserDto,
) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.add_authorized_user(user.into());
    settings_reply(&store)
}

/// Revokes the user with `user_id`; unknown ids succeed without change.
pub async fn remove_authorized_user(
    state: Arc<AppState>,
    user_id: String,
) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.remove_authorized_user(&user_id);
    settings_reply(&store)
}

/// Flips the dark-mode preference.
pub async fn toggle_dark_mode(state: Arc<AppState>) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.toggle_dark_mode();
    settings_reply(&store)
}

/// Sets the cache duration from its wire name.
///
/// Unknown names are rejected here, before they reach the store.
pub async fn set_cache_duration(
    state: Arc<AppState>,
    duration: String,
) -> CommandResult<SettingsDto> {
    let duration: CacheDuration = match duration.parse() {
        Ok(d) => d,
        Err(e) => return CommandResult::err(format!("{e}")),
    };
    let mut store = state.store.lock().await;
    store.set_cache_duration(duration);
    settings_reply(&store)
}

/// Forgets backend and messaging credentials, keeping UI preferences.
pub async fn clear_config(state: Arc<AppState>) -> CommandResult<SettingsDto> {
    let mut store = state.store.lock().await;
    store.clear_config();
    settings_reply(&store)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
