//! Settings domain entities and their pure state transitions.
//!
//! Every transition takes `&self` and returns a brand-new value.  Nothing in
//! this module mutates a previous state in place, which is what lets the
//! [`ConfigStore`](crate::store::ConfigStore) hand out `Arc` snapshots to
//! readers while it keeps moving forward.
//!
//! # Canonical empty values
//!
//! A nested record is never "absent".  [`MessagingConfig::default`] is the
//! canonical empty value: no bot token and no authorized users.  Loaders that
//! meet a missing or `null` messaging record substitute this value before the
//! state becomes observable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time-to-live of a [`CacheDuration::Short`] cache entry.
const SHORT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time-to-live of a [`CacheDuration::Medium`] cache entry.
const MEDIUM_TTL: Duration = Duration::from_secs(12 * 60 * 60);

// ── Authorized users ──────────────────────────────────────────────────────────

/// A messaging-platform account allowed to talk to the bot.
///
/// `id` is the unique key inside [`MessagingConfig::authorized_users`].
/// Missing fields load as empty strings; the entry is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizedUser {
    /// Platform account identifier.
    pub id: String,
    /// Account handle, without the leading `@`.
    pub username: String,
    /// Display first name.
    pub first_name: String,
}

impl AuthorizedUser {
    /// Builds a user entry from its three display fields.
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        first_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            first_name: first_name.into(),
        }
    }
}

// ── Messaging configuration ───────────────────────────────────────────────────

/// Bot credentials plus the ordered list of authorized users.
///
/// Missing fields deserialize to their empty values, so a partially written
/// record still produces a usable config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagingConfig {
    /// Bot API token.
    pub bot_token: String,
    /// Authorized users, unique by id, in insertion order.
    pub authorized_users: Vec<AuthorizedUser>,
}

/// Partial update for [`MessagingConfig`].
///
/// `None` means "leave the current value alone".  In particular, a patch that
/// only carries a bot token never touches the user list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingConfigPatch {
    pub bot_token: Option<String>,
    pub authorized_users: Option<Vec<AuthorizedUser>>,
}

impl MessagingConfigPatch {
    /// A patch that only replaces the bot token.
    pub fn bot_token(token: impl Into<String>) -> Self {
        Self {
            bot_token: Some(token.into()),
            authorized_users: None,
        }
    }

    /// A patch that only replaces the user list.
    pub fn authorized_users(users: Vec<AuthorizedUser>) -> Self {
        Self {
            bot_token: None,
            authorized_users: Some(users),
        }
    }

    /// Returns `true` when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.bot_token.is_none() && self.authorized_users.is_none()
    }
}

impl MessagingConfig {
    /// Looks up an authorized user by id.
    pub fn find_user(&self, id: &str) -> Option<&AuthorizedUser> {
        self.authorized_users.iter().find(|u| u.id == id)
    }

    /// Applies `patch` on top of `self`.
    ///
    /// A supplied user list replaces the current one after duplicate ids are
    /// collapsed with the upsert rule.
    pub fn merged(&self, patch: MessagingConfigPatch) -> Self {
        Self {
            bot_token: patch.bot_token.unwrap_or_else(|| self.bot_token.clone()),
            authorized_users: match patch.authorized_users {
                Some(users) => dedup_users(users),
                None => self.authorized_users.clone(),
            },
        }
    }

    /// Upserts `user`: drops any entry with the same id, then appends.
    pub fn with_user(&self, user: AuthorizedUser) -> Self {
        let mut authorized_users: Vec<AuthorizedUser> = self
            .authorized_users
            .iter()
            .filter(|u| u.id != user.id)
            .cloned()
            .collect();
        authorized_users.push(user);
        Self {
            bot_token: self.bot_token.clone(),
            authorized_users,
        }
    }

    /// Drops the entry whose id equals `user_id`, if any.
    pub fn without_user(&self, user_id: &str) -> Self {
        Self {
            bot_token: self.bot_token.clone(),
            authorized_users: self
                .authorized_users
                .iter()
                .filter(|u| u.id != user_id)
                .cloned()
                .collect(),
        }
    }

    /// Re-establishes the unique-id invariant on a config that came from
    /// outside the store (a persisted record, a caller-supplied list).
    pub fn normalized(self) -> Self {
        Self {
            bot_token: self.bot_token,
            authorized_users: dedup_users(self.authorized_users),
        }
    }
}

/// Replays `users` through the upsert rule: the last occurrence of each id
/// wins and takes the position of that last occurrence.
fn dedup_users(users: Vec<AuthorizedUser>) -> Vec<AuthorizedUser> {
    let mut out: Vec<AuthorizedUser> = Vec::with_capacity(users.len());
    for user in users {
        out.retain(|u| u.id != user.id);
        out.push(user);
    }
    out
}

// ── Cache duration ────────────────────────────────────────────────────────────

/// How long integration clients may cache backend records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDuration {
    /// Five minutes.
    Short,
    /// Twelve hours.
    #[default]
    Medium,
    /// Never expires.
    Unlimited,
}

/// Error returned when parsing an unknown cache-duration name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown cache duration {0:?}: expected one of short, medium, unlimited")]
pub struct ParseCacheDurationError(pub String);

impl CacheDuration {
    /// All members, in ascending order of lifetime.
    pub const ALL: [CacheDuration; 3] = [Self::Short, Self::Medium, Self::Unlimited];

    /// Entry lifetime, or `None` when cached data never expires.
    pub fn ttl(self) -> Option<Duration> {
        match self {
            Self::Short => Some(SHORT_TTL),
            Self::Medium => Some(MEDIUM_TTL),
            Self::Unlimited => None,
        }
    }

    /// The wire name (`"short"`, `"medium"`, `"unlimited"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Unlimited => "unlimited",
        }
    }
}

impl fmt::Display for CacheDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheDuration {
    type Err = ParseCacheDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseCacheDurationError(s.to_string()))
    }
}

// ── Root state ────────────────────────────────────────────────────────────────

/// The complete settings record owned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigState {
    /// Spreadsheet backend API token.
    pub backend_token: String,
    /// Workspace / base the backend tables live in.
    pub backend_base_id: String,
    /// Main task table.
    pub backend_primary_table: String,
    /// Observations table.
    pub backend_secondary_table: String,
    pub messaging_config: MessagingConfig,
    pub dark_mode: bool,
    pub cache_duration: CacheDuration,
    /// Set once the four backend fields have been saved together.
    pub is_configured: bool,
}

impl ConfigState {
    /// Replaces all four backend fields and marks the store configured.
    pub fn with_backend_config(
        &self,
        token: impl Into<String>,
        base_id: impl Into<String>,
        primary_table: impl Into<String>,
        secondary_table: impl Into<String>,
    ) -> Self {
        Self {
            backend_token: token.into(),
            backend_base_id: base_id.into(),
            backend_primary_table: primary_table.into(),
            backend_secondary_table: secondary_table.into(),
            is_configured: true,
            ..self.clone()
        }
    }

    /// Merges `patch` into the messaging config; see [`MessagingConfig::merged`].
    pub fn with_messaging_patch(&self, patch: MessagingConfigPatch) -> Self {
        Self {
            messaging_config: self.messaging_config.merged(patch),
            ..self.clone()
        }
    }

    /// Upserts one authorized user by id.
    pub fn with_authorized_user(&self, user: AuthorizedUser) -> Self {
        Self {
            messaging_config: self.messaging_config.with_user(user),
            ..self.clone()
        }
    }

    /// Removes the authorized user with `user_id`.  Unknown ids leave the
    /// list unchanged.
    pub fn without_authorized_user(&self, user_id: &str) -> Self {
        Self {
            messaging_config: self.messaging_config.without_user(user_id),
            ..self.clone()
        }
    }

    /// Flips the dark-mode preference.
    pub fn with_dark_mode_toggled(&self) -> Self {
        Self {
            dark_mode: !self.dark_mode,
            ..self.clone()
        }
    }

    /// Replaces the cache-duration preference.
    pub fn with_cache_duration(&self, cache_duration: CacheDuration) -> Self {
        Self {
            cache_duration,
            ..self.clone()
        }
    }

    /// Forgets every backend and messaging credential.
    ///
    /// `dark_mode` and `cache_duration` are UI preferences and survive.
    pub fn cleared(&self) -> Self {
        Self {
            dark_mode: self.dark_mode,
            cache_duration: self.cache_duration,
            ..Self::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: &str) -> AuthorizedUser {
        AuthorizedUser::new(id, username, "First")
    }

    fn ids(config: &MessagingConfig) -> Vec<&str> {
        config.authorized_users.iter().map(|u| u.id.as_str()).collect()
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_state_is_unconfigured_with_medium_cache() {
        let state = ConfigState::default();
        assert!(!state.is_configured);
        assert!(!state.dark_mode);
        assert_eq!(state.cache_duration, CacheDuration::Medium);
        assert_eq!(state.messaging_config, MessagingConfig::default());
        assert!(state.backend_token.is_empty());
    }

    // ── Upsert / remove ───────────────────────────────────────────────────────

    #[test]
    fn test_with_user_appends_new_id() {
        let config = MessagingConfig::default()
            .with_user(user("1", "a"))
            .with_user(user("2", "b"));
        assert_eq!(ids(&config), vec!["1", "2"]);
    }

    #[test]
    fn test_with_user_moves_known_id_to_end_with_new_content() {
        let config = MessagingConfig::default()
            .with_user(user("1", "a"))
            .with_user(user("2", "b"))
            .with_user(user("1", "renamed"));

        assert_eq!(ids(&config), vec!["2", "1"]);
        assert_eq!(config.find_user("1").unwrap().username, "renamed");
    }

    #[test]
    fn test_with_user_leaves_previous_value_untouched() {
        let before = MessagingConfig::default().with_user(user("1", "a"));
        let after = before.with_user(user("2", "b"));
        assert_eq!(before.authorized_users.len(), 1);
        assert_eq!(after.authorized_users.len(), 2);
    }

    #[test]
    fn test_without_user_unknown_id_is_noop() {
        let config = MessagingConfig::default()
            .with_user(user("1", "a"))
            .with_user(user("2", "b"));
        assert_eq!(config.without_user("nope"), config);
    }

    #[test]
    fn test_without_user_removes_only_matching_entry() {
        let config = MessagingConfig::default()
            .with_user(user("1", "a"))
            .with_user(user("2", "b"))
            .with_user(user("3", "c"))
            .without_user("2");
        assert_eq!(ids(&config), vec!["1", "3"]);
    }

    // ── Merge ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_merge_token_only_keeps_users() {
        let config = MessagingConfig::default().with_user(user("1", "a"));
        let merged = config.merged(MessagingConfigPatch::bot_token("tok"));
        assert_eq!(merged.bot_token, "tok");
        assert_eq!(ids(&merged), vec!["1"]);
    }

    #[test]
    fn test_merge_users_only_keeps_token() {
        let config = MessagingConfig {
            bot_token: "tok".to_string(),
            authorized_users: Vec::new(),
        };
        let merged = config.merged(MessagingConfigPatch::authorized_users(vec![user("9", "z")]));
        assert_eq!(merged.bot_token, "tok");
        assert_eq!(ids(&merged), vec!["9"]);
    }

    #[test]
    fn test_merge_empty_patch_is_identity() {
        let config = MessagingConfig::default().with_user(user("1", "a"));
        let patch = MessagingConfigPatch::default();
        assert!(patch.is_empty());
        assert_eq!(config.merged(patch), config);
    }

    #[test]
    fn test_merge_supplied_duplicates_collapse_to_last() {
        let merged = MessagingConfig::default().merged(MessagingConfigPatch::authorized_users(
            vec![user("1", "old"), user("2", "b"), user("1", "new")],
        ));
        assert_eq!(ids(&merged), vec!["2", "1"]);
        assert_eq!(merged.find_user("1").unwrap().username, "new");
    }

    // ── Root transitions ──────────────────────────────────────────────────────

    #[test]
    fn test_backend_config_sets_all_fields_and_flag() {
        let state = ConfigState::default().with_backend_config("t", "b", "p", "o");
        assert_eq!(state.backend_token, "t");
        assert_eq!(state.backend_base_id, "b");
        assert_eq!(state.backend_primary_table, "p");
        assert_eq!(state.backend_secondary_table, "o");
        assert!(state.is_configured);
    }

    #[test]
    fn test_backend_config_accepts_empty_strings() {
        let state = ConfigState::default().with_backend_config("", "", "", "");
        assert!(state.is_configured);
    }

    #[test]
    fn test_cleared_keeps_ui_preferences() {
        let state = ConfigState::default()
            .with_backend_config("t", "b", "p", "o")
            .with_authorized_user(user("1", "a"))
            .with_dark_mode_toggled()
            .with_cache_duration(CacheDuration::Unlimited)
            .cleared();

        assert!(!state.is_configured);
        assert!(state.backend_token.is_empty());
        assert_eq!(state.messaging_config, MessagingConfig::default());
        assert!(state.dark_mode);
        assert_eq!(state.cache_duration, CacheDuration::Unlimited);
    }

    // ── Cache duration ────────────────────────────────────────────────────────

    #[test]
    fn test_cache_duration_ttls() {
        assert_eq!(CacheDuration::Short.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(CacheDuration::Medium.ttl(), Some(Duration::from_secs(43_200)));
        assert_eq!(CacheDuration::Unlimited.ttl(), None);
    }

    #[test]
    fn test_cache_duration_parses_wire_names() {
        for d in CacheDuration::ALL {
            assert_eq!(d.to_string().parse::<CacheDuration>(), Ok(d));
        }
        assert_eq!(
            "12h".parse::<CacheDuration>(),
            Err(ParseCacheDurationError("12h".to_string()))
        );
    }

    #[test]
    fn test_cache_duration_serializes_lowercase() {
        let json = serde_json::to_string(&CacheDuration::Unlimited).unwrap();
        assert_eq!(json, "\"unlimited\"");
    }

    #[test]
    fn test_authorized_user_uses_camel_case_first_name() {
        let json = serde_json::to_string(&user("1", "a")).unwrap();
        assert!(json.contains("firstName"), "got: {json}");
        assert!(!json.contains("first_name"), "got: {json}");
    }
}
