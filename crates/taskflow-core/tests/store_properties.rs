//! Integration tests for the ConfigStore mutation and persistence contract.
//!
//! Each test drives the public API only: mutators in, snapshots and the
//! persisted record out.  `MemoryStorage` stands in for the durable medium and
//! is shared across "restarts" by cloning its contents.

use taskflow_core::{
    AuthorizedUser, CacheDuration, ConfigState, ConfigStore, KeyValueStorage, MemoryStorage,
    MessagingConfig, MessagingConfigPatch, PersistedSettings, STORAGE_KEY,
};

fn store() -> ConfigStore {
    ConfigStore::new(Box::new(MemoryStorage::new()))
}

fn user(id: &str, username: &str, first_name: &str) -> AuthorizedUser {
    AuthorizedUser::new(id, username, first_name)
}

fn user_ids(store: &ConfigStore) -> Vec<String> {
    store
        .snapshot()
        .messaging_config
        .authorized_users
        .iter()
        .map(|u| u.id.clone())
        .collect()
}

/// Captures the storage contents that a store would leave behind, by replaying
/// the same mutations against a store whose storage we keep hold of.
fn persisted_after(mutate: impl FnOnce(&mut ConfigStore)) -> MemoryStorage {
    struct Shared(std::sync::Arc<std::sync::Mutex<MemoryStorage>>);

    impl KeyValueStorage for Shared {
        fn get_item(&self, key: &str) -> Result<Option<String>, taskflow_core::StorageError> {
            self.0.lock().unwrap().get_item(key)
        }
        fn set_item(&mut self, key: &str, value: &str) -> Result<(), taskflow_core::StorageError> {
            self.0.lock().unwrap().set_item(key, value)
        }
        fn remove_item(&mut self, key: &str) -> Result<(), taskflow_core::StorageError> {
            self.0.lock().unwrap().remove_item(key)
        }
    }

    let shared = std::sync::Arc::new(std::sync::Mutex::new(MemoryStorage::new()));
    let mut store = ConfigStore::new(Box::new(Shared(std::sync::Arc::clone(&shared))));
    mutate(&mut store);
    drop(store);
    let storage = shared.lock().unwrap().clone();
    storage
}

// ── Messaging config presence ─────────────────────────────────────────────────

#[test]
fn test_messaging_config_present_after_every_mutator() {
    // Arrange
    let mut store = store();
    let with_token = MessagingConfig {
        bot_token: "x".to_string(),
        authorized_users: Vec::new(),
    };
    let with_user = MessagingConfig {
        bot_token: "x".to_string(),
        authorized_users: vec![user("1", "a", "A")],
    };

    // Act
    let mut seen: Vec<MessagingConfig> = Vec::new();
    store.set_backend_config("t", "b", "p", "o");
    seen.push(store.snapshot().messaging_config.clone());
    store.set_messaging_config(MessagingConfigPatch::bot_token("x"));
    seen.push(store.snapshot().messaging_config.clone());
    store.add_authorized_user(user("1", "a", "A"));
    seen.push(store.snapshot().messaging_config.clone());
    store.toggle_dark_mode();
    seen.push(store.snapshot().messaging_config.clone());
    store.set_cache_duration(CacheDuration::Unlimited);
    seen.push(store.snapshot().messaging_config.clone());
    store.remove_authorized_user("1");
    seen.push(store.snapshot().messaging_config.clone());
    store.clear_config();
    seen.push(store.snapshot().messaging_config.clone());

    // Assert
    assert_eq!(
        seen,
        vec![
            MessagingConfig::default(),
            with_token.clone(),
            with_user.clone(),
            with_user.clone(),
            with_user,
            with_token,
            MessagingConfig::default(),
        ]
    );
}

// ── Upsert by id ──────────────────────────────────────────────────────────────

#[test]
fn test_add_authorized_user_is_idempotent_on_id() {
    let mut store = store();
    let u = user("7", "ann", "Ann");

    store.add_authorized_user(u.clone());
    let size_after_first = user_ids(&store).len();
    store.add_authorized_user(u.clone());

    assert_eq!(user_ids(&store).len(), size_after_first);
    assert_eq!(user_ids(&store), vec!["7"]);
}

#[test]
fn test_add_authorized_user_latest_content_wins() {
    let mut store = store();
    store.add_authorized_user(user("5", "old", "Sam"));
    store.add_authorized_user(user("5", "new", "Sam"));

    let state = store.snapshot();
    let matching: Vec<_> = state
        .messaging_config
        .authorized_users
        .iter()
        .filter(|u| u.id == "5")
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].username, "new");
}

#[test]
fn test_add_known_user_moves_to_end() {
    let mut store = store();
    store.add_authorized_user(user("1", "a", "A"));
    store.add_authorized_user(user("2", "b", "B"));
    store.add_authorized_user(user("3", "c", "C"));
    store.add_authorized_user(user("1", "a2", "A"));

    assert_eq!(user_ids(&store), vec!["2", "3", "1"]);
}

#[test]
fn test_remove_unknown_user_leaves_list_unchanged() {
    let mut store = store();
    store.add_authorized_user(user("1", "a", "A"));
    store.add_authorized_user(user("2", "b", "B"));
    let before = store.snapshot().messaging_config.clone();

    store.remove_authorized_user("404");

    assert_eq!(store.snapshot().messaging_config, before);
}

// ── Partial merges ────────────────────────────────────────────────────────────

#[test]
fn test_token_only_update_preserves_users() {
    let mut store = store();
    let u = user("1", "a", "A");
    store.add_authorized_user(u.clone());

    store.set_messaging_config(MessagingConfigPatch::bot_token("x"));

    let state = store.snapshot();
    assert_eq!(state.messaging_config.bot_token, "x");
    assert_eq!(state.messaging_config.authorized_users, vec![u]);
}

#[test]
fn test_token_only_update_on_empty_config_keeps_empty_list() {
    let mut store = store();
    store.set_messaging_config(MessagingConfigPatch::bot_token("x"));
    assert!(store.snapshot().messaging_config.authorized_users.is_empty());
}

// ── Reset ─────────────────────────────────────────────────────────────────────

#[test]
fn test_clear_config_keeps_dark_mode_and_cache_duration() {
    let mut store = store();
    store.set_backend_config("t", "b", "p", "o");
    store.set_messaging_config(MessagingConfigPatch::bot_token("x"));
    store.toggle_dark_mode();
    store.set_cache_duration(CacheDuration::Short);

    store.clear_config();

    let state = store.snapshot();
    assert_eq!(state.backend_token, "");
    assert_eq!(state.backend_base_id, "");
    assert_eq!(state.backend_primary_table, "");
    assert_eq!(state.backend_secondary_table, "");
    assert!(!state.is_configured);
    assert_eq!(state.messaging_config, MessagingConfig::default());
    assert!(state.dark_mode);
    assert_eq!(state.cache_duration, CacheDuration::Short);
}

#[test]
fn test_backend_config_survives_later_messaging_update() {
    let mut store = store();
    store.set_backend_config("t", "b", "p", "o");
    assert!(store.snapshot().is_configured);

    store.set_messaging_config(MessagingConfigPatch::bot_token("x"));

    assert!(store.snapshot().is_configured);
}

#[test]
fn test_toggle_dark_mode_twice_restores_value() {
    let mut store = store();
    store.toggle_dark_mode();
    assert!(store.snapshot().dark_mode);
    store.toggle_dark_mode();
    assert!(!store.snapshot().dark_mode);
}

// ── Persistence round-trip ────────────────────────────────────────────────────

#[test]
fn test_restart_reproduces_every_persisted_field() {
    let storage = persisted_after(|store| {
        store.set_backend_config("tok", "base", "Tasks", "Observations");
        store.set_messaging_config(MessagingConfigPatch::bot_token("bot"));
        store.add_authorized_user(user("1", "ada", "Ada"));
        store.add_authorized_user(user("2", "bob", "Bob"));
        store.toggle_dark_mode();
        store.set_cache_duration(CacheDuration::Unlimited);
    });

    let restarted = ConfigStore::new(Box::new(storage));
    let state = restarted.snapshot();

    assert_eq!(state.backend_token, "tok");
    assert_eq!(state.backend_base_id, "base");
    assert_eq!(state.backend_primary_table, "Tasks");
    assert_eq!(state.backend_secondary_table, "Observations");
    assert_eq!(state.messaging_config.bot_token, "bot");
    assert_eq!(
        state.messaging_config.authorized_users,
        vec![user("1", "ada", "Ada"), user("2", "bob", "Bob")]
    );
    assert!(state.dark_mode);
    assert_eq!(state.cache_duration, CacheDuration::Unlimited);
    assert!(state.is_configured);
}

#[test]
fn test_persisted_record_is_projection_of_live_state() {
    let mut expected = ConfigState::default();
    let storage = persisted_after(|store| {
        store.set_backend_config("t", "b", "p", "o");
        store.add_authorized_user(user("1", "a", "A"));
        expected = (*store.snapshot()).clone();
    });

    let raw = storage.raw(STORAGE_KEY).expect("record written");
    let record: PersistedSettings = serde_json::from_str(raw).expect("valid record");

    assert_eq!(record, PersistedSettings::from(&expected));
}

#[test]
fn test_corrupt_record_starts_with_defaults() {
    let storage = MemoryStorage::new().with_item(STORAGE_KEY, "[1, 2, 3]");
    let store = ConfigStore::new(Box::new(storage));
    assert_eq!(*store.snapshot(), ConfigState::default());
}

#[test]
fn test_failed_writes_do_not_block_mutations() {
    let mut storage = MemoryStorage::new();
    storage.set_fail_writes(true);
    let mut store = ConfigStore::new(Box::new(storage));

    store.set_backend_config("t", "b", "p", "o");
    store.add_authorized_user(user("1", "a", "A"));

    let state = store.snapshot();
    assert!(state.is_configured);
    assert_eq!(state.messaging_config.authorized_users.len(), 1);
    assert!(store.persist_error().is_some());
}
