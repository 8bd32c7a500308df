//! ConfigStore: the single owner of live settings state.
//!
//! Every mutator follows the same three steps:
//!
//! ```text
//! compute next ConfigState  ──►  notify subscribers (once)  ──►  write projection to storage
//! ```
//!
//! The live value sits behind an `Arc` that is swapped, never edited, so a
//! snapshot handed out earlier keeps describing the state it was taken from.
//!
//! Mutators never fail.  A storage write that errors is logged and remembered
//! (see [`ConfigStore::persist_error`]); the in-memory state stays correct and
//! the next successful write catches the medium up.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::settings::{AuthorizedUser, CacheDuration, ConfigState, MessagingConfigPatch};
use crate::persistence::{self, Hydration, KeyValueStorage, StorageError, STORAGE_KEY};

/// Callback invoked with `(new_state, previous_state)` after each change.
pub type Listener = Box<dyn FnMut(&ConfigState, &ConfigState) + Send>;

/// Handle returned by [`ConfigStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observable, persisted settings store.
pub struct ConfigStore {
    state: Arc<ConfigState>,
    storage: Box<dyn KeyValueStorage>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    hydrated: bool,
    persist_error: Option<String>,
}

impl ConfigStore {
    /// Creates a store and hydrates it from `storage`.
    ///
    /// A missing, unreadable, or corrupt record yields default state.
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        let mut store = Self::with_defaults(storage);
        let hydration = persistence::hydrate(store.storage.as_ref());
        store.state = Arc::new(Self::log_hydration(hydration));
        store.hydrated = true;
        store
    }

    /// Creates a store with default state without reading `storage`.
    ///
    /// Call [`rehydrate`](Self::rehydrate) to load the persisted record later.
    pub fn with_defaults(storage: Box<dyn KeyValueStorage>) -> Self {
        Self {
            state: Arc::new(ConfigState::default()),
            storage,
            listeners: Vec::new(),
            next_subscription: 0,
            hydrated: false,
            persist_error: None,
        }
    }

    // ==================== Reads ====================

    /// Returns a read-only snapshot of the current state.
    pub fn snapshot(&self) -> Arc<ConfigState> {
        Arc::clone(&self.state)
    }

    /// Whether a hydration pass has completed.
    pub fn has_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Message of the last failed storage write, cleared by the next
    /// successful one.
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    /// Key the persisted record lives under.
    pub fn storage_key(&self) -> &'static str {
        STORAGE_KEY
    }

    // ==================== Subscriptions ====================

    /// Registers `listener`; it is called once per state change, after the
    /// listeners registered before it.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ConfigState, &ConfigState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drops a listener.  Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ==================== Mutators ====================

    /// Replaces the four backend fields and marks the store configured.
    pub fn set_backend_config(
        &mut self,
        token: impl Into<String>,
        base_id: impl Into<String>,
        primary_table: impl Into<String>,
        secondary_table: impl Into<String>,
    ) {
        let next = self
            .state
            .with_backend_config(token, base_id, primary_table, secondary_table);
        self.commit("set_backend_config", next);
    }

    /// Merges `patch` into the messaging config.  Omitted fields, including
    /// the user list, are preserved.
    pub fn set_messaging_config(&mut self, patch: MessagingConfigPatch) {
        let next = self.state.with_messaging_patch(patch);
        self.commit("set_messaging_config", next);
    }

    /// Upserts `user` by id; a known id moves to the end with new content.
    pub fn add_authorized_user(&mut self, user: AuthorizedUser) {
        let next = self.state.with_authorized_user(user);
        self.commit("add_authorized_user", next);
    }

    /// Removes the user with `user_id`; unknown ids are ignored.
    pub fn remove_authorized_user(&mut self, user_id: &str) {
        let next = self.state.without_authorized_user(user_id);
        self.commit("remove_authorized_user", next);
    }

    /// Flips the dark-mode preference.
    pub fn toggle_dark_mode(&mut self) {
        let next = self.state.with_dark_mode_toggled();
        self.commit("toggle_dark_mode", next);
    }

    /// Sets how long fetched backend data may be cached.
    pub fn set_cache_duration(&mut self, duration: CacheDuration) {
        let next = self.state.with_cache_duration(duration);
        self.commit("set_cache_duration", next);
    }

    /// Resets backend and messaging credentials.  Dark mode and cache
    /// duration are kept.
    pub fn clear_config(&mut self) {
        let next = self.state.cleared();
        self.commit("clear_config", next);
    }

    // ==================== Persistence ====================

    /// Re-reads the persisted record, replacing live state and notifying
    /// subscribers.  Nothing is written back.
    pub fn rehydrate(&mut self) {
        let hydration = persistence::hydrate(self.storage.as_ref());
        let next = Self::log_hydration(hydration);
        self.hydrated = true;
        self.publish("rehydrate", next);
    }

    /// Writes the current projection immediately and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`StorageError`] if the write fails.
    pub fn persist_now(&mut self) -> Result<(), StorageError> {
        let result = persistence::persist(self.storage.as_mut(), &self.state);
        self.record_write(&result);
        result
    }

    /// Removes the persisted record.  Live state is left as is.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`StorageError`] if the removal fails.
    pub fn clear_storage(&mut self) -> Result<(), StorageError> {
        self.storage.remove_item(STORAGE_KEY)?;
        debug!(key = STORAGE_KEY, "persisted settings removed");
        Ok(())
    }

    // ==================== Internals ====================

    fn commit(&mut self, action: &'static str, next: ConfigState) {
        self.publish(action, next);
        let result = persistence::persist(self.storage.as_mut(), &self.state);
        self.record_write(&result);
    }

    fn publish(&mut self, action: &'static str, next: ConfigState) {
        let previous = std::mem::replace(&mut self.state, Arc::new(next));
        debug!(action, subscribers = self.listeners.len(), "settings updated");
        for (_, listener) in &mut self.listeners {
            listener(&*self.state, &*previous);
        }
    }

    fn record_write(&mut self, result: &Result<(), StorageError>) {
        match result {
            Ok(()) => {
                debug!(key = STORAGE_KEY, "settings persisted");
                self.persist_error = None;
            }
            Err(e) => {
                warn!(key = STORAGE_KEY, error = %e, "failed to persist settings; keeping in-memory state");
                self.persist_error = Some(e.to_string());
            }
        }
    }

    fn log_hydration(hydration: Hydration) -> ConfigState {
        match &hydration {
            Hydration::Missing => info!(key = STORAGE_KEY, "no persisted settings; using defaults"),
            Hydration::Restored(_) => info!(key = STORAGE_KEY, "persisted settings restored"),
            Hydration::Corrupt(reason) => {
                warn!(key = STORAGE_KEY, %reason, "persisted settings are corrupt; using defaults")
            }
            Hydration::Unreadable(e) => {
                warn!(key = STORAGE_KEY, error = %e, "persisted settings unreadable; using defaults")
            }
        }
        hydration.into_state()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("state", &self.state)
            .field("subscribers", &self.listeners.len())
            .field("hydrated", &self.hydrated)
            .field("persist_error", &self.persist_error)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
