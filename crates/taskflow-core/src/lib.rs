//! # taskflow-core
//!
//! Persisted application settings for TaskFlow: backend credentials, the
//! messaging bot's token and authorized users, and a couple of UI
//! preferences.
//!
//! The crate has no OS or file-system dependencies.  Durable storage is
//! reached through the [`KeyValueStorage`] trait, so the same store runs
//! against an in-memory map in tests and a settings file in the application.
//!
//! # Modules
//!
//! - **`domain`** – The settings record and its pure, copy-on-write
//!   transitions (upsert by id, partial merges, reset).
//!
//! - **`persistence`** – The storage seam, the persisted projection written
//!   under the `taskflow-settings` key, and hydration with default
//!   reconciliation.
//!
//! - **`store`** – [`ConfigStore`]: owns the live state, exposes the mutators,
//!   fans changes out to subscribers, and writes through to storage.
//!
//! ```
//! use taskflow_core::{AuthorizedUser, ConfigStore, MemoryStorage};
//!
//! let mut store = ConfigStore::new(Box::new(MemoryStorage::new()));
//! store.set_backend_config("token", "base", "Tasks", "Observations");
//! store.add_authorized_user(AuthorizedUser::new("42", "ada", "Ada"));
//!
//! let state = store.snapshot();
//! assert!(state.is_configured);
//! assert_eq!(state.messaging_config.authorized_users.len(), 1);
//! ```

pub mod domain;
pub mod persistence;
pub mod store;

pub use domain::settings::{
    AuthorizedUser, CacheDuration, ConfigState, MessagingConfig, MessagingConfigPatch,
    ParseCacheDurationError,
};
pub use persistence::memory::MemoryStorage;
pub use persistence::record::PersistedSettings;
pub use persistence::{hydrate, persist, Hydration, KeyValueStorage, StorageError, STORAGE_KEY};
pub use store::{ConfigStore, SubscriptionId};
