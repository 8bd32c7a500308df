//! Domain entities for TaskFlow settings.
//!
//! Pure data and pure transitions: no storage access, no logging, no
//! subscribers.  The [`store`](crate::store) layer sequences these
//! transitions and the [`persistence`](crate::persistence) layer decides what
//! of the result is written to disk.

/// Settings record, nested messaging config, and cache-duration enum.
pub mod settings;
