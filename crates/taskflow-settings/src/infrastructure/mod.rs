//! Infrastructure layer for the settings application.
//!
//! Contains the OS-facing adapters around `taskflow_core::ConfigStore`: the
//! settings file and the command bridge used by front-ends.
//!
//! **Dependency rule**: this layer depends on `taskflow_core`; the core never
//! imports anything from here.

pub mod command_bridge;
pub mod storage;
