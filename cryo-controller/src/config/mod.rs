//! Configuration loading
//!
//! Reads the TOML settings file into a validated
//! [`cryo_core::config::ThresholdConfig`].

pub mod settings;

pub use settings::{load, SettingsError, SettingsFile};
