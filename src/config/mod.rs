//! Configuration module for dictcli.
//!
//! Provides `AppConfig` (API, cache and playback configuration persisted as
//! TOML), the learner's practice [`Settings`] with their JSON
//! [`SettingsStore`], and `AppPaths` for cross-platform directories.

pub mod paths;
pub mod practice;
pub mod settings;

pub use paths::AppPaths;
pub use practice::{
    JsonSettingsStore, Level, Settings, SettingsParseError, SettingsStore, Topic, Voice,
};
pub use settings::{AppConfig, CacheConfig, LlmConfig, PlaybackConfig};
