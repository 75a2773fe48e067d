//! Configuration module for the VoiceFlow window client.
//!
//! Provides `ClientConfig` (top-level settings), one sub-config per concern,
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `ClientConfig::load` / `ClientConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ClientConfig, EventsConfig, I18nConfig, LevelsConfig, NotificationConfig};
