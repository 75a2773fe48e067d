//! Client configuration structs, defaults and TOML persistence.
//!
//! This is the window side's own configuration.  The user's dictation
//! settings (models, hotkey, language…) live in the backend and are mirrored
//! by [`SettingsStore`](crate::settings::SettingsStore); nothing here is
//! synchronised between windows.
//!
//! Every section is `#[serde(default)]`, so a partial `client.toml` fills the
//! gaps from [`Default`].

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::DEFAULT_LEVEL_CAPACITY;
use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::i18n::DEFAULT_LANGUAGE;

// ---------------------------------------------------------------------------
// LevelsConfig
// ---------------------------------------------------------------------------

/// Audio level meter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    /// Number of samples kept by each window's `LevelBuffer` (one bar each).
    pub capacity: usize,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LEVEL_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationConfig
// ---------------------------------------------------------------------------

/// Transient notification behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// When `false` the main window registers no dispatcher at all.
    pub enabled: bool,
    /// Auto-dismiss delay for "transcribed" toasts.
    pub success_timeout_ms: u64,
    /// Auto-dismiss delay for error toasts.  Longer, so the message can be read.
    pub error_timeout_ms: u64,
}

impl NotificationConfig {
    pub fn success_timeout(&self) -> Duration {
        Duration::from_millis(self.success_timeout_ms)
    }

    pub fn error_timeout(&self) -> Duration {
        Duration::from_millis(self.error_timeout_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            success_timeout_ms: 2_000,
            error_timeout_ms: 4_000,
        }
    }
}

// ---------------------------------------------------------------------------
// I18nConfig
// ---------------------------------------------------------------------------

/// Localization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Catalog consulted when the active UI language lacks a key.
    pub default_language: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventsConfig
// ---------------------------------------------------------------------------

/// Backend → window transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Level samples buffered per window before a slow one starts skipping.
    /// Lifecycle events are never skipped.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level client configuration, serialised as `client.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voiceflow_client::config::ClientConfig;
///
/// // Load (returns Default when file is missing)
/// let config = ClientConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub levels: LevelsConfig,
    pub notifications: NotificationConfig,
    pub i18n: I18nConfig,
    pub events: EventsConfig,
}

impl ClientConfig {
    /// Load configuration from the platform-appropriate `client.toml`.
    ///
    /// Returns `Ok(ClientConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.sanitized())
    }

    /// Save configuration to the platform-appropriate `client.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().config_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace values that would make a component unusable with defaults.
    fn sanitized(mut self) -> Self {
        if self.levels.capacity == 0 {
            log::warn!(
                "config: levels.capacity = 0, using {}",
                DEFAULT_LEVEL_CAPACITY
            );
            self.levels.capacity = DEFAULT_LEVEL_CAPACITY;
        }
        if self.events.channel_capacity == 0 {
            log::warn!(
                "config: events.channel_capacity = 0, using {}",
                DEFAULT_CHANNEL_CAPACITY
            );
            self.events.channel_capacity = DEFAULT_CHANNEL_CAPACITY;
        }
        if self.i18n.default_language.trim().is_empty() {
            self.i18n.default_language = DEFAULT_LANGUAGE.into();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
