//! The fixed set of user settings the backend persists.

use std::fmt;

/// One persisted, non-secret setting.
///
/// Values travel as strings; boolean keys use `"true"` / `"false"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    SttModel,
    LlmModel,
    /// Language the speech is transcribed in.
    TranscriptionLanguage,
    /// Language of the interface (catalog selection).
    UiLanguage,
    HotkeyBinding,
    DarkMode,
    Autostart,
    /// Skip LLM refinement and inject the raw transcript.
    RawMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::SttModel,
        SettingKey::LlmModel,
        SettingKey::TranscriptionLanguage,
        SettingKey::UiLanguage,
        SettingKey::HotkeyBinding,
        SettingKey::DarkMode,
        SettingKey::Autostart,
        SettingKey::RawMode,
    ];

    /// Key name used by `get_setting` / `set_setting`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::SttModel => "stt_model",
            SettingKey::LlmModel => "llm_model",
            SettingKey::TranscriptionLanguage => "language",
            SettingKey::UiLanguage => "ui_language",
            SettingKey::HotkeyBinding => "hotkey",
            SettingKey::DarkMode => "dark_mode",
            SettingKey::Autostart => "autostart",
            SettingKey::RawMode => "raw_mode",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Built-in value used until the backend reports one, or when reading it
    /// fails.
    pub fn default_value(&self) -> &'static str {
        match self {
            SettingKey::SttModel => "whisper-large-v3",
            SettingKey::LlmModel => "llama-3.3-70b-versatile",
            SettingKey::TranscriptionLanguage => "pt",
            SettingKey::UiLanguage => "en",
            SettingKey::HotkeyBinding => "Ctrl+Shift+Space",
            SettingKey::DarkMode | SettingKey::Autostart | SettingKey::RawMode => "false",
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(
            self,
            SettingKey::DarkMode | SettingKey::Autostart | SettingKey::RawMode
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
