//! Window-side state synchronisation for the VoiceFlow dictation app.
//!
//! One backend process owns the microphone, the transcription pipeline and
//! the persisted settings.  Every UI surface (the main window and the
//! floating overlay) opens a [`window::WindowContext`] that follows the
//! backend's broadcast events and sends it commands:
//!
//! ```text
//!            ┌──────────── Backend (commands) ◀──────────────┐
//!            │                                               │
//!   EventEmitter ──events────▶ WindowContext (main)    ─────┤
//!            │                   ├ EventBridge               │
//!            │                   ├ PipelineProjection ───────┤
//!            │                   ├ LevelBuffer               │
//!            │                   ├ SettingsStore ────────────┘
//!            │                   └ NotificationDispatcher
//!            └────events────▶ WindowContext (overlay)
//! ```

pub mod audio;
pub mod backend;
pub mod config;
pub mod events;
pub mod history;
pub mod i18n;
pub mod notify;
pub mod pipeline;
pub mod settings;
pub mod window;
