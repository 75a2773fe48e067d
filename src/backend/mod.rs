//! Command boundary to the dictation backend.
//!
//! The backend owns audio capture, speech-to-text, refinement, text injection,
//! credential storage and history persistence.  Windows talk to it only
//! through the async [`Backend`] trait (requests) and the broadcast
//! [`EventEmitter`](crate::events::EventEmitter) (notifications).
//!
//! [`SimulatedBackend`] is an in-process implementation used by the demo
//! binary and the test suites.

pub mod simulated;

pub use simulated::{SimulatedBackend, SimulatedRun};

use async_trait::async_trait;
use thiserror::Error;

use crate::history::{HistoryQuery, Transcription, TranscriptionStats};

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// A command the backend rejected or could not be reached for.
///
/// Always surfaced to the immediate caller; never applied to local state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The backend received the command and refused it.
    #[error("backend rejected '{command}': {reason}")]
    Rejected { command: String, reason: String },

    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The requested item does not exist (e.g. no stored API key).
    #[error("not found: {0}")]
    NotFound(String),
}

impl CommandError {
    pub fn rejected(command: &str, reason: impl Into<String>) -> Self {
        CommandError::Rejected {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiKey
// ---------------------------------------------------------------------------

/// Secret credential.  Never printed, never cached by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Async request/response surface of the backend.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Backend>` by every component of every window.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open the microphone.  The backend announces `recording` via an event.
    async fn start_recording(&self) -> Result<(), CommandError>;

    /// Stop recording and run the rest of the pipeline.
    async fn stop_and_process(&self) -> Result<(), CommandError>;

    /// Read one persisted setting; `Ok(None)` when it was never written.
    async fn get_setting(&self, key: &str) -> Result<Option<String>, CommandError>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), CommandError>;

    /// Read the stored credential.  Rejects with [`CommandError::NotFound`]
    /// when none is stored.
    async fn load_api_key(&self) -> Result<ApiKey, CommandError>;

    async fn save_api_key(&self, key: &ApiKey) -> Result<(), CommandError>;

    async fn list_transcriptions(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<Transcription>, CommandError>;

    async fn get_stats(&self) -> Result<TranscriptionStats, CommandError>;

    async fn delete_transcription(&self, id: &str) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("gsk_live_secret");
        let printed = format!("{key:?}");
        assert!(!printed.contains("gsk_live_secret"));
        assert_eq!(key.expose(), "gsk_live_secret");
    }

    #[test]
    fn rejected_error_names_the_command() {
        let err = CommandError::rejected("set_setting", "disk full");
        assert_eq!(err.to_string(), "backend rejected 'set_setting': disk full");
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn Backend> = Box::new(SimulatedBackend::new(Default::default()));
        drop(backend);
    }
}
