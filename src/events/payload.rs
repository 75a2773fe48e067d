//! Decode-and-validate step between the raw transport and typed subscribers.
//!
//! The backend broadcasts [`RawEvent`]s: a name plus an untyped JSON payload.
//! [`PipelineEvent::decode`] turns one into a typed event or a
//! [`TransportError`].  Nothing past this point ever sees an unchecked
//! payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::pipeline::{PipelineResult, PipelineState};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The four kinds of backend event a window can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    State,
    Complete,
    Error,
    Level,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::State,
        EventKind::Complete,
        EventKind::Error,
        EventKind::Level,
    ];

    /// Event name on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::State => "pipeline-state",
            EventKind::Complete => "pipeline-complete",
            EventKind::Error => "pipeline-error",
            EventKind::Level => "audio-level",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.wire_name() == name)
    }
}

// ---------------------------------------------------------------------------
// RawEvent
// ---------------------------------------------------------------------------

/// An event exactly as it travels over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub name: String,
    pub payload: Value,
}

impl RawEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Why a raw event was rejected at the boundary.
///
/// These are logged and dropped; they never reach a caller or the user.
#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("unknown event name '{0}'")]
    UnknownEvent(String),

    #[error("unknown pipeline state '{0}'")]
    UnknownState(String),

    #[error("malformed {kind:?} payload: {reason}")]
    Malformed { kind: EventKind, reason: String },

    #[error("audio level is not a finite number: {0}")]
    NonFiniteLevel(f64),
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A validated backend event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The backend entered a new stage.
    State(PipelineState),
    /// A run finished successfully.
    Complete(PipelineResult),
    /// A run failed; carries the backend's message.
    Error(String),
    /// One microphone amplitude sample, clamped to `[0.0, 1.0]`.
    Level(f32),
}

/// `{"state": "..."}`; the state is read as a string first so an unknown
/// value can be reported as such rather than as a generic shape error.
#[derive(Deserialize)]
struct StatePayload {
    state: String,
}

/// The backend has sent errors both as `{"message": ...}` and as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Object { message: String },
    Bare(String),
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::State(_) => EventKind::State,
            PipelineEvent::Complete(_) => EventKind::Complete,
            PipelineEvent::Error(_) => EventKind::Error,
            PipelineEvent::Level(_) => EventKind::Level,
        }
    }

    /// Validate a raw event.
    ///
    /// ```
    /// use serde_json::json;
    /// use voiceflow_client::events::{PipelineEvent, RawEvent};
    /// use voiceflow_client::pipeline::PipelineState;
    ///
    /// let raw = RawEvent::new("pipeline-state", json!({ "state": "recording" }));
    /// assert_eq!(
    ///     PipelineEvent::decode(&raw),
    ///     Ok(PipelineEvent::State(PipelineState::Recording)),
    /// );
    ///
    /// let bad = RawEvent::new("pipeline-state", json!({ "state": "paused" }));
    /// assert!(PipelineEvent::decode(&bad).is_err());
    /// ```
    pub fn decode(raw: &RawEvent) -> Result<Self, TransportError> {
        let kind = EventKind::from_wire(&raw.name)
            .ok_or_else(|| TransportError::UnknownEvent(raw.name.clone()))?;

        let malformed = |e: serde_json::Error| TransportError::Malformed {
            kind,
            reason: e.to_string(),
        };

        match kind {
            EventKind::State => {
                let payload = StatePayload::deserialize(&raw.payload).map_err(malformed)?;
                PipelineState::from_wire(&payload.state)
                    .map(PipelineEvent::State)
                    .ok_or(TransportError::UnknownState(payload.state))
            }
            EventKind::Complete => PipelineResult::deserialize(&raw.payload)
                .map(PipelineEvent::Complete)
                .map_err(malformed),
            EventKind::Error => {
                let message = match ErrorPayload::deserialize(&raw.payload).map_err(malformed)? {
                    ErrorPayload::Object { message } => message,
                    ErrorPayload::Bare(message) => message,
                };
                Ok(PipelineEvent::Error(message))
            }
            EventKind::Level => {
                let level = raw.payload.as_f64().ok_or_else(|| TransportError::Malformed {
                    kind,
                    reason: format!("expected a number, got {}", raw.payload),
                })?;
                if !level.is_finite() {
                    return Err(TransportError::NonFiniteLevel(level));
                }
                Ok(PipelineEvent::Level(level.clamp(0.0, 1.0) as f32))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(name: &str, payload: Value) -> Result<PipelineEvent, TransportError> {
        PipelineEvent::decode(&RawEvent::new(name, payload))
    }

    #[test]
    fn every_state_decodes() {
        for state in PipelineState::ALL {
            let event = decode("pipeline-state", json!({ "state": state.as_str() })).unwrap();
            assert_eq!(event, PipelineEvent::State(state));
        }
    }

    #[test]
    fn unknown_state_is_reported_by_name() {
        let err = decode("pipeline-state", json!({ "state": "paused" })).unwrap_err();
        assert_eq!(err, TransportError::UnknownState("paused".into()));
    }

    #[test]
    fn state_without_field_is_malformed() {
        let err = decode("pipeline-state", json!({ "stage": "idle" })).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Malformed {
                kind: EventKind::State,
                ..
            }
        ));
    }

    #[test]
    fn complete_decodes_full_result() {
        let event = decode(
            "pipeline-complete",
            json!({
                "raw_text": "a",
                "refined_text": "b",
                "stt_latency_ms": 500,
                "llm_latency_ms": 300,
                "total_latency_ms": 842
            }),
        )
        .unwrap();

        match event {
            PipelineEvent::Complete(result) => {
                assert_eq!(result.refined_text, "b");
                assert_eq!(result.total_latency_ms, 842);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn complete_with_float_latencies_is_delivered() {
        let event = decode(
            "pipeline-complete",
            json!({
                "rawText": "a",
                "refinedText": "b",
                "sttLatencyMs": 480.0,
                "llmLatencyMs": 310.0,
                "totalLatencyMs": 842.0
            }),
        )
        .unwrap();
        assert!(matches!(event, PipelineEvent::Complete(r) if r.total_latency_ms == 842));

        let err = decode(
            "pipeline-complete",
            json!({
                "raw_text": "a",
                "refined_text": "b",
                "stt_latency_ms": -1,
                "llm_latency_ms": 0,
                "total_latency_ms": 0
            }),
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Malformed { kind: EventKind::Complete, .. }));
    }

    #[test]
    fn complete_missing_latency_is_malformed() {
        let err = decode(
            "pipeline-complete",
            json!({ "raw_text": "a", "refined_text": "b" }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Malformed {
                kind: EventKind::Complete,
                ..
            }
        ));
    }

    #[test]
    fn error_accepts_object_and_bare_string() {
        assert_eq!(
            decode("pipeline-error", json!({ "message": "network timeout" })).unwrap(),
            PipelineEvent::Error("network timeout".into())
        );
        assert_eq!(
            decode("pipeline-error", json!("network timeout")).unwrap(),
            PipelineEvent::Error("network timeout".into())
        );
    }

    #[test]
    fn error_with_numeric_payload_is_malformed() {
        assert!(decode("pipeline-error", json!(42)).is_err());
    }

    #[test]
    fn level_is_clamped_into_unit_range() {
        assert_eq!(
            decode("audio-level", json!(0.25)).unwrap(),
            PipelineEvent::Level(0.25)
        );
        assert_eq!(
            decode("audio-level", json!(1.7)).unwrap(),
            PipelineEvent::Level(1.0)
        );
        assert_eq!(
            decode("audio-level", json!(-0.2)).unwrap(),
            PipelineEvent::Level(0.0)
        );
    }

    #[test]
    fn level_must_be_a_number() {
        assert!(decode("audio-level", json!("loud")).is_err());
        assert!(decode("audio-level", Value::Null).is_err());
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let err = decode("pipeline-paused", json!({})).unwrap_err();
        assert_eq!(err, TransportError::UnknownEvent("pipeline-paused".into()));
    }

    #[test]
    fn kind_matches_wire_name() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.wire_name()), Some(kind));
        }
    }
}
