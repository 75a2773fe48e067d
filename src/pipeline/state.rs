//! Pipeline lifecycle values mirrored from the backend.
//!
//! [`PipelineState`] is the backend's current stage for the single in-flight
//! dictation run.  [`PipelineResult`] is the record the backend broadcasts when
//! a run finishes successfully.
//!
//! Both types decode straight from the backend's JSON payloads; the wire form
//! of a state is its lowercase name (`"recording"`, `"idle"`, …).

use serde::{de, Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Stages of the backend-owned dictation pipeline.
///
/// The backend drives the transitions:
///
/// ```text
/// Idle ──start──▶ Recording ──stop──▶ Encoding ──▶ Transcribing
///                                        ──▶ Refining ──▶ Injecting ──▶ Idle
/// any stage ──error──▶ Idle
/// ```
///
/// The client never walks this graph itself; it only mirrors the most recently
/// received value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing in flight.  The only state that accepts a start request.
    #[default]
    Idle,

    /// Microphone is open; `audio-level` events stream in.
    Recording,

    /// Captured samples are being encoded for upload.
    Encoding,

    /// Speech-to-text request in flight.
    Transcribing,

    /// LLM refinement request in flight.
    Refining,

    /// Final text is being typed into the focused field.
    Injecting,
}

impl PipelineState {
    /// Every state, in pipeline order.
    pub const ALL: [PipelineState; 6] = [
        PipelineState::Idle,
        PipelineState::Recording,
        PipelineState::Encoding,
        PipelineState::Transcribing,
        PipelineState::Refining,
        PipelineState::Injecting,
    ];

    /// Returns `true` for the post-recording stages the overlay renders as
    /// "processing".
    ///
    /// ```
    /// use voiceflow_client::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_processing());
    /// assert!(!PipelineState::Recording.is_processing());
    /// assert!(PipelineState::Encoding.is_processing());
    /// assert!(PipelineState::Injecting.is_processing());
    /// ```
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            PipelineState::Encoding
                | PipelineState::Transcribing
                | PipelineState::Refining
                | PipelineState::Injecting
        )
    }

    /// Wire name used in `pipeline-state` payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Recording => "recording",
            PipelineState::Encoding => "encoding",
            PipelineState::Transcribing => "transcribing",
            PipelineState::Refining => "refining",
            PipelineState::Injecting => "injecting",
        }
    }

    /// Parse a wire name.  Returns `None` for anything outside the enum.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Catalog key of the status label shown next to the recording indicator.
    pub fn label_key(&self) -> &'static str {
        match self {
            PipelineState::Idle => "pipeline.idle",
            PipelineState::Recording => "pipeline.recording",
            PipelineState::Encoding => "pipeline.encoding",
            PipelineState::Transcribing => "pipeline.transcribing",
            PipelineState::Refining => "pipeline.refining",
            PipelineState::Injecting => "pipeline.injecting",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineResult
// ---------------------------------------------------------------------------

/// Outcome of one successful dictation run, as broadcast by the backend.
///
/// Field names follow the backend's snake_case payload; camelCase aliases are
/// accepted as well.  Latencies may arrive as floats (`842.0`); see
/// [`latency_ms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unmodified speech-to-text output.
    #[serde(alias = "rawText")]
    pub raw_text: String,

    /// Text after LLM refinement (equal to `raw_text` in raw mode).
    #[serde(alias = "refinedText")]
    pub refined_text: String,

    #[serde(alias = "sttLatencyMs", deserialize_with = "latency_ms")]
    pub stt_latency_ms: u64,

    #[serde(alias = "llmLatencyMs", deserialize_with = "latency_ms")]
    pub llm_latency_ms: u64,

    /// Wall time from stop request to injected text.
    #[serde(alias = "totalLatencyMs", deserialize_with = "latency_ms")]
    pub total_latency_ms: u64,
}

/// Whole milliseconds from a JSON number.  Floats are rounded to the nearest
/// millisecond; negative or non-finite values reject the payload.
fn latency_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = serde_json::Number::deserialize(deserializer)?;
    if let Some(ms) = n.as_u64() {
        return Ok(ms);
    }
    match n.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 && ms < u64::MAX as f64 => Ok(ms.round() as u64),
        _ => Err(de::Error::custom(format!(
            "invalid latency {n}: expected non-negative milliseconds"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    #[test]
    fn wire_names_round_trip_through_from_wire() {
        for state in PipelineState::ALL {
            assert_eq!(PipelineState::from_wire(state.as_str()), Some(state));
        }
    }

    #[test]
    fn from_wire_rejects_unknown_and_wrong_case() {
        assert_eq!(PipelineState::from_wire("paused"), None);
        assert_eq!(PipelineState::from_wire("Recording"), None);
        assert_eq!(PipelineState::from_wire(""), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&PipelineState::Transcribing).unwrap();
        assert_eq!(json, "\"transcribing\"");

        let state: PipelineState = serde_json::from_str("\"refining\"").unwrap();
        assert_eq!(state, PipelineState::Refining);
    }

    #[test]
    fn only_post_recording_stages_are_processing() {
        let processing: Vec<_> = PipelineState::ALL
            .iter()
            .filter(|s| s.is_processing())
            .collect();
        assert_eq!(processing.len(), 4);
        assert!(!PipelineState::Recording.is_processing());
    }

    #[test]
    fn label_keys_live_under_pipeline_namespace() {
        for state in PipelineState::ALL {
            assert!(state.label_key().starts_with("pipeline."));
        }
    }

    #[test]
    fn result_accepts_snake_and_camel_case() {
        let snake = r#"{"raw_text":"a","refined_text":"b","stt_latency_ms":1,"llm_latency_ms":2,"total_latency_ms":3}"#;
        let camel = r#"{"rawText":"a","refinedText":"b","sttLatencyMs":1,"llmLatencyMs":2,"totalLatencyMs":3}"#;

        let a: PipelineResult = serde_json::from_str(snake).unwrap();
        let b: PipelineResult = serde_json::from_str(camel).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total_latency_ms, 3);
    }

    #[test]
    fn float_latencies_are_read_as_whole_milliseconds() {
        let json = r#"{"raw_text":"a","refined_text":"b","stt_latency_ms":480.0,"llm_latency_ms":309.6,"totalLatencyMs":842.0}"#;
        let result: PipelineResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.stt_latency_ms, 480);
        assert_eq!(result.llm_latency_ms, 310);
        assert_eq!(result.total_latency_ms, 842);
    }

    #[test]
    fn negative_or_non_numeric_latency_is_rejected() {
        for latency in ["-1", "-0.5", "\"842\"", "null"] {
            let json = format!(
                r#"{{"raw_text":"a","refined_text":"b","stt_latency_ms":1,"llm_latency_ms":2,"total_latency_ms":{latency}}}"#
            );
            assert!(
                serde_json::from_str::<PipelineResult>(&json).is_err(),
                "accepted {latency}"
            );
        }
    }
}
