//! A window's read-only mirror of the backend pipeline.
//!
//! [`PipelineProjection`] holds the last observed [`PipelineState`], the last
//! [`PipelineResult`] and the last error message.  It changes only when the
//! [`EventBridge`] delivers an event:
//!
//! | Event      | state            | last_result | last_error |
//! |------------|------------------|-------------|------------|
//! | `state`    | payload verbatim | kept        | kept       |
//! | `complete` | kept             | payload     | cleared    |
//! | `error`    | forced to `Idle` | kept        | payload    |
//!
//! `complete` deliberately leaves the state alone: the backend follows a
//! successful run with its own `state: idle`.  `error` forces `Idle` because
//! recovery from a failed run must not depend on a second event arriving.
//!
//! The two intents, [`request_start`](PipelineProjection::request_start) and
//! [`request_stop_and_process`](PipelineProjection::request_stop_and_process),
//! only send commands.  Their effect shows up later as events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{Backend, CommandError};
use crate::events::{EventBridge, EventKind, PipelineEvent, Subscription};

use super::state::{PipelineResult, PipelineState};

// ---------------------------------------------------------------------------
// PipelineSnapshot
// ---------------------------------------------------------------------------

/// Consistent copy of everything the projection holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub last_result: Option<PipelineResult>,
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// PipelineProjection
// ---------------------------------------------------------------------------

/// Per-window mirror of the pipeline lifecycle.
pub struct PipelineProjection {
    snapshot: Mutex<PipelineSnapshot>,
    backend: Arc<dyn Backend>,
}

impl PipelineProjection {
    /// Fresh projection: `Idle`, no result, no error.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            snapshot: Mutex::new(PipelineSnapshot::default()),
            backend,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn current_state(&self) -> PipelineState {
        self.lock().state
    }

    pub fn last_result(&self) -> Option<PipelineResult> {
        self.lock().last_result.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.lock().clone()
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    /// Apply one validated event.  `Level` events are not the projection's
    /// concern and are ignored.
    pub fn apply(&self, event: &PipelineEvent) {
        let mut snap = self.lock();
        match event {
            PipelineEvent::State(state) => {
                log::debug!("projection: {} → {}", snap.state, state);
                snap.state = *state;
            }
            PipelineEvent::Complete(result) => {
                log::debug!(
                    "projection: result in {}ms (state stays {})",
                    result.total_latency_ms,
                    snap.state
                );
                snap.last_result = Some(result.clone());
                snap.last_error = None;
            }
            PipelineEvent::Error(message) => {
                log::debug!("projection: error '{message}', {} → idle", snap.state);
                snap.last_error = Some(message.clone());
                snap.state = PipelineState::Idle;
            }
            PipelineEvent::Level(_) => {}
        }
    }

    /// Register this projection's handlers on `bridge`.
    ///
    /// The returned subscriptions keep the projection attached; drop or
    /// dispose them to detach.
    pub fn attach(self: &Arc<Self>, bridge: &EventBridge) -> Vec<Subscription> {
        [EventKind::State, EventKind::Complete, EventKind::Error]
            .into_iter()
            .map(|kind| {
                let this = Arc::clone(self);
                bridge.subscribe(kind, move |event| this.apply(event))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Ask the backend to start recording.
    ///
    /// Only sent while `Idle`; in any other state this returns `Ok(())`
    /// without contacting the backend.  Gating the button is the caller's job.
    pub async fn request_start(&self) -> Result<(), CommandError> {
        let state = self.current_state();
        if state != PipelineState::Idle {
            log::debug!("projection: start ignored while {state}");
            return Ok(());
        }
        self.backend.start_recording().await
    }

    /// Ask the backend to stop recording and process.  Only sent while
    /// `Recording`; otherwise a silent no-op.
    pub async fn request_stop_and_process(&self) -> Result<(), CommandError> {
        let state = self.current_state();
        if state != PipelineState::Recording {
            log::debug!("projection: stop ignored while {state}");
            return Ok(());
        }
        self.backend.stop_and_process().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::events::{EventEmitter, RawEvent};
    use serde_json::json;

    fn attached() -> (Arc<PipelineProjection>, EventBridge, Vec<Subscription>) {
        let backend = Arc::new(SimulatedBackend::new(EventEmitter::default()));
        let projection = Arc::new(PipelineProjection::new(backend));
        let bridge = EventBridge::new();
        let subs = projection.attach(&bridge);
        (projection, bridge, subs)
    }

    fn state(name: &str) -> RawEvent {
        RawEvent::new("pipeline-state", json!({ "state": name }))
    }

    fn complete(total: u64) -> RawEvent {
        RawEvent::new(
            "pipeline-complete",
            json!({
                "raw_text": "a",
                "refined_text": "b",
                "stt_latency_ms": 500,
                "llm_latency_ms": 300,
                "total_latency_ms": total
            }),
        )
    }

    fn error(message: &str) -> RawEvent {
        RawEvent::new("pipeline-error", json!({ "message": message }))
    }

    #[test]
    fn starts_idle_and_empty() {
        let (p, _bridge, _subs) = attached();
        assert_eq!(p.snapshot(), PipelineSnapshot::default());
        assert_eq!(p.current_state(), PipelineState::Idle);
        assert!(p.last_result().is_none());
        assert!(p.last_error().is_none());
    }

    #[test]
    fn state_tracks_latest_event_without_interpolation() {
        let (p, bridge, _subs) = attached();
        // Jumps and repeats are mirrored as-is.
        for name in ["refining", "recording", "recording", "injecting", "encoding", "idle", "transcribing"] {
            bridge.deliver(&state(name));
            assert_eq!(p.current_state().as_str(), name);
        }
    }

    #[test]
    fn unknown_state_keeps_previous() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&state("recording"));
        bridge.deliver(&state("paused"));
        bridge.deliver(&RawEvent::new("pipeline-state", json!(null)));
        assert_eq!(p.current_state(), PipelineState::Recording);
    }

    #[test]
    fn complete_keeps_state_sets_result_clears_error() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&state("recording"));
        assert_eq!(p.current_state(), PipelineState::Recording);

        bridge.deliver(&complete(842));

        assert_eq!(p.current_state(), PipelineState::Recording);
        assert_eq!(p.last_result().map(|r| r.total_latency_ms), Some(842));
        assert_eq!(p.last_error(), None);
    }

    #[test]
    fn complete_clears_previous_error_in_any_state() {
        for s in PipelineState::ALL {
            let (p, bridge, _subs) = attached();
            bridge.deliver(&error("old"));
            bridge.deliver(&state(s.as_str()));
            bridge.deliver(&complete(10));
            assert_eq!(p.last_error(), None);
            assert_eq!(p.current_state(), s);
        }
    }

    #[test]
    fn new_result_replaces_old() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&complete(1));
        bridge.deliver(&complete(2));
        assert_eq!(p.last_result().unwrap().total_latency_ms, 2);
    }

    #[test]
    fn error_forces_idle_from_any_state() {
        for s in PipelineState::ALL {
            let (p, bridge, _subs) = attached();
            bridge.deliver(&state(s.as_str()));
            bridge.deliver(&error("network timeout"));
            assert_eq!(p.current_state(), PipelineState::Idle);
            assert_eq!(p.last_error().as_deref(), Some("network timeout"));
        }
    }

    #[test]
    fn error_from_transcribing_scenario() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&state("transcribing"));
        bridge.deliver(&error("network timeout"));
        assert_eq!(p.current_state().as_str(), "idle");
        assert_eq!(p.last_error().as_deref(), Some("network timeout"));
    }

    #[test]
    fn error_keeps_last_result() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&complete(5));
        bridge.deliver(&error("boom"));
        assert!(p.last_result().is_some());
    }

    #[test]
    fn newer_error_supersedes_older() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&error("first"));
        bridge.deliver(&error("second"));
        assert_eq!(p.last_error().as_deref(), Some("second"));
    }

    #[test]
    fn malformed_complete_is_dropped() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&error("kept"));
        bridge.deliver(&RawEvent::new("pipeline-complete", json!({ "raw_text": "a" })));
        assert!(p.last_result().is_none());
        assert_eq!(p.last_error().as_deref(), Some("kept"));
    }

    #[test]
    fn levels_do_not_touch_projection() {
        let (p, bridge, _subs) = attached();
        bridge.deliver(&state("recording"));
        bridge.deliver(&RawEvent::new("audio-level", json!(0.4)));
        assert_eq!(p.current_state(), PipelineState::Recording);
    }

    #[test]
    fn detached_projection_stops_updating() {
        let (p, bridge, subs) = attached();
        drop(subs);
        bridge.deliver(&state("recording"));
        assert_eq!(p.current_state(), PipelineState::Idle);
    }

    // ---- Intents -----------------------------------------------------------

    #[tokio::test]
    async fn start_is_sent_only_when_idle() {
        let emitter = EventEmitter::new(32);
        let backend = Arc::new(SimulatedBackend::new(emitter.clone()));
        let p = PipelineProjection::new(backend.clone());

        p.request_start().await.unwrap();
        assert_eq!(backend.state(), PipelineState::Recording);
        // Local state is untouched until an event arrives.
        assert_eq!(p.current_state(), PipelineState::Idle);

        p.apply(&PipelineEvent::State(PipelineState::Encoding));
        // Not idle: no-op, no error, even though the backend would reject it.
        p.request_start().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_sent_only_when_recording() {
        let backend = Arc::new(SimulatedBackend::new(EventEmitter::default()).with_api_key("k"));
        let p = PipelineProjection::new(backend.clone());

        p.request_stop_and_process().await.unwrap();
        assert_eq!(backend.state(), PipelineState::Idle);

        backend.start_recording().await.unwrap();
        p.apply(&PipelineEvent::State(PipelineState::Recording));
        p.request_stop_and_process().await.unwrap();
        assert_eq!(backend.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn rejected_command_is_returned_and_leaves_projection_alone() {
        let backend = Arc::new(SimulatedBackend::new(EventEmitter::default()));
        backend.set_unreachable(true);
        let p = PipelineProjection::new(backend);

        let err = p.request_start().await.unwrap_err();
        assert!(matches!(err, CommandError::Unreachable(_)));
        assert_eq!(p.snapshot(), PipelineSnapshot::default());
    }
}
