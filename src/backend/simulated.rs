//! In-process stand-in for the real dictation backend.
//!
//! [`SimulatedBackend`] implements [`Backend`] against in-memory settings and
//! history, and broadcasts the same event sequence the real pipeline does:
//!
//! ```text
//! start_recording   → state:recording, audio-level × N
//! stop_and_process  → state:encoding → state:transcribing → state:refining
//!                     → state:injecting → pipeline-complete → state:idle
//! failing run       → state:encoding → pipeline-error → state:idle
//! ```
//!
//! Faults can be injected per key (failing reads), globally (rejected writes,
//! unreachable backend) or per run (next run fails with a message).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;

use super::{ApiKey, Backend, CommandError};
use crate::events::{EventEmitter, EventKind};
use crate::history::{word_count, HistoryQuery, Transcription, TranscriptionStats};
use crate::pipeline::{PipelineResult, PipelineState};

// ---------------------------------------------------------------------------
// SimulatedRun
// ---------------------------------------------------------------------------

/// What the next successful run "hears" and how long each stage "takes".
#[derive(Debug, Clone)]
pub struct SimulatedRun {
    pub raw_text: String,
    pub refined_text: String,
    pub stt_latency_ms: u64,
    pub llm_latency_ms: u64,
    /// Levels broadcast right after recording starts.
    pub levels: Vec<f32>,
}

impl Default for SimulatedRun {
    fn default() -> Self {
        Self {
            raw_text: "uh so the meeting is moved to thursday".into(),
            refined_text: "The meeting is moved to Thursday.".into(),
            stt_latency_ms: 480,
            llm_latency_ms: 310,
            levels: vec![0.02, 0.08, 0.21, 0.35, 0.18, 0.09, 0.04],
        }
    }
}

// ---------------------------------------------------------------------------
// SimulatedBackend
// ---------------------------------------------------------------------------

struct Inner {
    state: PipelineState,
    settings: HashMap<String, String>,
    api_key: Option<ApiKey>,
    history: Vec<Transcription>,
    next_id: u64,
    run: SimulatedRun,
    failing_reads: HashSet<String>,
    slow_reads: HashMap<String, Duration>,
    reject_writes: bool,
    unreachable: bool,
    next_failure: Option<String>,
}

/// In-memory [`Backend`] that broadcasts lifecycle events on an
/// [`EventEmitter`].
pub struct SimulatedBackend {
    emitter: EventEmitter,
    inner: Mutex<Inner>,
    /// Pause between stage events; zero in tests.
    step_delay: Duration,
}

impl SimulatedBackend {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            emitter,
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                settings: HashMap::new(),
                api_key: None,
                history: Vec::new(),
                next_id: 1,
                run: SimulatedRun::default(),
                failing_reads: HashSet::new(),
                slow_reads: HashMap::new(),
                reject_writes: false,
                unreachable: false,
                next_failure: None,
            }),
            step_delay: Duration::ZERO,
        }
    }

    /// Pause `delay` between stage events so windows observe them one by one.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_api_key(self, key: &str) -> Self {
        self.inner().api_key = Some(ApiKey::new(key));
        self
    }

    pub fn with_setting(self, key: &str, value: &str) -> Self {
        self.inner().settings.insert(key.to_string(), value.to_string());
        self
    }

    // ── Fault injection ─────────────────────────────────────────────────

    /// Every subsequent `get_setting(key)` rejects.
    pub fn fail_reads_of(&self, key: &str) {
        self.inner().failing_reads.insert(key.to_string());
    }

    /// `get_setting(key)` takes its answer immediately but replies only after
    /// `delay`, like a response still in flight.
    pub fn delay_reads_of(&self, key: &str, delay: Duration) {
        self.inner().slow_reads.insert(key.to_string(), delay);
    }

    /// Reject every `set_setting` / `save_api_key` while `reject` is set.
    pub fn reject_writes(&self, reject: bool) {
        self.inner().reject_writes = reject;
    }

    /// Every command fails with [`CommandError::Unreachable`] while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner().unreachable = unreachable;
    }

    /// The next `stop_and_process` fails with `message`.
    pub fn fail_next_run(&self, message: &str) {
        self.inner().next_failure = Some(message.to_string());
    }

    pub fn set_run(&self, run: SimulatedRun) {
        self.inner().run = run;
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn state(&self) -> PipelineState {
        self.inner().state
    }

    pub fn stored_setting(&self, key: &str) -> Option<String> {
        self.inner().settings.get(key).cloned()
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self) -> Result<(), CommandError> {
        if self.inner().unreachable {
            return Err(CommandError::Unreachable("simulated backend offline".into()));
        }
        Ok(())
    }

    async fn enter(&self, state: PipelineState) {
        self.inner().state = state;
        self.emitter
            .emit(EventKind::State, &json!({ "state": state.as_str() }));
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }

    async fn fail_run(&self, message: String) -> Result<(), CommandError> {
        log::warn!("simulated backend: run failed: {message}");
        self.emitter
            .emit(EventKind::Error, &json!({ "message": message }));
        self.enter(PipelineState::Idle).await;
        Err(CommandError::rejected("stop_and_process", message))
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn start_recording(&self) -> Result<(), CommandError> {
        self.check_reachable()?;
        let levels = {
            let inner = self.inner();
            if inner.state != PipelineState::Idle {
                return Err(CommandError::rejected(
                    "start_recording",
                    format!("pipeline is {}", inner.state),
                ));
            }
            inner.run.levels.clone()
        };

        self.enter(PipelineState::Recording).await;
        for level in levels {
            self.emitter.emit(EventKind::Level, &level);
        }
        Ok(())
    }

    async fn stop_and_process(&self) -> Result<(), CommandError> {
        self.check_reachable()?;
        let (run, failure, has_key, raw_mode) = {
            let mut inner = self.inner();
            if inner.state != PipelineState::Recording {
                return Err(CommandError::rejected(
                    "stop_and_process",
                    format!("pipeline is {}", inner.state),
                ));
            }
            let has_key = inner.api_key.as_ref().is_some_and(|k| !k.is_empty());
            let raw_mode = inner.settings.get("raw_mode").map(String::as_str) == Some("true");
            (inner.run.clone(), inner.next_failure.take(), has_key, raw_mode)
        };

        self.enter(PipelineState::Encoding).await;

        if let Some(message) = failure {
            return self.fail_run(message).await;
        }
        if !has_key {
            return self
                .fail_run("No API key configured. Set it in Settings.".into())
                .await;
        }

        self.enter(PipelineState::Transcribing).await;

        let (refined_text, llm_latency_ms) = if raw_mode {
            (run.raw_text.clone(), 0)
        } else {
            self.enter(PipelineState::Refining).await;
            (run.refined_text.clone(), run.llm_latency_ms)
        };

        self.enter(PipelineState::Injecting).await;

        let result = PipelineResult {
            raw_text: run.raw_text.clone(),
            refined_text,
            stt_latency_ms: run.stt_latency_ms,
            llm_latency_ms,
            total_latency_ms: run.stt_latency_ms + llm_latency_ms + 52,
        };

        {
            let mut inner = self.inner();
            let id = format!("tx-{}", inner.next_id);
            inner.next_id += 1;
            let created_at = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
                .to_string();
            inner.history.push(Transcription {
                id,
                raw_text: result.raw_text.clone(),
                refined_text: result.refined_text.clone(),
                stt_latency_ms: result.stt_latency_ms as i64,
                llm_latency_ms: result.llm_latency_ms as i64,
                word_count: word_count(&result.refined_text),
                created_at,
            });
        }

        self.emitter.emit(EventKind::Complete, &result);
        self.enter(PipelineState::Idle).await;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, CommandError> {
        self.check_reachable()?;
        let (value, delay) = {
            let inner = self.inner();
            if inner.failing_reads.contains(key) {
                return Err(CommandError::rejected("get_setting", format!("cannot read '{key}'")));
            }
            (inner.settings.get(key).cloned(), inner.slow_reads.get(key).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), CommandError> {
        self.check_reachable()?;
        let mut inner = self.inner();
        if inner.reject_writes {
            return Err(CommandError::rejected("set_setting", "database is read-only"));
        }
        inner.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn load_api_key(&self) -> Result<ApiKey, CommandError> {
        self.check_reachable()?;
        self.inner()
            .api_key
            .clone()
            .ok_or_else(|| CommandError::NotFound("api key".into()))
    }

    async fn save_api_key(&self, key: &ApiKey) -> Result<(), CommandError> {
        self.check_reachable()?;
        let mut inner = self.inner();
        if inner.reject_writes {
            return Err(CommandError::rejected("save_api_key", "keychain locked"));
        }
        inner.api_key = Some(key.clone());
        Ok(())
    }

    async fn list_transcriptions(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<Transcription>, CommandError> {
        self.check_reachable()?;
        let needle = query.search.as_deref().map(str::to_lowercase);
        let inner = self.inner();
        Ok(inner
            .history
            .iter()
            .rev()
            .filter(|t| match &needle {
                Some(n) => {
                    t.raw_text.to_lowercase().contains(n)
                        || t.refined_text.to_lowercase().contains(n)
                }
                None => true,
            })
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_stats(&self) -> Result<TranscriptionStats, CommandError> {
        self.check_reachable()?;
        let inner = self.inner();
        let total = inner.history.len() as i64;
        let words: i64 = inner.history.iter().map(|t| t.word_count).sum();
        let avg = |f: fn(&Transcription) -> i64| {
            if total == 0 {
                0.0
            } else {
                inner.history.iter().map(f).sum::<i64>() as f64 / total as f64
            }
        };
        // Everything in a simulated session happened today.
        Ok(TranscriptionStats {
            total_transcriptions: total,
            total_words: words,
            words_today: words,
            words_this_week: words,
            words_this_month: words,
            avg_stt_latency_ms: avg(|t| t.stt_latency_ms),
            avg_llm_latency_ms: avg(|t| t.llm_latency_ms),
        })
    }

    async fn delete_transcription(&self, id: &str) -> Result<(), CommandError> {
        self.check_reachable()?;
        let mut inner = self.inner();
        let before = inner.history.len();
        inner.history.retain(|t| t.id != id);
        if inner.history.len() == before {
            return Err(CommandError::NotFound(format!("transcription {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
