//! Per-window context: one instance of every client component, wired to the
//! backend's event stream for the window's lifetime.
//!
//! # Lifecycle
//!
//! ```text
//! open()
//!   ├─ emitter.subscribe()              (first, so nothing is missed)
//!   ├─ EventBridge, PipelineProjection, LevelBuffer, SettingsStore
//!   ├─ projection + level handlers      (every window)
//!   ├─ NotificationDispatcher + history (main window only)
//!   └─ settings.load()                  (events queue up meanwhile)
//!
//! frame loop:  drain() → render → flush_notifications().await
//!      or:     run().await              (until the transport closes)
//!
//! close() / Drop → every Subscription disposed, receiver released
//! ```
//!
//! Windows never share mutable state.  Two windows opened on the same
//! emitter converge because they observe the same event stream, not because
//! they talk to each other.  Every lifecycle event reaches every window; only
//! level samples may be skipped by a window that falls behind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::audio::{new_shared_levels, SharedLevels};
use crate::backend::{Backend, CommandError};
use crate::config::ClientConfig;
use crate::events::{EventBridge, EventEmitter, EventKind, EventReceiver, PipelineEvent, Subscription};
use crate::history::{estimate_cost, HistoryPager, Transcription};
use crate::i18n::Localizer;
use crate::notify::{NotificationDispatcher, Notifier};
use crate::pipeline::PipelineProjection;
use crate::settings::{SettingKey, SettingsStore};

// ---------------------------------------------------------------------------
// WindowRole
// ---------------------------------------------------------------------------

/// Which surface a context backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    /// Dashboard + settings.  Shows notifications and pages history.
    Main,
    /// Floating recording pill.  State and levels only.
    Overlay,
}

impl WindowRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Overlay => "overlay",
        }
    }
}

impl std::fmt::Display for WindowRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WindowDeps
// ---------------------------------------------------------------------------

/// Collaborators shared by every window of one process.
#[derive(Clone)]
pub struct WindowDeps {
    pub backend: Arc<dyn Backend>,
    pub localizer: Arc<Localizer>,
    pub notifier: Arc<dyn Notifier>,
}

// ---------------------------------------------------------------------------
// WindowContext
// ---------------------------------------------------------------------------

pub struct WindowContext {
    role: WindowRole,
    receiver: Option<EventReceiver>,
    bridge: EventBridge,
    pipeline: Arc<PipelineProjection>,
    levels: SharedLevels,
    settings: Arc<SettingsStore>,
    localizer: Arc<Localizer>,
    backend: Arc<dyn Backend>,
    dispatcher: Option<Arc<NotificationDispatcher>>,
    history: Option<Arc<Mutex<HistoryPager>>>,
    subscriptions: Vec<Subscription>,
    skipped: u64,
}

impl WindowContext {
    /// Open a window: subscribe, build, register, then load settings.
    pub async fn open(
        role: WindowRole,
        emitter: &EventEmitter,
        deps: WindowDeps,
        config: &ClientConfig,
    ) -> Self {
        let receiver = emitter.subscribe();

        let bridge = EventBridge::new();
        let pipeline = Arc::new(PipelineProjection::new(Arc::clone(&deps.backend)));
        let levels = new_shared_levels(config.levels.capacity.max(1));
        let settings = Arc::new(SettingsStore::new(Arc::clone(&deps.backend)));

        let mut subscriptions = pipeline.attach(&bridge);

        let sink = Arc::clone(&levels);
        subscriptions.push(bridge.subscribe(EventKind::Level, move |event| {
            if let PipelineEvent::Level(level) = event {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(*level);
            }
        }));

        let (dispatcher, history) = match role {
            WindowRole::Main => {
                let dispatcher = config.notifications.enabled.then(|| {
                    let dispatcher = Arc::new(NotificationDispatcher::new(
                        Arc::clone(&deps.localizer),
                        Arc::clone(&settings),
                        Arc::clone(&deps.notifier),
                        config.notifications.clone(),
                    ));
                    subscriptions.extend(dispatcher.attach(&bridge));
                    dispatcher
                });

                let history = Arc::new(Mutex::new(HistoryPager::default()));
                let pager = Arc::clone(&history);
                subscriptions.push(bridge.subscribe(EventKind::Complete, move |_| {
                    pager.lock().unwrap_or_else(PoisonError::into_inner).reset();
                }));

                (dispatcher, Some(history))
            }
            WindowRole::Overlay => (None, None),
        };

        settings.load().await;

        log::info!(
            "window {role}: opened with {} subscriptions (ui language '{}')",
            subscriptions.len(),
            settings.get(SettingKey::UiLanguage)
        );

        Self {
            role,
            receiver: Some(receiver),
            bridge,
            pipeline,
            levels,
            settings,
            localizer: deps.localizer,
            backend: deps.backend,
            dispatcher,
            history,
            subscriptions,
            skipped: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn role(&self) -> WindowRole {
        self.role
    }

    pub fn pipeline(&self) -> &Arc<PipelineProjection> {
        &self.pipeline
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn levels(&self) -> &SharedLevels {
        &self.levels
    }

    /// Current level window, oldest first.
    pub fn level_snapshot(&self) -> Vec<f32> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }

    /// Resolve `key` in the window's cached UI language.
    pub fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let language = self.settings.get(SettingKey::UiLanguage);
        self.localizer.resolve(&language, key, params)
    }

    /// Total level samples this window skipped because it fell behind.
    pub fn skipped_events(&self) -> u64 {
        self.skipped
    }

    /// Live subscriptions held by this window.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }

    // -----------------------------------------------------------------------
    // Event pumping
    // -----------------------------------------------------------------------

    /// Apply every event already waiting, without blocking.
    ///
    /// Returns the number of events delivered to the bridge.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(receiver) = self.receiver.as_mut() else {
                break;
            };
            match receiver.try_recv() {
                Ok(raw) => {
                    self.bridge.deliver(&raw);
                    delivered += 1;
                }
                Err(TryRecvError::Lagged(n)) => self.note_lag(n),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    log::info!("window {}: transport closed", self.role);
                    break;
                }
            }
        }
        delivered
    }

    /// Wait for one event and apply it, then flush notifications.
    ///
    /// Returns `false` once the transport is closed (or the window is).
    pub async fn next_event(&mut self) -> bool {
        loop {
            let Some(receiver) = self.receiver.as_mut() else {
                return false;
            };
            match receiver.recv().await {
                Ok(raw) => {
                    self.bridge.deliver(&raw);
                    self.flush_notifications().await;
                    return true;
                }
                Err(RecvError::Lagged(n)) => self.note_lag(n),
                Err(RecvError::Closed) => {
                    log::info!("window {}: transport closed", self.role);
                    return false;
                }
            }
        }
    }

    /// Pump events until the transport closes.  Returns how many were applied.
    pub async fn run(&mut self) -> usize {
        let mut applied = 0;
        while self.next_event().await {
            applied += 1;
        }
        applied
    }

    /// Show every queued notification.  Always 0 on the overlay.
    pub async fn flush_notifications(&self) -> usize {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.flush().await,
            None => 0,
        }
    }

    fn note_lag(&mut self, n: u64) {
        self.skipped += n;
        log::warn!(
            "window {}: fell behind, skipped {n} level samples; resyncing from the newest",
            self.role
        );
    }

    // -----------------------------------------------------------------------
    // History (main window)
    // -----------------------------------------------------------------------

    /// Fetch the next history page.  `Ok(vec![])` on the overlay or once the
    /// list is exhausted.
    pub async fn load_history_page(&self) -> Result<Vec<Transcription>, CommandError> {
        let Some(history) = &self.history else {
            return Ok(Vec::new());
        };
        let query = {
            let pager = history.lock().unwrap_or_else(PoisonError::into_inner);
            if !pager.has_more() {
                return Ok(Vec::new());
            }
            pager.next_query()
        };
        let page = self.backend.list_transcriptions(&query).await?;
        history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_page(page.len());
        Ok(page)
    }

    /// Change the history filter and restart from the first page.
    pub fn set_history_search(&self, search: Option<&str>) {
        if let Some(history) = &self.history {
            pager(history).set_search(search);
        }
    }

    /// Whether another history page may exist.
    pub fn history_has_more(&self) -> bool {
        self.history
            .as_ref()
            .is_some_and(|history| pager(history).has_more())
    }

    /// Delete one stored transcription, then restart paging from the first
    /// page so the list reflects the removal.  The overlay forwards the
    /// command but has no pager to reset.
    pub async fn delete_transcription(&self, id: &str) -> Result<(), CommandError> {
        self.backend.delete_transcription(id).await?;
        if let Some(history) = &self.history {
            pager(history).reset();
        }
        log::debug!("window {}: deleted transcription {id}", self.role);
        Ok(())
    }

    /// Estimated spend in USD from the backend's aggregate stats.
    pub async fn estimated_cost(&self) -> Result<f64, CommandError> {
        let stats = self.backend.get_stats().await?;
        Ok(estimate_cost(&stats))
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Dispose every subscription and release the transport receiver.
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if self.receiver.is_none() && self.subscriptions.is_empty() {
            return;
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        self.receiver = None;
        log::info!("window {}: closed", self.role);
    }
}

fn pager(history: &Mutex<HistoryPager>) -> MutexGuard<'_, HistoryPager> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for WindowContext {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
