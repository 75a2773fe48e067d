//! Per-window fan-out of validated backend events.
//!
//! An [`EventBridge`] keeps an ordered list of handlers per [`EventKind`].
//! [`deliver`](EventBridge::deliver) decodes a [`RawEvent`] and calls every
//! handler registered for its kind, in registration order.
//!
//! Guarantees:
//!
//! * per-subscriber order equals delivery order;
//! * no replay: a handler registered after an event was delivered never sees it;
//! * no deduplication: registering the same closure twice delivers twice;
//! * a handler disposed while an event is being fanned out is not called for
//!   that event, even if it was registered before delivery started;
//! * a panicking handler is logged and skipped, the rest still run.
//!
//! [`subscribe`](EventBridge::subscribe) returns a [`Subscription`] that
//! unregisters the handler on [`dispose`](Subscription::dispose) or on drop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::payload::{EventKind, PipelineEvent, RawEvent};

/// Boxed event handler.  `Send + Sync` so a window context can be moved onto
/// any tokio task.
pub type Handler = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

struct Entry {
    id: u64,
    kind: EventKind,
    handler: Handler,
    /// Shared with the entry's [`Subscription`]; cleared on dispose.
    alive: Arc<AtomicBool>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }
}

fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// EventBridge
// ---------------------------------------------------------------------------

/// Typed, fan-out delivery of backend events within one window.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use serde_json::json;
/// use voiceflow_client::events::{EventBridge, EventKind, PipelineEvent, RawEvent};
///
/// let bridge = EventBridge::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let sub = bridge.subscribe(EventKind::Level, move |event| {
///     if let PipelineEvent::Level(v) = event {
///         sink.lock().unwrap().push(*v);
///     }
/// });
///
/// bridge.deliver(&RawEvent::new("audio-level", json!(0.5)));
/// sub.dispose();
/// bridge.deliver(&RawEvent::new("audio-level", json!(0.9)));
///
/// assert_eq!(*seen.lock().unwrap(), vec![0.5]);
/// ```
#[derive(Default)]
pub struct EventBridge {
    registry: Arc<Mutex<Registry>>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        let alive = Arc::new(AtomicBool::new(true));
        registry.entries.push(Entry {
            id,
            kind,
            handler: Arc::new(handler),
            alive: Arc::clone(&alive),
        });
        log::debug!("bridge: subscribed #{id} to {}", kind.wire_name());

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            alive,
        }
    }

    /// Decode `raw` and fan it out.  Rejected payloads are logged and dropped.
    ///
    /// Returns the number of handlers that received the event (0 when the
    /// payload was rejected).
    pub fn deliver(&self, raw: &RawEvent) -> usize {
        match PipelineEvent::decode(raw) {
            Ok(event) => self.dispatch(&event),
            Err(e) => {
                log::warn!("bridge: dropping '{}' event: {e}", raw.name);
                0
            }
        }
    }

    /// Fan out an already-validated event.
    pub fn dispatch(&self, event: &PipelineEvent) -> usize {
        let kind = event.kind();

        // Snapshot under the lock, call outside it: handlers may subscribe or
        // dispose while running.  The alive flag is checked per call.
        let handlers: Vec<(u64, Handler, Arc<AtomicBool>)> = lock(&self.registry)
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.id, Arc::clone(&e.handler), Arc::clone(&e.alive)))
            .collect();

        let mut called = 0;
        for (id, handler, alive) in &handlers {
            if !alive.load(Ordering::Acquire) {
                continue;
            }
            called += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
            if outcome.is_err() {
                log::error!(
                    "bridge: handler #{id} panicked on {} event; continuing",
                    kind.wire_name()
                );
            }
        }

        called
    }

    /// Number of live handlers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Disposer returned by [`EventBridge::subscribe`].
///
/// Disposing twice is a no-op.  Dropping the subscription disposes it, so a
/// handler can never outlive the scope that owns its subscription.
#[must_use = "dropping a Subscription immediately unregisters its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    alive: Arc<AtomicBool>,
}

impl Subscription {
    /// Unregister the handler.
    pub fn dispose(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        // The bridge may already be gone; nothing left to unregister then.
        if let Some(registry) = self.registry.upgrade() {
            if lock(&registry).remove(self.id) {
                log::debug!("bridge: disposed #{}", self.id);
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
