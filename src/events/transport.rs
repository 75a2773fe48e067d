//! Transport between the backend and every open window.
//!
//! [`EventEmitter`] is the backend's half: it serialises a payload and sends a
//! [`RawEvent`] to every live receiver.  Each window takes its own
//! [`EventReceiver`] via [`EventEmitter::subscribe`] and owns it for the
//! window's lifetime.
//!
//! Events travel on two channels:
//!
//! ```text
//!                 ┌─ state / complete / error ──▶ unbounded mpsc per window (lossless)
//! EventEmitter ───┤
//!                 └─ audio-level ───────────────▶ bounded broadcast (lossy)
//! ```
//!
//! Lifecycle events are rare and each one matters, so every window gets all
//! of them in order.  Level samples arrive at frame rate and only the most
//! recent ones are drawn: a window that falls more than `capacity` samples
//! behind skips the oldest and picks up from the newest.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::mpsc;

use super::payload::{EventKind, RawEvent};

/// Default number of level samples buffered per receiver.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type LifecycleSenders = Arc<Mutex<Vec<mpsc::UnboundedSender<RawEvent>>>>;

// ---------------------------------------------------------------------------
// EventEmitter
// ---------------------------------------------------------------------------

/// Backend-side event sender.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    lifecycle: LifecycleSenders,
    levels: broadcast::Sender<RawEvent>,
}

impl EventEmitter {
    /// Create an emitter whose receivers buffer up to `capacity` level
    /// samples.  Lifecycle events are never dropped.
    pub fn new(capacity: usize) -> Self {
        let (levels, _) = broadcast::channel(capacity.max(1));
        Self {
            lifecycle: Arc::new(Mutex::new(Vec::new())),
            levels,
        }
    }

    fn senders(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<RawEvent>>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New receiver.  It only observes events emitted after this call.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders().push(tx);
        EventReceiver {
            lifecycle: rx,
            levels: self.levels.subscribe(),
            lifecycle_open: true,
            levels_open: true,
        }
    }

    /// Send `payload` under `kind`'s wire name.
    ///
    /// Returns how many receivers were reached; zero when no window is open,
    /// which is not an error.
    pub fn emit<T: Serialize>(&self, kind: EventKind, payload: &T) -> usize {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit_raw(RawEvent::new(kind.wire_name(), value)),
            Err(e) => {
                log::error!("emitter: cannot serialise {} payload: {e}", kind.wire_name());
                0
            }
        }
    }

    /// Send an already-built event.  Unknown names go the lossless way so
    /// the window can report them.
    pub fn emit_raw(&self, event: RawEvent) -> usize {
        if EventKind::from_wire(&event.name) == Some(EventKind::Level) {
            return self.levels.send(event).unwrap_or(0);
        }
        let mut senders = self.senders();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        senders.len()
    }

    /// Number of windows still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        let mut senders = self.senders();
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// EventReceiver
// ---------------------------------------------------------------------------

/// Window-side receiver.  Pending lifecycle events are handed out before
/// pending level samples.
///
/// Errors use the broadcast error types: `Lagged(n)` means `n` level samples
/// were skipped, `Closed` means every emitter is gone.
#[derive(Debug)]
pub struct EventReceiver {
    lifecycle: mpsc::UnboundedReceiver<RawEvent>,
    levels: broadcast::Receiver<RawEvent>,
    lifecycle_open: bool,
    levels_open: bool,
}

impl EventReceiver {
    /// Next pending event without waiting.
    pub fn try_recv(&mut self) -> Result<RawEvent, TryRecvError> {
        let lifecycle_closed = match self.lifecycle.try_recv() {
            Ok(event) => return Ok(event),
            Err(mpsc::error::TryRecvError::Empty) => false,
            Err(mpsc::error::TryRecvError::Disconnected) => true,
        };
        match self.levels.try_recv() {
            Ok(event) => Ok(event),
            Err(TryRecvError::Lagged(n)) => Err(TryRecvError::Lagged(n)),
            Err(TryRecvError::Empty | TryRecvError::Closed) if lifecycle_closed => {
                Err(TryRecvError::Closed)
            }
            Err(_) => Err(TryRecvError::Empty),
        }
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Result<RawEvent, RecvError> {
        loop {
            if !self.lifecycle_open && !self.levels_open {
                return Err(RecvError::Closed);
            }
            tokio::select! {
                biased;
                event = self.lifecycle.recv(), if self.lifecycle_open => match event {
                    Some(event) => return Ok(event),
                    None => self.lifecycle_open = false,
                },
                level = self.levels.recv(), if self.levels_open => match level {
                    Ok(event) => return Ok(event),
                    Err(RecvError::Lagged(n)) => return Err(RecvError::Lagged(n)),
                    Err(RecvError::Closed) => self.levels_open = false,
                },
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
