//! Backend → window event plumbing.
//!
//! ```text
//! backend ──EventEmitter──▶ lifecycle + level channels ──▶ window A receiver ──▶ EventBridge A ──▶ handlers
//!                                                      └─▶ window B receiver ──▶ EventBridge B ──▶ handlers
//! ```
//!
//! * [`EventEmitter`] / [`EventReceiver`]: the two ends of the transport.
//! * [`RawEvent`] / [`PipelineEvent`]: wire form and validated form.
//! * [`EventBridge`] / [`Subscription`]: per-window fan-out and its disposer.
//! * [`TransportError`]: why a payload was dropped at the boundary.

pub mod bridge;
pub mod payload;
pub mod transport;

pub use bridge::{EventBridge, Handler, Subscription};
pub use payload::{EventKind, PipelineEvent, RawEvent, TransportError};
pub use transport::{EventEmitter, EventReceiver, DEFAULT_CHANNEL_CAPACITY};
