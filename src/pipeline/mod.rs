//! Client-side view of the backend's dictation pipeline.
//!
//! # Architecture
//!
//! ```text
//! backend ──pipeline-state / -complete / -error──▶ EventBridge
//!                                                     │
//!                                                     ▼
//!                                          PipelineProjection::apply()
//!                                                     │
//!                  renderer ◀── current_state() / last_result() / last_error()
//!
//! renderer ──request_start() / request_stop_and_process()──▶ Backend
//! ```
//!
//! The projection is a follower: it never computes a state on its own, it
//! mirrors what the backend broadcast last.

pub mod projection;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use projection::{PipelineProjection, PipelineSnapshot};
pub use state::{PipelineResult, PipelineState};
