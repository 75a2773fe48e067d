//! Live microphone level telemetry, window side.
//!
//! ```text
//! audio-level event → LevelBuffer (sliding window) → WaveformBars (overlay)
//! ```
//!
//! The backend samples the microphone; a window only keeps the last few
//! levels for display.

pub mod buffer;
pub mod waveform;

pub use buffer::{new_shared_levels, LevelBuffer, SharedLevels, DEFAULT_LEVEL_CAPACITY};
pub use waveform::{MeterStyle, WaveformBars};
