//! Fixed-capacity sliding window of microphone levels.
//!
//! The overlay draws one bar per slot.  The buffer starts full of zeros and
//! every [`push`](LevelBuffer::push) overwrites the oldest slot, so its length
//! is always exactly its capacity and it never reallocates.
//!
//! # Example
//!
//! ```rust
//! use voiceflow_client::audio::LevelBuffer;
//!
//! let mut buf = LevelBuffer::new(4);
//! assert_eq!(buf.snapshot(), vec![0.0; 4]);
//!
//! for level in [0.1, 0.2, 0.3, 0.4, 0.5] {
//!     buf.push(level);
//! }
//! assert_eq!(buf.snapshot(), vec![0.2, 0.3, 0.4, 0.5]); // 0.1 evicted
//! ```

use std::sync::{Arc, Mutex};

/// Number of bars in the overlay's level meter.
pub const DEFAULT_LEVEL_CAPACITY: usize = 18;

// ---------------------------------------------------------------------------
// LevelBuffer
// ---------------------------------------------------------------------------

/// A circular FIFO of `f32` levels that is always full.
///
/// Lossy by design: it is a visualisation window, not an audio record.
#[derive(Debug, Clone)]
pub struct LevelBuffer {
    buf: Vec<f32>,
    /// Slot the next push overwrites; also the oldest sample.
    write_pos: usize,
}

impl LevelBuffer {
    /// Create a buffer of `capacity` zeros.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LevelBuffer capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            write_pos: 0,
        }
    }

    /// Append `level`, evicting the oldest.  O(1).
    pub fn push(&mut self, level: f32) {
        self.buf[self.write_pos] = level;
        self.write_pos = (self.write_pos + 1) % self.buf.len();
    }

    /// The last `capacity` levels, oldest first.  O(N), no side effects.
    pub fn snapshot(&self) -> Vec<f32> {
        let (newer, older) = self.buf.split_at(self.write_pos);
        older.iter().chain(newer).copied().collect()
    }

    /// Zero every slot.
    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.write_pos = 0;
    }

    /// Always equal to [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Never true; a level buffer always holds `capacity` samples.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Loudest level currently in the window.
    pub fn peak(&self) -> f32 {
        self.buf.iter().copied().fold(0.0_f32, f32::max)
    }
}

impl Default for LevelBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// SharedLevels
// ---------------------------------------------------------------------------

/// Level buffer shared between a window's `audio-level` handler and its
/// renderer.  Lock briefly; never across `.await`.
pub type SharedLevels = Arc<Mutex<LevelBuffer>>;

pub fn new_shared_levels(capacity: usize) -> SharedLevels {
    Arc::new(Mutex::new(LevelBuffer::new(capacity)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
