//! Bar geometry for the overlay's level meter.
//!
//! The overlay pill draws one thin bar per [`LevelBuffer`](super::LevelBuffer)
//! slot.  Quiet input still shows a stub of `min_height_px`; anything at or
//! above `max_height_px / gain` is drawn at full height.
//!
//! ```rust
//! use voiceflow_client::audio::{MeterStyle, WaveformBars};
//!
//! let bars = WaveformBars::from_levels(&[0.0, 0.0625, 0.5], &MeterStyle::default());
//! assert_eq!(bars.heights_px, vec![2.0, 10.0, 16.0]);
//! ```

/// Scaling rules for turning a level into a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterStyle {
    /// Pixels per unit level before clamping.
    pub gain: f32,
    pub min_height_px: f32,
    pub max_height_px: f32,
    /// Opacity of a silent bar.
    pub base_opacity: f32,
    /// Opacity added per unit level, capped at `1.0 - base_opacity`.
    pub opacity_gain: f32,
}

impl Default for MeterStyle {
    fn default() -> Self {
        Self {
            gain: 160.0,
            min_height_px: 2.0,
            max_height_px: 16.0,
            base_opacity: 0.6,
            opacity_gain: 4.0,
        }
    }
}

/// Heights and opacities for one frame of the meter.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBars {
    pub heights_px: Vec<f32>,
    pub opacities: Vec<f32>,
}

impl WaveformBars {
    /// One bar per level, in the same (oldest-first) order.
    pub fn from_levels(levels: &[f32], style: &MeterStyle) -> Self {
        let headroom = (1.0 - style.base_opacity).max(0.0);
        let heights_px = levels
            .iter()
            .map(|&l| (l * style.gain).clamp(style.min_height_px, style.max_height_px))
            .collect();
        let opacities = levels
            .iter()
            .map(|&l| style.base_opacity + (l.max(0.0) * style.opacity_gain).min(headroom))
            .collect();
        Self {
            heights_px,
            opacities,
        }
    }

    pub fn len(&self) -> usize {
        self.heights_px.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights_px.is_empty()
    }
}
