use serde::{Deserialize, Serialize};

/// Decoder tuning knobs.
///
/// The default profile targets source-side images (exact pixel colors from
/// a GIF or screenshot); [`TuningConfig::camera`] targets live camera
/// frames, where lighting drifts and the perceptual-hash symbol matcher
/// earns its keep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Von Kries chromatic adaptation from the finder-corner white cells.
    pub enable_white_balance: bool,
    /// Classify colors on channel differences after range-stretching
    /// instead of raw weighted RGB distance.
    pub use_relative_color: bool,
    /// Use the perceptual-hash symbol matcher with drift tracking instead
    /// of the quadrant threshold.
    pub use_hash_detection: bool,
    /// Multiplicative luma threshold for the quadrant symbol test; `None`
    /// selects the additive source-side formula.
    pub symbol_threshold: Option<f32>,
    /// Corner inset of the quadrant sample points, as a fraction of the
    /// cell size.
    pub quadrant_offset: f32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            enable_white_balance: false,
            use_relative_color: false,
            use_hash_detection: false,
            symbol_threshold: None,
            quadrant_offset: 0.28,
        }
    }
}

impl TuningConfig {
    /// Profile for live camera feeds.
    pub fn camera() -> Self {
        Self {
            enable_white_balance: true,
            use_relative_color: true,
            use_hash_detection: true,
            symbol_threshold: Some(0.85),
            quadrant_offset: 0.28,
        }
    }
}
