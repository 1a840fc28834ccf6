//! Tracking configuration
//!
//! All thresholds and window sizes consumed by the game engines live here.
//! Out-of-range values are clamped, never rejected.

use serde::{Deserialize, Serialize};

/// Default movement threshold (pixels for gaze hold, /1000 for follow metrics)
pub const DEFAULT_MOVE_THRESHOLD: f64 = 10.0;
/// Default sampling interval between analyzed frames
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 450;
/// Default minimum confidence before a passing window counts
pub const DEFAULT_CONFIDENCE_MINIMUM: u8 = 90;
/// Default minimum time between two accepted blinks
pub const DEFAULT_BLINK_DEBOUNCE_MS: u64 = 300;

/// Window size bounds for the follow and blink games
pub const FOLLOW_WINDOW_RANGE: (usize, usize) = (3, 15);
pub const BLINK_WINDOW_RANGE: (usize, usize) = (3, 15);
/// Window size bounds for the gaze-hold game
pub const GAZE_WINDOW_RANGE: (usize, usize) = (3, 20);

const SAMPLE_INTERVAL_RANGE: (u64, u64) = (50, 5_000);

/// Configuration surface for the signal pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Base movement threshold
    pub move_threshold: f64,
    /// Frames per follow window, clamped to [3, 15]
    pub follow_window_size: usize,
    /// Frames per blink window, clamped to [3, 15]
    pub blink_window_size: usize,
    /// Frames per gaze window, clamped to [3, 20]
    pub gaze_window_size: usize,
    /// Confidence floor (0-100) gating success counting
    pub confidence_minimum: u8,
    pub blink_debounce_ms: u64,
    /// Sampling period, clamped to [50, 5000]
    pub sample_interval_ms: u64,
    /// Smoothing weight on new samples in the follow game
    pub follow_alpha: f64,
    /// Smoothing weight on new samples in the gaze game
    pub gaze_alpha: f64,
    /// Follow target rotation period
    pub direction_period_ms: u64,
    /// Upper bound on a single analyzer call
    pub analysis_timeout_ms: u64,
    /// Fallback video width when a frame does not report one
    pub frame_width: u32,
    /// Fallback video height when a frame does not report one
    pub frame_height: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            follow_window_size: 5,
            blink_window_size: 10,
            gaze_window_size: 10,
            confidence_minimum: DEFAULT_CONFIDENCE_MINIMUM,
            blink_debounce_ms: DEFAULT_BLINK_DEBOUNCE_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            follow_alpha: 0.2,
            gaze_alpha: 0.3,
            direction_period_ms: 2_000,
            analysis_timeout_ms: 2_000,
            frame_width: 240,
            frame_height: 240,
        }
    }
}

impl TrackingConfig {
    /// Return a copy with every field inside its supported range
    pub fn clamped(&self) -> Self {
        let alpha = |a: f64, fallback: f64| {
            if a.is_finite() {
                a.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };
        let defaults = Self::default();

        Self {
            move_threshold: if self.move_threshold.is_finite() {
                self.move_threshold.max(0.0)
            } else {
                defaults.move_threshold
            },
            follow_window_size: clamp_window(self.follow_window_size, FOLLOW_WINDOW_RANGE),
            blink_window_size: clamp_window(self.blink_window_size, BLINK_WINDOW_RANGE),
            gaze_window_size: clamp_window(self.gaze_window_size, GAZE_WINDOW_RANGE),
            confidence_minimum: self.confidence_minimum.min(100),
            blink_debounce_ms: self.blink_debounce_ms,
            sample_interval_ms: self
                .sample_interval_ms
                .clamp(SAMPLE_INTERVAL_RANGE.0, SAMPLE_INTERVAL_RANGE.1),
            follow_alpha: alpha(self.follow_alpha, defaults.follow_alpha),
            gaze_alpha: alpha(self.gaze_alpha, defaults.gaze_alpha),
            direction_period_ms: self.direction_period_ms.max(1),
            analysis_timeout_ms: self.analysis_timeout_ms.max(1),
            frame_width: self.frame_width.max(1),
            frame_height: self.frame_height.max(1),
        }
    }

    /// Normalized-space threshold for the raw follow metric
    pub fn follow_raw_threshold(&self) -> f64 {
        self.move_threshold / 1000.0
    }

    /// Normalized-space threshold for the smoothed follow window mean
    pub fn follow_smooth_threshold(&self) -> f64 {
        self.follow_raw_threshold() * 1.5
    }

    /// Sampling period in seconds, used to convert frame counts to durations
    pub fn frame_interval_secs(&self) -> f64 {
        self.sample_interval_ms as f64 / 1000.0
    }

    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn clamp_window(size: usize, (min, max): (usize, usize)) -> usize {
    size.clamp(min, max)
}

/// Minimum stable frames in a gaze window: `max(2, round(window * 0.7))`
pub fn majority_threshold(window_size: usize) -> usize {
    ((window_size as f64 * 0.7).round() as usize).max(2)
}
