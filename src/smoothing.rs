//! Exponential smoothing of per-frame signals
//!
//! `smoothed = smoothed * (1 - alpha) + raw * alpha`, where alpha is the weight
//! on the new sample. Non-finite input skips the update and keeps the prior value.

use serde::{Deserialize, Serialize};

/// Exponentially-weighted running value for one tracked dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSmoother {
    alpha: f64,
    value: f64,
}

impl SignalSmoother {
    /// Create a smoother starting at zero. `alpha` is clamped to [0, 1].
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { alpha, value: 0.0 }
    }

    /// Fold a raw sample into the running value and return the new value
    pub fn update(&mut self, raw: f64) -> f64 {
        if raw.is_finite() {
            self.value = self.value * (1.0 - self.alpha) + raw * self.alpha;
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Explicit session restart
    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Paired smoothers for horizontal and vertical displacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSmoother {
    pub dx: SignalSmoother,
    pub dy: SignalSmoother,
}

impl AxisSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            dx: SignalSmoother::new(alpha),
            dy: SignalSmoother::new(alpha),
        }
    }

    /// Smooth one displacement; returns `(smoothed_dx, smoothed_dy)`
    pub fn update(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        (self.dx.update(dx), self.dy.update(dy))
    }

    pub fn reset(&mut self) {
        self.dx.reset();
        self.dy.reset();
    }
}
