//! Blink-power game
//!
//! A blink is an open → closed transition that arrives more than
//! `blink_debounce_ms` after the previous accepted blink. Each window passes
//! when at least one accepted blink occurred in it.

use crate::config::TrackingConfig;
use crate::games::{EngineSnapshot, GameEngine, GameKind, TickOutcome};
use crate::session::SessionTracker;
use crate::types::FrameTick;
use crate::window::{AnyTrue, WindowedClassifier};

/// Power gained per accepted blink
pub const POWER_PER_BLINK: u8 = 10;
/// Maximum star power
pub const MAX_POWER: u8 = 100;

/// Blink-detection engine
#[derive(Debug, Clone)]
pub struct BlinkGame {
    config: TrackingConfig,
    classifier: WindowedClassifier<bool, AnyTrue>,
    eyes_open_prev: bool,
    last_blink_at_ms: Option<u64>,
    power: u8,
}

impl BlinkGame {
    pub fn new(config: &TrackingConfig) -> Self {
        let config = config.clamped();
        Self {
            classifier: WindowedClassifier::new(
                config.blink_window_size,
                AnyTrue,
                config.confidence_minimum,
            ),
            config,
            eyes_open_prev: true,
            last_blink_at_ms: None,
            power: 0,
        }
    }

    /// Star charge, 0-100
    pub fn power(&self) -> u8 {
        self.power
    }

    fn debounce_elapsed(&self, now_ms: u64) -> bool {
        match self.last_blink_at_ms {
            Some(last) => now_ms.saturating_sub(last) > self.config.blink_debounce_ms,
            None => true,
        }
    }
}

impl GameEngine for BlinkGame {
    fn kind(&self) -> GameKind {
        GameKind::Blink
    }

    fn on_frame(&mut self, tick: &FrameTick, sessions: &mut SessionTracker) -> TickOutcome {
        if !tick.analysis.face_present {
            return TickOutcome::Skipped;
        }
        let Some(eyes_open) = tick.analysis.eyes_open else {
            return TickOutcome::Skipped;
        };

        let now = tick.timestamp_ms;
        let blinked = self.eyes_open_prev && !eyes_open && self.debounce_elapsed(now);
        if blinked {
            self.last_blink_at_ms = Some(now);
            self.power = self.power.saturating_add(POWER_PER_BLINK).min(MAX_POWER);
            sessions.record_blink();
        }
        self.eyes_open_prev = eyes_open;

        match self.classifier.push(blinked) {
            Some(report) => TickOutcome::WindowClosed(report),
            None => TickOutcome::Sampled,
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::of(GameKind::Blink, &self.classifier)
    }

    fn discard_partial(&mut self) {
        self.classifier.discard_partial();
    }

    fn reset(&mut self) {
        self.classifier.reset();
        self.eyes_open_prev = true;
        self.last_blink_at_ms = None;
        self.power = 0;
    }
}
