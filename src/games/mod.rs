//! Attention-training game engines
//!
//! Each engine consumes one analyzed frame per sampling tick and drives the
//! shared pipeline: smoothing → windowed classification → confidence, with
//! session counters recorded on the injected [`SessionTracker`].
//!
//! - **Follow**: follow a target that rotates LEFT → RIGHT → UP → DOWN
//! - **Blink**: blink deliberately to charge a star
//! - **Gaze**: hold a steady gaze to grow a circle

pub mod blink;
pub mod follow;
pub mod gaze;

use crate::config::TrackingConfig;
use crate::error::ComputeError;
use crate::session::SessionTracker;
use crate::types::{FrameTick, GameType, NewGameLog};
use crate::window::{WindowAggregator, WindowReport, WindowedClassifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use blink::BlinkGame;
pub use follow::FollowGame;
pub use gaze::GazeGame;

/// Which attention game an engine implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Follow,
    Blink,
    Gaze,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Follow => "follow",
            GameKind::Blink => "blink",
            GameKind::Gaze => "gaze",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ComputeError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" | "eye_follow" => Ok(GameKind::Follow),
            "blink" | "blink_power" => Ok(GameKind::Blink),
            "gaze" | "gaze_hold" => Ok(GameKind::Gaze),
            other => Err(ComputeError::UnknownGame(other.to_string())),
        }
    }

    /// Game type recorded on logs produced by this engine
    pub fn game_type(&self) -> GameType {
        match self {
            GameKind::Follow => GameType::EyeFollow,
            GameKind::Blink => GameType::BlinkPower,
            GameKind::Gaze => GameType::GazeHold,
        }
    }
}

/// Result of processing one sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Inference miss; nothing was mutated
    Skipped,
    /// Sample accepted, window still filling
    Sampled,
    /// Sample completed a window
    WindowClosed(WindowReport),
}

impl TickOutcome {
    pub fn report(&self) -> Option<&WindowReport> {
        match self {
            TickOutcome::WindowClosed(report) => Some(report),
            _ => None,
        }
    }
}

/// Display/diagnostic state of an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub game: GameKind,
    pub confidence: u8,
    pub confidence_history: Vec<u8>,
    pub successful_windows: u32,
    pub total_windows: u32,
    pub accuracy: u32,
    pub pending_frames: usize,
    pub window_size: usize,
}

impl EngineSnapshot {
    fn of<S, A: WindowAggregator<S>>(game: GameKind, classifier: &WindowedClassifier<S, A>) -> Self {
        Self {
            game,
            confidence: classifier.confidence().score(),
            confidence_history: classifier.confidence().history(),
            successful_windows: classifier.successful_windows(),
            total_windows: classifier.total_windows(),
            accuracy: classifier.accuracy(),
            pending_frames: classifier.pending(),
            window_size: classifier.window_size(),
        }
    }
}

/// A per-tick game engine driven by the processor or the async sampling loop
pub trait GameEngine: Send {
    fn kind(&self) -> GameKind;

    /// Process one analyzed frame. Must not mutate anything on an inference miss.
    fn on_frame(&mut self, tick: &FrameTick, sessions: &mut SessionTracker) -> TickOutcome;

    fn snapshot(&self) -> EngineSnapshot;

    /// Drop an incomplete window (teardown)
    fn discard_partial(&mut self);

    /// Clear all per-session state (restart)
    fn reset(&mut self);

    /// A game log for a completed attempt, produced at most once per session
    fn completion_log(
        &mut self,
        _child_id: &str,
        _child_name: &str,
        _now: DateTime<Utc>,
    ) -> Option<NewGameLog> {
        None
    }
}

/// Build the engine for a game from a (clamped) configuration
pub fn build_engine(kind: GameKind, config: &TrackingConfig) -> Box<dyn GameEngine> {
    match kind {
        GameKind::Follow => Box::new(FollowGame::new(config)),
        GameKind::Blink => Box::new(BlinkGame::new(config)),
        GameKind::Gaze => Box::new(GazeGame::new(config)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{EyePoint, FrameAnalysis, FrameTick};

    /// A tick with both eyes centred on `(x, y)`
    pub fn eyes_at(timestamp_ms: u64, x: f64, y: f64) -> FrameTick {
        FrameTick {
            timestamp_ms,
            analysis: FrameAnalysis {
                face_present: true,
                eye_left: Some(EyePoint { x: x - 6.0, y }),
                eye_right: Some(EyePoint { x: x + 6.0, y }),
                eyes_open: Some(true),
            },
            width: Some(240),
            height: Some(240),
        }
    }

    pub fn eyes_open(timestamp_ms: u64, open: bool) -> FrameTick {
        let mut tick = eyes_at(timestamp_ms, 120.0, 100.0);
        tick.analysis.eyes_open = Some(open);
        tick
    }

    pub fn no_face(timestamp_ms: u64) -> FrameTick {
        FrameTick {
            timestamp_ms,
            analysis: FrameAnalysis::default(),
            width: None,
            height: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_kind() {
        assert_eq!(GameKind::parse("Follow").unwrap(), GameKind::Follow);
        assert_eq!(GameKind::parse("blink_power").unwrap(), GameKind::Blink);
        assert_eq!(GameKind::parse(" gaze ").unwrap(), GameKind::Gaze);
        assert!(GameKind::parse("herb").is_err());
    }

    #[test]
    fn test_build_engine_kinds() {
        let config = TrackingConfig::default();
        for kind in [GameKind::Follow, GameKind::Blink, GameKind::Gaze] {
            let engine = build_engine(kind, &config);
            assert_eq!(engine.kind(), kind);
            assert_eq!(engine.snapshot().total_windows, 0);
        }
    }

    #[test]
    fn test_tick_outcome_serialization() {
        let json = serde_json::to_value(TickOutcome::Skipped).unwrap();
        assert_eq!(json["outcome"], "skipped");
    }
}
