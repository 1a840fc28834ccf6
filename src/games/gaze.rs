//! Gaze-hold game
//!
//! Per-frame movement is `|dx| + |dy|` of the eye centre, smoothed and compared
//! against `move_threshold` (analyzer coordinate space). A window passes when a
//! majority of its frames were stable. Sustained holds grow the on-screen
//! target, and reaching the completion criteria yields one game log.

use crate::config::{majority_threshold, TrackingConfig};
use crate::dosha::gita_wisdom;
use crate::games::{EngineSnapshot, GameEngine, GameKind, TickOutcome};
use crate::session::SessionTracker;
use crate::smoothing::SignalSmoother;
use crate::types::{CompletionStatus, FrameTick, GameMetrics, GazeSample, NewGameLog};
use crate::window::{MajorityCount, WindowedClassifier};
use chrono::{DateTime, Utc};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

/// Consecutive stable frames before the target starts growing
pub const REQUIRED_HOLD_FRAMES: u32 = 6;
pub const INITIAL_TARGET_SIZE: u32 = 60;
pub const MAX_TARGET_SIZE: u32 = 180;
pub const TARGET_GROWTH: u32 = 4;

/// Completion criteria
pub const COMPLETION_ACCURACY: u32 = 70;
pub const COMPLETION_CONFIDENCE: u8 = 80;
pub const COMPLETION_MIN_WINDOWS: u32 = 3;

/// Gaze-stability engine
#[derive(Debug, Clone)]
pub struct GazeGame {
    config: TrackingConfig,
    classifier: WindowedClassifier<bool, MajorityCount>,
    smoother: SignalSmoother,
    previous: Option<GazeSample>,
    hold_frames: u32,
    target_size: u32,
    completed: bool,
    wisdom_rng: StdRng,
}

impl GazeGame {
    pub fn new(config: &TrackingConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Engine whose completion insight is chosen deterministically
    pub fn with_seed(config: &TrackingConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &TrackingConfig, wisdom_rng: StdRng) -> Self {
        let config = config.clamped();
        let majority = majority_threshold(config.gaze_window_size);
        Self {
            classifier: WindowedClassifier::new(
                config.gaze_window_size,
                MajorityCount { majority },
                config.confidence_minimum,
            ),
            smoother: SignalSmoother::new(config.gaze_alpha),
            config,
            previous: None,
            hold_frames: 0,
            target_size: INITIAL_TARGET_SIZE,
            completed: false,
            wisdom_rng,
        }
    }

    /// Consecutive stable frames
    pub fn hold_frames(&self) -> u32 {
        self.hold_frames
    }

    /// Diameter of the on-screen target
    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    /// Smoothed movement of the last frame
    pub fn smoothed_movement(&self) -> f64 {
        self.smoother.value()
    }

    /// Whether accuracy, confidence and window count meet the completion bar
    pub fn is_complete(&self) -> bool {
        self.classifier.accuracy() >= COMPLETION_ACCURACY
            && self.classifier.confidence().score() >= COMPLETION_CONFIDENCE
            && self.classifier.total_windows() >= COMPLETION_MIN_WINDOWS
    }

    /// Approximate play time from completed windows and the sampling period
    fn time_taken_secs(&self) -> f64 {
        let window_ms = self.classifier.window_size() as u64 * self.config.sample_interval_ms;
        ((self.classifier.total_windows() as u64 * window_ms) as f64 / 1000.0).round()
    }
}

impl GameEngine for GazeGame {
    fn kind(&self) -> GameKind {
        GameKind::Gaze
    }

    fn on_frame(&mut self, tick: &FrameTick, sessions: &mut SessionTracker) -> TickOutcome {
        let Some(sample) = tick.analysis.gaze_sample(tick.timestamp_ms) else {
            return TickOutcome::Skipped;
        };
        let Some(previous) = self.previous.replace(sample) else {
            return TickOutcome::Sampled;
        };

        let raw_move = (sample.x - previous.x).abs() + (sample.y - previous.y).abs();
        let stable = self.smoother.update(raw_move) < self.config.move_threshold;
        if stable {
            self.hold_frames += 1;
            sessions.record_focus_hold_frames(1);
        } else {
            self.hold_frames = 0;
        }

        let outcome = match self.classifier.push(stable) {
            Some(report) => TickOutcome::WindowClosed(report),
            None => TickOutcome::Sampled,
        };

        if self.hold_frames > REQUIRED_HOLD_FRAMES
            && self.classifier.confidence().score() >= self.config.confidence_minimum
        {
            self.target_size = (self.target_size + TARGET_GROWTH).min(MAX_TARGET_SIZE);
        }

        outcome
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::of(GameKind::Gaze, &self.classifier)
    }

    fn discard_partial(&mut self) {
        self.classifier.discard_partial();
    }

    fn reset(&mut self) {
        self.classifier.reset();
        self.smoother.reset();
        self.previous = None;
        self.hold_frames = 0;
        self.target_size = INITIAL_TARGET_SIZE;
        self.completed = false;
    }

    fn completion_log(
        &mut self,
        child_id: &str,
        child_name: &str,
        now: DateTime<Utc>,
    ) -> Option<NewGameLog> {
        if self.completed || !self.is_complete() {
            return None;
        }
        self.completed = true;

        let total = self.classifier.total_windows();
        let successful = self.classifier.successful_windows();
        info!(
            "gaze hold complete for {}: accuracy {}% over {} windows",
            child_id,
            self.classifier.accuracy(),
            total
        );

        Some(NewGameLog {
            child_id: child_id.to_string(),
            game_type: GameKind::Gaze.game_type(),
            level_played: 1,
            timestamp: now,
            metrics: GameMetrics {
                accuracy: self.classifier.accuracy() as f64,
                time_taken: self.time_taken_secs(),
                impulsivity_count: 0,
                tremor_index: 0.0,
                focus_breaks: total.saturating_sub(successful),
                completion_status: CompletionStatus::Won,
            },
            ai_insight: gita_wisdom(child_name, true, &mut self.wisdom_rng),
            recommended_action: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dosha::SUCCESS_STORIES;
    use crate::games::test_support::{eyes_at, no_face};
    use crate::types::GameType;

    fn test_config() -> TrackingConfig {
        TrackingConfig {
            gaze_window_size: 3,
            confidence_minimum: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_steady_gaze_passes_window() {
        let mut game = GazeGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        let mut last = TickOutcome::Skipped;
        for i in 0..4 {
            last = game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }
        let report = last.report().copied().unwrap();
        assert!(report.passed);
        assert_eq!(game.hold_frames(), 3);
        assert_eq!(sessions.current().unwrap().focus_hold_frames, 3);
    }

    #[test]
    fn test_large_movement_breaks_hold() {
        let mut game = GazeGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        game.on_frame(&eyes_at(0, 120.0, 100.0), &mut sessions);
        game.on_frame(&eyes_at(450, 120.0, 100.0), &mut sessions);
        assert_eq!(game.hold_frames(), 1);

        // 50px jump: smoothed movement 0.3 * 50 = 15 > 10
        game.on_frame(&eyes_at(900, 170.0, 100.0), &mut sessions);
        assert_eq!(game.hold_frames(), 0);
        assert!(game.smoothed_movement() > 10.0);

        let last = game.on_frame(&eyes_at(1350, 120.0, 100.0), &mut sessions);
        // Only one stable frame of three; majority is 2
        assert!(!last.report().unwrap().passed);
    }

    #[test]
    fn test_target_grows_after_required_hold() {
        let mut game = GazeGame::new(&test_config());
        let mut sessions = SessionTracker::default();

        for i in 0..8 {
            game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }
        // Hold reaches 7 on the eighth frame: one growth step
        assert_eq!(game.hold_frames(), 7);
        assert_eq!(game.target_size(), INITIAL_TARGET_SIZE + TARGET_GROWTH);

        for i in 8..200 {
            game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }
        assert_eq!(game.target_size(), MAX_TARGET_SIZE);
    }

    #[test]
    fn test_completion_log_produced_once() {
        let mut game = GazeGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        let now = Utc::now();

        // Prime + 8 windows of 3 stable frames -> confidence 80, accuracy 100
        for i in 0..25 {
            game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
            if i < 24 {
                assert!(game.completion_log("child-1", "Meera", now).is_none());
            }
        }
        assert!(game.is_complete());

        let log = game.completion_log("child-1", "Meera", now).unwrap();
        assert_eq!(log.game_type, GameType::GazeHold);
        assert_eq!(log.metrics.accuracy, 100.0);
        assert_eq!(log.metrics.focus_breaks, 0);
        assert_eq!(log.metrics.completion_status, CompletionStatus::Won);
        // 8 windows * 3 frames * 450ms = 10.8s -> 11
        assert_eq!(log.metrics.time_taken, 11.0);

        assert!(game.completion_log("child-1", "Meera", now).is_none());
    }

    #[test]
    fn test_completion_insight_is_success_story() {
        let mut game = GazeGame::with_seed(&test_config(), 9);
        let mut sessions = SessionTracker::default();
        for i in 0..25 {
            game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }

        let log = game.completion_log("child-1", "Meera", Utc::now()).unwrap();
        assert!(log.ai_insight.contains("Meera"));
        assert!(SUCCESS_STORIES
            .iter()
            .any(|s| s.replace("{name}", "Meera") == log.ai_insight));

        // Same seed, same story
        let mut replay = GazeGame::with_seed(&test_config(), 9);
        for i in 0..25 {
            replay.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }
        let again = replay.completion_log("child-1", "Meera", Utc::now()).unwrap();
        assert_eq!(again.ai_insight, log.ai_insight);
    }

    #[test]
    fn test_inference_miss_is_skipped() {
        let mut game = GazeGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        game.on_frame(&eyes_at(0, 120.0, 100.0), &mut sessions);
        game.on_frame(&eyes_at(450, 120.0, 100.0), &mut sessions);
        assert_eq!(game.on_frame(&no_face(900), &mut sessions), TickOutcome::Skipped);
        assert_eq!(game.hold_frames(), 1);
        assert_eq!(sessions.current().unwrap().focus_hold_frames, 1);
    }
}
