//! Eye-follow game
//!
//! The eye centre's frame-to-frame displacement is projected onto the current
//! target direction and normalized by the frame size. The smoothed projection
//! is windowed against `move_threshold / 1000 * 1.5` using the window mean.

use crate::config::TrackingConfig;
use crate::games::{EngineSnapshot, GameEngine, GameKind, TickOutcome};
use crate::session::SessionTracker;
use crate::smoothing::AxisSmoother;
use crate::types::{Direction, FrameTick, GazeSample};
use crate::window::{MeanAbove, WindowedClassifier};

/// Follow-the-dot engine
#[derive(Debug, Clone)]
pub struct FollowGame {
    config: TrackingConfig,
    classifier: WindowedClassifier<f64, MeanAbove>,
    smoother: AxisSmoother,
    previous: Option<GazeSample>,
    started_at_ms: Option<u64>,
    direction: Direction,
    raw_metric: f64,
    smooth_metric: f64,
    raw_detected: bool,
}

impl FollowGame {
    pub fn new(config: &TrackingConfig) -> Self {
        let config = config.clamped();
        let classifier = WindowedClassifier::new(
            config.follow_window_size,
            MeanAbove {
                threshold: config.follow_smooth_threshold(),
            },
            config.confidence_minimum,
        );
        Self {
            smoother: AxisSmoother::new(config.follow_alpha),
            classifier,
            config,
            previous: None,
            started_at_ms: None,
            direction: Direction::Left,
            raw_metric: 0.0,
            smooth_metric: 0.0,
            raw_detected: false,
        }
    }

    /// Current target direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Unsmoothed directional metric of the last frame
    pub fn raw_metric(&self) -> f64 {
        self.raw_metric
    }

    /// Smoothed directional metric of the last frame
    pub fn smooth_metric(&self) -> f64 {
        self.smooth_metric
    }

    /// Debug status line, e.g. "LEFT DETECTED"
    pub fn status(&self) -> Option<String> {
        self.raw_detected
            .then(|| format!("{} DETECTED", self.direction.as_str()))
    }
}

impl GameEngine for FollowGame {
    fn kind(&self) -> GameKind {
        GameKind::Follow
    }

    fn on_frame(&mut self, tick: &FrameTick, sessions: &mut SessionTracker) -> TickOutcome {
        let Some(sample) = tick.analysis.gaze_sample(tick.timestamp_ms) else {
            return TickOutcome::Skipped;
        };

        let started = *self.started_at_ms.get_or_insert(tick.timestamp_ms);
        self.direction = direction_at(
            tick.timestamp_ms.saturating_sub(started),
            self.config.direction_period_ms,
        );

        // The first valid frame only primes the previous position
        let Some(previous) = self.previous.replace(sample) else {
            return TickOutcome::Sampled;
        };

        let dx = sample.x - previous.x;
        let dy = sample.y - previous.y;
        let width = tick.width.unwrap_or(self.config.frame_width).max(1) as f64;
        let height = tick.height.unwrap_or(self.config.frame_height).max(1) as f64;

        self.raw_metric = directional_metric(self.direction, dx, dy, width, height);
        self.raw_detected = self.raw_metric > self.config.follow_raw_threshold();

        let (sdx, sdy) = self.smoother.update(dx, dy);
        self.smooth_metric = directional_metric(self.direction, sdx, sdy, width, height);

        match self.classifier.push(self.smooth_metric) {
            Some(report) => {
                sessions.record_follow(report.counted);
                TickOutcome::WindowClosed(report)
            }
            None => TickOutcome::Sampled,
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::of(GameKind::Follow, &self.classifier)
    }

    fn discard_partial(&mut self) {
        self.classifier.discard_partial();
    }

    fn reset(&mut self) {
        self.classifier.reset();
        self.smoother.reset();
        self.previous = None;
        self.started_at_ms = None;
        self.direction = Direction::Left;
        self.raw_metric = 0.0;
        self.smooth_metric = 0.0;
        self.raw_detected = false;
    }
}

/// Target direction after `elapsed_ms` of play
pub fn direction_at(elapsed_ms: u64, period_ms: u64) -> Direction {
    let step = (elapsed_ms / period_ms.max(1)) as usize;
    Direction::ROTATION[step % Direction::ROTATION.len()]
}

/// Signed displacement along `direction`, normalized by frame size
fn directional_metric(direction: Direction, dx: f64, dy: f64, width: f64, height: f64) -> f64 {
    match direction {
        Direction::Left => -dx / width,
        Direction::Right => dx / width,
        Direction::Up => -dy / height,
        Direction::Down => dy / height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{eyes_at, no_face};

    fn test_config() -> TrackingConfig {
        TrackingConfig {
            follow_window_size: 3,
            confidence_minimum: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_direction_rotation() {
        assert_eq!(direction_at(0, 2000), Direction::Left);
        assert_eq!(direction_at(1999, 2000), Direction::Left);
        assert_eq!(direction_at(2000, 2000), Direction::Right);
        assert_eq!(direction_at(4500, 2000), Direction::Up);
        assert_eq!(direction_at(6000, 2000), Direction::Down);
        assert_eq!(direction_at(8000, 2000), Direction::Left);
    }

    #[test]
    fn test_directional_metric_signs() {
        assert!((directional_metric(Direction::Left, -12.0, 0.0, 240.0, 240.0) - 0.05).abs() < 1e-12);
        assert!((directional_metric(Direction::Right, -12.0, 0.0, 240.0, 240.0) + 0.05).abs() < 1e-12);
        assert!((directional_metric(Direction::Up, 0.0, -24.0, 240.0, 240.0) - 0.1).abs() < 1e-12);
        assert!((directional_metric(Direction::Down, 0.0, -24.0, 240.0, 240.0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_moving_left_passes_window() {
        let mut game = FollowGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        // Prime, then three frames moving 12px left each
        assert_eq!(game.on_frame(&eyes_at(0, 120.0, 100.0), &mut sessions), TickOutcome::Sampled);
        game.on_frame(&eyes_at(450, 108.0, 100.0), &mut sessions);
        assert_eq!(game.status().as_deref(), Some("LEFT DETECTED"));
        game.on_frame(&eyes_at(900, 96.0, 100.0), &mut sessions);
        let outcome = game.on_frame(&eyes_at(1350, 84.0, 100.0), &mut sessions);

        // Smoothed metrics 0.01, 0.018, 0.0244 -> mean 0.0175 > 0.015
        let report = outcome.report().copied().unwrap();
        assert!(report.passed);
        assert!(report.counted);
        assert_eq!(report.confidence, 10);

        let current = sessions.current().unwrap();
        assert_eq!(current.follow_total, 1);
        assert_eq!(current.follow_successes, 1);
    }

    #[test]
    fn test_still_eyes_fail_window() {
        let mut game = FollowGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        let mut last = TickOutcome::Skipped;
        for i in 0..4 {
            last = game.on_frame(&eyes_at(i * 450, 120.0, 100.0), &mut sessions);
        }
        let report = last.report().copied().unwrap();
        assert!(!report.passed);
        assert_eq!(report.confidence, 0);
        assert!(game.status().is_none());

        let current = sessions.current().unwrap();
        assert_eq!(current.follow_total, 1);
        assert_eq!(current.follow_successes, 0);
    }

    #[test]
    fn test_passing_window_not_counted_below_confidence_minimum() {
        let config = TrackingConfig {
            follow_window_size: 3,
            ..Default::default()
        };
        let mut game = FollowGame::new(&config);
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        let mut x = 120.0;
        let mut last = TickOutcome::Skipped;
        for i in 0..4 {
            last = game.on_frame(&eyes_at(i * 450, x, 100.0), &mut sessions);
            x -= 12.0;
        }
        let report = last.report().copied().unwrap();
        assert!(report.passed);
        assert!(!report.counted);
        assert_eq!(sessions.current().unwrap().follow_successes, 0);
        assert_eq!(sessions.current().unwrap().follow_total, 1);
    }

    #[test]
    fn test_inference_miss_is_skipped() {
        let mut game = FollowGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        sessions.start_session();

        game.on_frame(&eyes_at(0, 120.0, 100.0), &mut sessions);
        assert_eq!(game.on_frame(&no_face(450), &mut sessions), TickOutcome::Skipped);
        assert_eq!(game.snapshot().pending_frames, 0);
        assert_eq!(sessions.current().unwrap().follow_total, 0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut game = FollowGame::new(&test_config());
        let mut sessions = SessionTracker::default();
        for i in 0..4 {
            game.on_frame(&eyes_at(i * 450, 120.0 - i as f64 * 12.0, 100.0), &mut sessions);
        }
        assert_eq!(game.snapshot().total_windows, 1);

        game.reset();
        let snapshot = game.snapshot();
        assert_eq!(snapshot.total_windows, 0);
        assert_eq!(snapshot.confidence, 0);
        assert_eq!(game.direction(), Direction::Left);
    }
}
