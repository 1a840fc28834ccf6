//! Confidence tracking
//!
//! A bounded random walk over [0, 100]: +10 on a passing window, -5 on a
//! failing one. Recent scores are kept in a fixed-capacity history for display.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Score increment for a passing window
pub const CONFIDENCE_GAIN: i32 = 10;
/// Score decrement for a failing window
pub const CONFIDENCE_PENALTY: i32 = 5;
/// Number of recent scores retained
pub const HISTORY_CAPACITY: usize = 20;
/// Upper bound of the score
pub const MAX_CONFIDENCE: u8 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTracker {
    score: u8,
    history: VecDeque<u8>,
}

impl ConfidenceTracker {
    pub fn new() -> Self {
        Self {
            score: 0,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Apply one window outcome and return the new score
    pub fn update(&mut self, outcome: bool) -> u8 {
        let delta = if outcome {
            CONFIDENCE_GAIN
        } else {
            -CONFIDENCE_PENALTY
        };
        self.score = (self.score as i32 + delta).clamp(0, MAX_CONFIDENCE as i32) as u8;

        self.history.push_back(self.score);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.score
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    /// Recent scores, oldest first
    pub fn history(&self) -> Vec<u8> {
        self.history.iter().copied().collect()
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_sizes() {
        let mut tracker = ConfidenceTracker::new();
        assert_eq!(tracker.update(true), 10);
        assert_eq!(tracker.update(true), 20);
        assert_eq!(tracker.update(false), 15);
    }

    #[test]
    fn test_bounds_hold_for_all_outcome_sequences() {
        // Every outcome sequence of length 12
        for mask in 0u32..(1 << 12) {
            let mut tracker = ConfidenceTracker::new();
            for bit in 0..12 {
                let before = tracker.score() as i32;
                let outcome = mask & (1 << bit) != 0;
                let after = tracker.update(outcome) as i32;

                let expected = (before + if outcome { 10 } else { -5 }).clamp(0, 100);
                assert_eq!(after, expected);
                assert!((0..=100).contains(&after));
            }
        }
    }

    #[test]
    fn test_saturates_at_upper_bound() {
        let mut tracker = ConfidenceTracker::new();
        for _ in 0..15 {
            tracker.update(true);
        }
        assert_eq!(tracker.score(), 100);
        assert_eq!(tracker.update(false), 95);
    }

    #[test]
    fn test_history_keeps_most_recent_twenty() {
        let mut tracker = ConfidenceTracker::new();
        for _ in 0..25 {
            tracker.update(true);
        }
        let history = tracker.history();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        // Entries 6..=25 survive: 60, 70, 80, 90, 100, 100, ...
        assert_eq!(history[0], 60);
        assert_eq!(*history.last().unwrap(), 100);
    }

    #[test]
    fn test_reset() {
        let mut tracker = ConfidenceTracker::new();
        tracker.update(true);
        tracker.reset();
        assert_eq!(tracker.score(), 0);
        assert!(tracker.history().is_empty());
    }
}
