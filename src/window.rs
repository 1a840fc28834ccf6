//! Windowed classification
//!
//! Turns a stream of per-frame values into one pass/fail decision per
//! non-overlapping window of `window_size` frames. The follow, blink and gaze
//! games share this skeleton and differ only in their [`WindowAggregator`].
//!
//! A window counts as successful when its aggregate passes AND the confidence
//! score from *before* this window's update is at or above the configured
//! minimum. Confidence is then updated with the raw window outcome.

use crate::confidence::ConfidenceTracker;
use log::debug;
use serde::{Deserialize, Serialize};

/// Fixed-size, non-overlapping sample buffer
#[derive(Debug, Clone)]
pub struct WindowBuffer<S> {
    samples: Vec<S>,
    window_size: usize,
}

impl<S> WindowBuffer<S> {
    /// `window_size` of zero is treated as one
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            samples: Vec::with_capacity(window_size),
            window_size,
        }
    }

    /// Append a sample; returns the full window once it reaches `window_size`,
    /// leaving the buffer empty.
    pub fn push(&mut self, sample: S) -> Option<Vec<S>> {
        self.samples.push(sample);
        if self.samples.len() >= self.window_size {
            Some(std::mem::replace(
                &mut self.samples,
                Vec::with_capacity(self.window_size),
            ))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Discard an incomplete window
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Reduces one full window to a pass/fail outcome
pub trait WindowAggregator<S> {
    fn aggregate(&self, window: &[S]) -> bool;
}

/// Passes when the arithmetic mean is strictly above `threshold`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanAbove {
    pub threshold: f64,
}

impl WindowAggregator<f64> for MeanAbove {
    fn aggregate(&self, window: &[f64]) -> bool {
        if window.is_empty() {
            return false;
        }
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        mean > self.threshold
    }
}

/// Passes when at least `majority` samples are true
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityCount {
    pub majority: usize,
}

impl WindowAggregator<bool> for MajorityCount {
    fn aggregate(&self, window: &[bool]) -> bool {
        window.iter().filter(|&&flag| flag).count() >= self.majority
    }
}

/// Passes when any sample is true
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyTrue;

impl WindowAggregator<bool> for AnyTrue {
    fn aggregate(&self, window: &[bool]) -> bool {
        window.iter().any(|&flag| flag)
    }
}

/// Result of evaluating one completed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReport {
    /// The window's own test passed
    pub passed: bool,
    /// Passed and confidence was already at the minimum
    pub counted: bool,
    /// Confidence after this window
    pub confidence: u8,
    pub successful_windows: u32,
    pub total_windows: u32,
    /// `round(successful / total * 100)`
    pub accuracy: u32,
}

/// Generic windowed classifier, parameterized by sample type and aggregation
#[derive(Debug, Clone)]
pub struct WindowedClassifier<S, A> {
    buffer: WindowBuffer<S>,
    aggregator: A,
    confidence: ConfidenceTracker,
    confidence_minimum: u8,
    successful_windows: u32,
    total_windows: u32,
}

impl<S, A: WindowAggregator<S>> WindowedClassifier<S, A> {
    pub fn new(window_size: usize, aggregator: A, confidence_minimum: u8) -> Self {
        Self {
            buffer: WindowBuffer::new(window_size),
            aggregator,
            confidence: ConfidenceTracker::new(),
            confidence_minimum,
            successful_windows: 0,
            total_windows: 0,
        }
    }

    /// Feed one sample; returns a report when a window completes
    pub fn push(&mut self, sample: S) -> Option<WindowReport> {
        let window = self.buffer.push(sample)?;
        let passed = self.aggregator.aggregate(&window);

        let counted = passed && self.confidence.score() >= self.confidence_minimum;
        self.total_windows += 1;
        if counted {
            self.successful_windows += 1;
        }
        let confidence = self.confidence.update(passed);

        debug!(
            "window {} closed: passed={} counted={} confidence={}",
            self.total_windows, passed, counted, confidence
        );

        Some(WindowReport {
            passed,
            counted,
            confidence,
            successful_windows: self.successful_windows,
            total_windows: self.total_windows,
            accuracy: self.accuracy(),
        })
    }

    /// Accuracy over all completed windows, 0 when none have completed
    pub fn accuracy(&self) -> u32 {
        ratio_percent(self.successful_windows, self.total_windows)
    }

    pub fn confidence(&self) -> &ConfidenceTracker {
        &self.confidence
    }

    pub fn successful_windows(&self) -> u32 {
        self.successful_windows
    }

    pub fn total_windows(&self) -> u32 {
        self.total_windows
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn window_size(&self) -> usize {
        self.buffer.window_size()
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    /// Drop the incomplete window without evaluating it
    pub fn discard_partial(&mut self) {
        self.buffer.clear();
    }

    /// Full reset for a session restart
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.confidence.reset();
        self.successful_windows = 0;
        self.total_windows = 0;
    }
}

/// `round(numerator / denominator * 100)`, or 0 when the denominator is 0
pub fn ratio_percent(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((numerator as f64 / denominator as f64) * 100.0).round() as u32
}
