//! Frame capture and analysis seams
//!
//! A [`FrameSource`] produces captured frames; a [`FrameAnalyzer`] turns one
//! frame into a [`FrameAnalysis`]. The analyzer is asynchronous so remote
//! inference endpoints can be plugged in. When no endpoint is reachable the
//! [`SimulatedAnalyzer`] stands in with a synthetic, slowly drifting gaze.

use crate::error::{ComputeError, SensorError};
use crate::types::{EyePoint, FrameAnalysis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::future::Future;
use std::sync::Mutex;

/// One captured video frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedFrame {
    /// Encoded image bytes (JPEG for remote analyzers)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at_ms: u64,
}

/// Produces frames for the sampling loop
pub trait FrameSource: Send {
    /// Capture one frame. `Ok(None)` means the source is not ready yet (the
    /// video has no dimensions) and the tick is skipped.
    fn capture(&mut self, now_ms: u64) -> Result<Option<CapturedFrame>, SensorError>;
}

/// Analyzes one frame into face/eye landmarks
pub trait FrameAnalyzer: Send + Sync {
    fn analyze(
        &self,
        frame: &CapturedFrame,
    ) -> impl Future<Output = Result<FrameAnalysis, ComputeError>> + Send;
}

/// Source that always yields an empty frame of fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticFrameSource {
    pub width: u32,
    pub height: u32,
}

impl Default for SyntheticFrameSource {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn capture(&mut self, now_ms: u64) -> Result<Option<CapturedFrame>, SensorError> {
        Ok(Some(CapturedFrame {
            data: Vec::new(),
            width: self.width,
            height: self.height,
            captured_at_ms: now_ms,
        }))
    }
}

/// Tries `primary`, and on failure answers with `fallback`
#[derive(Debug)]
pub struct FallbackAnalyzer<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackAnalyzer<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: FrameAnalyzer, F: FrameAnalyzer> FrameAnalyzer for FallbackAnalyzer<P, F> {
    async fn analyze(&self, frame: &CapturedFrame) -> Result<FrameAnalysis, ComputeError> {
        match self.primary.analyze(frame).await {
            Ok(analysis) => Ok(analysis),
            Err(e) => {
                log::debug!("primary analyzer failed, using fallback: {}", e);
                self.fallback.analyze(frame).await
            }
        }
    }
}

/// Probability that a simulated frame has open eyes
pub const SIMULATED_EYES_OPEN_PROBABILITY: f64 = 0.65;

/// Offline stand-in for the vision endpoint.
///
/// The eye centre drifts around (120, 100) on a 1.2s time base and eyes are
/// open with probability 0.65.
#[derive(Debug)]
pub struct SimulatedAnalyzer {
    rng: Mutex<StdRng>,
}

impl SimulatedAnalyzer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic analyzer for replays and tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Synchronous sample at `now_ms`
    pub fn sample(&self, now_ms: u64) -> FrameAnalysis {
        let roll: f64 = match self.rng.lock() {
            Ok(mut rng) => rng.gen(),
            Err(poisoned) => poisoned.into_inner().gen(),
        };
        let t = now_ms as f64 / 1200.0;
        let cx = 120.0 + t.sin() * 12.0;
        let cy = 100.0 + t.cos() * 10.0;
        FrameAnalysis {
            face_present: true,
            eye_left: Some(EyePoint { x: cx - 6.0, y: cy }),
            eye_right: Some(EyePoint { x: cx + 6.0, y: cy }),
            eyes_open: Some(roll < SIMULATED_EYES_OPEN_PROBABILITY),
        }
    }
}

impl Default for SimulatedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnalyzer for SimulatedAnalyzer {
    fn analyze(
        &self,
        frame: &CapturedFrame,
    ) -> impl Future<Output = Result<FrameAnalysis, ComputeError>> + Send {
        std::future::ready(Ok(self.sample(frame.captured_at_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl FrameAnalyzer for Failing {
        async fn analyze(&self, _frame: &CapturedFrame) -> Result<FrameAnalysis, ComputeError> {
            Err(ComputeError::AnalyzerFailed("endpoint unreachable".into()))
        }
    }

    struct NoFace;

    impl FrameAnalyzer for NoFace {
        async fn analyze(&self, _frame: &CapturedFrame) -> Result<FrameAnalysis, ComputeError> {
            Ok(FrameAnalysis::default())
        }
    }

    fn block_on<F: Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn test_synthetic_source_stamps_frames() {
        let mut source = SyntheticFrameSource::default();
        let frame = source.capture(900).unwrap().unwrap();
        assert_eq!(frame.captured_at_ms, 900);
        assert_eq!((frame.width, frame.height), (240, 240));
    }

    #[test]
    fn test_fallback_used_on_primary_failure() {
        let analyzer = FallbackAnalyzer::new(Failing, NoFace);
        let result = block_on(analyzer.analyze(&CapturedFrame::default())).unwrap();
        assert!(!result.face_present);
    }

        #[test]
    fn test_simulated_sample_geometry() {
        let analyzer = SimulatedAnalyzer::with_seed(7);
        let analysis = analyzer.sample(0);
        assert!(analysis.face_present);
        let left = analysis.eye_left.unwrap();
        let right = analysis.eye_right.unwrap();
        assert!((right.x - left.x - 12.0).abs() < 1e-9);
        // t = 0: cx = 120, cy = 110
        assert!((analysis.gaze_sample(0).unwrap().x - 120.0).abs() < 1e-9);
        assert!((left.y - 110.0).abs() < 1e-9);
    }

        #[test]
    fn test_simulated_seed_is_deterministic() {
        let a = SimulatedAnalyzer::with_seed(42);
        let b = SimulatedAnalyzer::with_seed(42);
        for ms in (0..20).map(|i| i * 450) {
            assert_eq!(a.sample(ms), b.sample(ms));
        }
    }

        #[test]
    fn test_simulated_eyes_open_rate() {
        let analyzer = SimulatedAnalyzer::with_seed(1);
        let open = (0..2000)
            .filter(|&i| analyzer.sample(i * 450).eyes_open == Some(true))
            .count();
        // Expected 1300
        assert!((1150..1450).contains(&open), "open count {open}");
    }
}
