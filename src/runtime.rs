//! Async sampling runtime
//!
//! Drives a [`GameProcessor`] from a frame source and an analyzer on a fixed
//! tick. At most one analysis is in flight: the analysis is awaited inside the
//! tick arm and ticks that come due meanwhile are dropped, not queued.

use crate::analyzer::{FrameAnalyzer, FrameSource};
use crate::error::ComputeError;
use crate::games::{EngineSnapshot, TickOutcome};
use crate::pipeline::GameProcessor;
use crate::session::SessionSummary;
use crate::types::FrameTick;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Counters for one run of the sampling loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks whose analysis reached the engine
    pub analyzed: u64,
    /// Ticks skipped for a missing frame, failed analysis, or inference miss
    pub skipped: u64,
    pub windows: u64,
    pub timeouts: u64,
    /// Approximate ticks dropped while an analysis was in flight
    pub dropped_ticks: u64,
    pub session: Option<SessionSummary>,
}

/// Run one game session until `cancel` fires.
///
/// The session starts on the first capture that is not a fatal sensor error,
/// and ends on exit with any partial window discarded. A fatal sensor error
/// stops the loop and is returned; when it comes before the session starts the
/// processor is left untouched. Cancellation also abandons an analysis in flight.
pub async fn sampling_loop<A, F>(
    processor: &mut GameProcessor,
    analyzer: &A,
    frames: &mut F,
    cancel: CancellationToken,
    updates: Option<&watch::Sender<EngineSnapshot>>,
) -> Result<RunSummary, ComputeError>
where
    A: FrameAnalyzer,
    F: FrameSource,
{
    let interval_ms = processor.config().sample_interval_ms.max(1);
    let analysis_timeout = Duration::from_millis(processor.config().analysis_timeout_ms);

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut session_id: Option<String> = None;
    let mut last_tick_ms: Option<u64> = None;
    let mut stats = RunSummary::default();
    let mut failure: Option<ComputeError> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("sampling loop for session {} shutting down", session_id.as_deref().unwrap_or("-"));
                break;
            }
            _ = ticker.tick() => {
                stats.ticks += 1;
                let now_ms = started.elapsed().as_millis() as u64;
                if let Some(last) = last_tick_ms.replace(now_ms) {
                    let gap = now_ms.saturating_sub(last);
                    if gap > interval_ms {
                        stats.dropped_ticks += gap / interval_ms - 1;
                    }
                }

                let frame = match frames.capture(now_ms) {
                    Err(e) if e.is_fatal() => {
                        error!("capture failed for session {}: {}", session_id.as_deref().unwrap_or("-"), e);
                        failure = Some(e.into());
                        break;
                    }
                    Err(e) => {
                        warn!("transient capture error at {}ms: {}", now_ms, e);
                        stats.skipped += 1;
                        continue;
                    }
                    Ok(frame) => {
                        if session_id.is_none() {
                            session_id = Some(processor.start_session());
                        }
                        match frame {
                            Some(frame) => frame,
                            None => {
                                stats.skipped += 1;
                                continue;
                            }
                        }
                    }
                };

                let timed = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = tokio::time::timeout(analysis_timeout, analyzer.analyze(&frame)) => Some(result),
                };
                let Some(timed) = timed else {
                    info!("analysis at {}ms abandoned on shutdown", now_ms);
                    break;
                };

                let analysis = match timed {
                    Ok(Ok(analysis)) => analysis,
                    Ok(Err(e)) => {
                        warn!("frame analysis failed at {}ms: {}", now_ms, e);
                        stats.skipped += 1;
                        continue;
                    }
                    Err(_) => {
                        warn!("frame analysis timeout (> {}ms) at {}ms", analysis_timeout.as_millis(), now_ms);
                        stats.timeouts += 1;
                        stats.skipped += 1;
                        continue;
                    }
                };

                let tick = FrameTick {
                    timestamp_ms: frame.captured_at_ms,
                    analysis,
                    width: (frame.width > 0).then_some(frame.width),
                    height: (frame.height > 0).then_some(frame.height),
                };
                match processor.process_tick(&tick) {
                    TickOutcome::Skipped => stats.skipped += 1,
                    TickOutcome::Sampled => stats.analyzed += 1,
                    TickOutcome::WindowClosed(_) => {
                        stats.analyzed += 1;
                        stats.windows += 1;
                    }
                }
                if let Some(tx) = updates {
                    let _ = tx.send(processor.snapshot());
                }
            }
        }
    }

    if session_id.is_some() {
        stats.session = processor.end_session();
    }
    debug!(
        "sampling loop finished: {} ticks, {} analyzed, {} skipped, {} dropped",
        stats.ticks, stats.analyzed, stats.skipped, stats.dropped_ticks
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}

/// A finished run handed back by [`GameRunner::stop`]
pub struct FinishedRun {
    pub processor: GameProcessor,
    pub summary: RunSummary,
}

type RunHandle = JoinHandle<(GameProcessor, Result<RunSummary, ComputeError>)>;

/// Starts and stops the sampling loop on a background task
#[derive(Default)]
pub struct GameRunner {
    handle: Option<RunHandle>,
    cancel_token: Option<CancellationToken>,
    updates: Option<watch::Receiver<EngineSnapshot>>,
}

impl GameRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the sampling loop. Fails if a run is already active.
    pub fn start<A, F>(
        &mut self,
        processor: GameProcessor,
        analyzer: A,
        frames: F,
    ) -> Result<(), ComputeError>
    where
        A: FrameAnalyzer + 'static,
        F: FrameSource + 'static,
    {
        if self.handle.is_some() {
            return Err(ComputeError::RuntimeError("game already running".to_string()));
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let (tx, rx) = watch::channel(processor.snapshot());

        info!("starting {} sampling loop", processor.kind().as_str());
        let handle = tokio::spawn(async move {
            let mut processor = processor;
            let mut frames = frames;
            let result =
                sampling_loop(&mut processor, &analyzer, &mut frames, token_clone, Some(&tx)).await;
            (processor, result)
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.updates = Some(rx);
        Ok(())
    }

    /// Live engine snapshots while a run is active
    pub fn subscribe(&self) -> Option<watch::Receiver<EngineSnapshot>> {
        self.updates.clone()
    }

    /// Cancel the loop and wait for it to finish
    pub async fn stop(&mut self) -> Result<FinishedRun, ComputeError> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.updates = None;

        let handle = self
            .handle
            .take()
            .ok_or_else(|| ComputeError::RuntimeError("game not running".to_string()))?;
        let (processor, result) = handle
            .await
            .map_err(|e| ComputeError::RuntimeError(format!("sampling loop task failed to join: {e}")))?;
        Ok(FinishedRun {
            processor,
            summary: result?,
        })
    }
}
