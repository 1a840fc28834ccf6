//! Pipeline orchestration
//!
//! This module provides the public API for Nayanthara Flux.
//! It wires analyzed frames through a game engine into session metrics, and
//! game logs through the dosha engine into an analysis.

use crate::config::TrackingConfig;
use crate::dosha::analyze_game_metrics;
use crate::error::ComputeError;
use crate::games::{build_engine, EngineSnapshot, GameEngine, GameKind, TickOutcome};
use crate::session::{SessionSummary, SessionTracker};
use crate::store::GameLogStore;
use crate::types::{DoshaAnalysis, FrameAnalysis, FrameTick, GameLog, NewGameLog};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Run the dosha engine over a JSON array of game logs.
///
/// # Arguments
/// * `raw_json` - JSON array (or NDJSON) of game logs for one child
///
/// # Returns
/// The `DoshaAnalysis` as a JSON string
///
/// # Example
/// ```ignore
/// let analysis_json = analyze_logs_json(logs_json)?;
/// ```
pub fn analyze_logs_json(raw_json: String) -> Result<String, ComputeError> {
    let logs = parse_game_logs(&raw_json)?;
    let analysis = analyze_game_metrics(&logs);
    serde_json::to_string(&analysis).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Parse game logs from a JSON array or newline-delimited JSON.
///
/// Logs are returned oldest first.
pub fn parse_game_logs(raw: &str) -> Result<Vec<GameLog>, ComputeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut logs: Vec<GameLog> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| ComputeError::ParseError(format!("line {}: {}", n + 1, e)))
            })
            .collect::<Result<_, _>>()?
    };
    logs.sort_by_key(|log| log.timestamp);
    Ok(logs)
}

/// Result of feeding one frame to a [`GameProcessor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub outcome: TickOutcome,
    pub snapshot: EngineSnapshot,
}

/// Stateful processor for one game and its sessions.
///
/// Use this when frames arrive one at a time (from the async sampling loop,
/// the FFI, or a replay).
pub struct GameProcessor {
    engine: Box<dyn GameEngine>,
    sessions: SessionTracker,
    config: TrackingConfig,
}

impl GameProcessor {
    /// Create a processor with a (clamped) configuration
    pub fn new(kind: GameKind, config: &TrackingConfig) -> Self {
        let config = config.clamped();
        Self {
            engine: build_engine(kind, &config),
            sessions: SessionTracker::new(config.frame_interval_secs()),
            config,
        }
    }

    /// Create a processor from a JSON configuration
    pub fn from_config_json(kind: GameKind, config_json: &str) -> Result<Self, ComputeError> {
        let config = TrackingConfig::from_json(config_json)
            .map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(kind, &config))
    }

    pub fn kind(&self) -> GameKind {
        self.engine.kind()
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Reset the engine and start a new session. Returns the session id.
    pub fn start_session(&mut self) -> String {
        self.engine.reset();
        let id = self.sessions.start_session();
        info!("{} session {} started", self.engine.kind().as_str(), id);
        id
    }

    /// Feed one sampling tick through the engine
    pub fn process_tick(&mut self, tick: &FrameTick) -> TickOutcome {
        let outcome = self.engine.on_frame(tick, &mut self.sessions);
        if let TickOutcome::WindowClosed(report) = &outcome {
            debug!(
                "{} window {}: passed={} accuracy={}%",
                self.engine.kind().as_str(),
                report.total_windows,
                report.passed,
                report.accuracy
            );
        }
        outcome
    }

    /// Process a full tick encoded as JSON and return a [`FrameUpdate`] as JSON
    pub fn process_frame_json(&mut self, tick_json: &str) -> Result<String, ComputeError> {
        let tick: FrameTick = serde_json::from_str(tick_json)?;
        self.update_json(&tick)
    }

    /// Process an analyzer response captured at `timestamp_ms`
    pub fn process_analysis_json(
        &mut self,
        analysis_json: &str,
        timestamp_ms: u64,
    ) -> Result<String, ComputeError> {
        let analysis: FrameAnalysis = serde_json::from_str(analysis_json)?;
        let tick = FrameTick {
            timestamp_ms,
            analysis,
            width: None,
            height: None,
        };
        self.update_json(&tick)
    }

    fn update_json(&mut self, tick: &FrameTick) -> Result<String, ComputeError> {
        let update = FrameUpdate {
            outcome: self.process_tick(tick),
            snapshot: self.engine.snapshot(),
        };
        serde_json::to_string(&update).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Drop any partial window and finalize the active session
    pub fn end_session(&mut self) -> Option<SessionSummary> {
        self.engine.discard_partial();
        let finished = self.sessions.end_session()?;
        let summary = self.sessions.summarize(&finished);
        info!(
            "{} session {} ended: follow accuracy {}%, blinks {}, focus hold {}s",
            self.engine.kind().as_str(),
            summary.id,
            summary.follow_accuracy,
            summary.blink_count,
            summary.focus_hold_seconds
        );
        Some(summary)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot()
    }

    pub fn engine(&self) -> &dyn GameEngine {
        self.engine.as_ref()
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn current_summary(&self) -> Option<SessionSummary> {
        self.sessions.current_summary()
    }

    /// A game log for the current attempt, once completion criteria are met.
    /// The insight is addressed to `child_name`.
    pub fn completion_log(&mut self, child_id: &str, child_name: &str) -> Option<NewGameLog> {
        self.engine.completion_log(child_id, child_name, Utc::now())
    }

    /// Load session state from JSON
    pub fn load_sessions(&mut self, json: &str) -> Result<(), ComputeError> {
        self.sessions =
            SessionTracker::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        Ok(())
    }

    /// Save session state to JSON
    pub fn save_sessions(&self) -> Result<String, ComputeError> {
        self.sessions
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

/// Records game logs and recomputes a child's dosha analysis on demand
pub struct DoshaProfiler<S: GameLogStore> {
    store: S,
}

impl<S: GameLogStore> DoshaProfiler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a log and return the stored record
    pub fn record(&mut self, log: NewGameLog) -> GameLog {
        let stored = self.store.record_log(log);
        debug!(
            "recorded {} for child {} as {}",
            stored.game_type.as_str(),
            stored.child_id,
            stored.id
        );
        stored
    }

    /// Analysis over the child's most recent logs
    pub fn analysis_for_child(&self, child_id: &str) -> DoshaAnalysis {
        analyze_game_metrics(&self.store.logs_for_child(child_id))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{eyes_at, no_face};
    use crate::store::InMemoryGameLogStore;
    use crate::types::{DoshaType, GameType};
    use pretty_assertions::assert_eq;

    fn sample_logs_json() -> &'static str {
        r#"[
            {
                "_id": "log_2",
                "child_id": "child-1",
                "game_type": "HIDDEN_HERB",
                "level_played": 2,
                "timestamp": "2024-01-16T10:00:00Z",
                "metrics": {
                    "accuracy": 40,
                    "time_taken": 20,
                    "impulsivity_count": 1,
                    "tremor_index": 10,
                    "focus_breaks": 5,
                    "completion_status": "FAILED"
                }
            },
            {
                "_id": "log_1",
                "child_id": "child-1",
                "game_type": "LIONS_BREATH",
                "level_played": 1,
                "timestamp": "2024-01-15T10:00:00Z",
                "metrics": {
                    "accuracy": 90,
                    "time_taken": 45,
                    "impulsivity_count": 0,
                    "tremor_index": 75,
                    "focus_breaks": 0,
                    "completion_status": "WON"
                }
            }
        ]"#
    }

    fn gaze_config() -> TrackingConfig {
        TrackingConfig {
            gaze_window_size: 3,
            confidence_minimum: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_analyze_logs_json() {
        let result = analyze_logs_json(sample_logs_json().to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&result).unwrap();

        // vata 30, pitta 45 -> 40 / 60
        assert_eq!(payload["vata_score"], 40.0);
        assert_eq!(payload["pitta_score"], 60.0);
        assert_eq!(payload["dominant_dosha"], "PITTA");
        assert_eq!(payload["prescriptions"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_logs_sorted_oldest_first() {
        let logs = parse_game_logs(sample_logs_json()).unwrap();
        assert_eq!(logs[0].id, "log_1");
        assert_eq!(logs[1].id, "log_2");
    }

    #[test]
    fn test_parse_ndjson_logs() {
        let logs = parse_game_logs(sample_logs_json()).unwrap();
        let ndjson = logs
            .iter()
            .map(|log| serde_json::to_string(log).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_game_logs(&ndjson).unwrap(), logs);
        assert!(parse_game_logs("").unwrap().is_empty());
    }

    #[test]
    fn test_empty_logs_give_baseline() {
        let result = analyze_logs_json("[]".to_string()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(payload["vata_score"], 40.0);
        assert_eq!(payload["dominant_dosha"], "VATA");
    }

    #[test]
    fn test_invalid_json() {
        assert!(analyze_logs_json("not valid json".to_string()).is_err());
        assert!(parse_game_logs("{\"_id\": 1}\nnope").is_err());
    }

    #[test]
    fn test_processor_session_flow() {
        let mut processor = GameProcessor::new(GameKind::Gaze, &gaze_config());
        processor.start_session();

        for i in 0..5 {
            processor.process_tick(&eyes_at(i * 450, 120.0, 100.0));
        }
        // One full window plus one pending frame
        assert_eq!(processor.snapshot().total_windows, 1);
        assert_eq!(processor.snapshot().pending_frames, 1);

        let summary = processor.end_session().unwrap();
        // 4 stable frames * 0.45s = 1.8 -> 2
        assert_eq!(summary.focus_hold_seconds, 2);
        assert!(summary.ended_at.is_some());
        assert_eq!(processor.snapshot().pending_frames, 0);
        assert!(processor.end_session().is_none());
    }

    #[test]
    fn test_start_session_resets_engine() {
        let mut processor = GameProcessor::new(GameKind::Gaze, &gaze_config());
        processor.start_session();
        for i in 0..4 {
            processor.process_tick(&eyes_at(i * 450, 120.0, 100.0));
        }
        assert_eq!(processor.snapshot().total_windows, 1);

        processor.start_session();
        assert_eq!(processor.snapshot().total_windows, 0);
        assert_eq!(processor.sessions().archived().len(), 1);
    }

    #[test]
    fn test_process_frame_json() {
        let mut processor = GameProcessor::new(GameKind::Follow, &TrackingConfig::default());
        processor.start_session();

        let tick = serde_json::to_string(&no_face(0)).unwrap();
        let update: serde_json::Value =
            serde_json::from_str(&processor.process_frame_json(&tick).unwrap()).unwrap();
        assert_eq!(update["outcome"]["outcome"], "skipped");
        assert_eq!(update["snapshot"]["game"], "follow");
    }

    #[test]
    fn test_process_analysis_json() {
        let mut processor = GameProcessor::new(GameKind::Blink, &TrackingConfig::default());
        processor.start_session();

        let analysis = r#"{"facePresent":true,"eyeLeft":{"x":114,"y":100},"eyeRight":{"x":126,"y":100},"eyesOpen":false}"#;
        let update: serde_json::Value =
            serde_json::from_str(&processor.process_analysis_json(analysis, 0).unwrap()).unwrap();
        assert_eq!(update["outcome"]["outcome"], "sampled");
        assert_eq!(processor.current_summary().unwrap().blink_count, 1);

        assert!(processor.process_analysis_json("{", 450).is_err());
    }

    #[test]
    fn test_from_config_json() {
        let processor =
            GameProcessor::from_config_json(GameKind::Blink, r#"{"blink_window_size": 50}"#)
                .unwrap();
        assert_eq!(processor.snapshot().window_size, 15);
        assert!(GameProcessor::from_config_json(GameKind::Blink, "[").is_err());
    }

    #[test]
    fn test_session_serialization() {
        let mut processor = GameProcessor::new(GameKind::Gaze, &gaze_config());
        processor.start_session();
        processor.process_tick(&eyes_at(0, 120.0, 100.0));
        processor.process_tick(&eyes_at(450, 120.0, 100.0));
        processor.end_session();

        let saved = processor.save_sessions().unwrap();
        let mut restored = GameProcessor::new(GameKind::Gaze, &gaze_config());
        restored.load_sessions(&saved).unwrap();
        assert_eq!(
            restored.sessions().all_sessions(),
            processor.sessions().all_sessions()
        );
    }

    #[test]
    fn test_completion_log_feeds_profiler() {
        let mut processor = GameProcessor::new(GameKind::Gaze, &gaze_config());
        processor.start_session();
        for i in 0..25 {
            processor.process_tick(&eyes_at(i * 450, 120.0, 100.0));
        }
        let log = processor.completion_log("child-1", "Meera").unwrap();
        assert!(log.ai_insight.contains("Meera"));

        let mut profiler = DoshaProfiler::new(InMemoryGameLogStore::new());
        let stored = profiler.record(log);
        assert_eq!(stored.game_type, GameType::GazeHold);
        assert_eq!(profiler.store().len(), 1);

        // No rule fires for a clean win: all scores zero, Pitta by tie-break
        let analysis = profiler.analysis_for_child("child-1");
        assert_eq!(analysis.dominant_dosha, DoshaType::Pitta);
        assert_eq!(
            profiler.analysis_for_child("child-2").dominant_dosha,
            DoshaType::Vata
        );
    }
}
