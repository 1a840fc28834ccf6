//! Core types for the Nayanthara Flux pipeline
//!
//! This module defines the data structures that flow through each stage:
//! analyzer output and gaze samples, persisted game logs, and the dosha
//! analysis view derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A landmark position reported by the frame analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyePoint {
    pub x: f64,
    pub y: f64,
}

/// Response from the vision inference endpoint for a single frame.
///
/// `face_present = false` with no eye fields is a valid response, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    pub face_present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_left: Option<EyePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_right: Option<EyePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyes_open: Option<bool>,
}

impl FrameAnalysis {
    /// Midpoint of both eye landmarks, or `None` on an inference miss
    pub fn gaze_sample(&self, timestamp_ms: u64) -> Option<GazeSample> {
        if !self.face_present {
            return None;
        }
        let (left, right) = (self.eye_left?, self.eye_right?);
        let sample = GazeSample {
            x: (left.x + right.x) / 2.0,
            y: (left.y + right.y) / 2.0,
            timestamp_ms,
        };
        if sample.x.is_finite() && sample.y.is_finite() {
            Some(sample)
        } else {
            None
        }
    }
}

/// One eye-position estimate per analyzed frame. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub timestamp_ms: u64,
}

/// One sampling tick: the analyzer response plus capture metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTick {
    /// Capture time in milliseconds (monotonic or epoch, consistent per session)
    pub timestamp_ms: u64,
    pub analysis: FrameAnalysis,
    /// Source video width in pixels, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Source video height in pixels, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Follow-target direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Rotation order of the follow target
    pub const ROTATION: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

/// Game identifier recorded on every log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    MirrorPattern,
    HiddenHerb,
    LionsBreath,
    SocialDetective,
    EyeFollow,
    BlinkPower,
    GazeHold,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::MirrorPattern => "MIRROR_PATTERN",
            GameType::HiddenHerb => "HIDDEN_HERB",
            GameType::LionsBreath => "LIONS_BREATH",
            GameType::SocialDetective => "SOCIAL_DETECTIVE",
            GameType::EyeFollow => "EYE_FOLLOW",
            GameType::BlinkPower => "BLINK_POWER",
            GameType::GazeHold => "GAZE_HOLD",
        }
    }
}

/// Outcome of a game attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Won,
    Failed,
    Abandoned,
}

/// Metrics captured during gameplay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Percentage 0-100
    pub accuracy: f64,
    /// Seconds
    pub time_taken: f64,
    /// Wrong clicks/decisions
    pub impulsivity_count: u32,
    /// Motor variation (0-100)
    pub tremor_index: f64,
    /// Times concentration broke
    pub focus_breaks: u32,
    pub completion_status: CompletionStatus,
}

/// A game log before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGameLog {
    pub child_id: String,
    pub game_type: GameType,
    pub level_played: u32,
    pub timestamp: DateTime<Utc>,
    pub metrics: GameMetrics,
    #[serde(default)]
    pub ai_insight: String,
    #[serde(default)]
    pub recommended_action: String,
}

/// One persisted record of a completed or failed game attempt. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub child_id: String,
    pub game_type: GameType,
    pub level_played: u32,
    pub timestamp: DateTime<Utc>,
    pub metrics: GameMetrics,
    #[serde(default)]
    pub ai_insight: String,
    #[serde(default)]
    pub recommended_action: String,
}

impl GameLog {
    pub fn from_new(id: String, log: NewGameLog) -> Self {
        Self {
            id,
            child_id: log.child_id,
            game_type: log.game_type,
            level_played: log.level_played,
            timestamp: log.timestamp,
            metrics: log.metrics,
            ai_insight: log.ai_insight,
            recommended_action: log.recommended_action,
        }
    }
}

/// Heuristic imbalance category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoshaType {
    Vata,
    Pitta,
    Kapha,
}

impl DoshaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoshaType::Vata => "VATA",
            DoshaType::Pitta => "PITTA",
            DoshaType::Kapha => "KAPHA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionCategory {
    Food,
    Activity,
    Breathing,
    Routine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Immediate,
    Today,
    Weekly,
}

/// Lifestyle recommendation attached to a dosha analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub category: PrescriptionCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub urgency: Urgency,
}

/// Derived view over a child's recent game logs. Never authoritative state.
///
/// The three scores are rounded independently, so their sum may be 99 or 101.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoshaAnalysis {
    pub vata_score: f64,
    pub pitta_score: f64,
    pub kapha_score: f64,
    pub dominant_dosha: DoshaType,
    pub insights: Vec<String>,
    pub prescriptions: Vec<Prescription>,
}

/// Score triple stored on a child profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AyurvedicProfile {
    pub vata_score: f64,
    pub pitta_score: f64,
    pub kapha_score: f64,
}

impl DoshaAnalysis {
    pub fn to_ayurvedic_profile(&self) -> AyurvedicProfile {
        AyurvedicProfile {
            vata_score: self.vata_score,
            pitta_score: self.pitta_score,
            kapha_score: self.kapha_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_analysis_wire_format() {
        let json = r#"{"facePresent":true,"eyeLeft":{"x":100,"y":50},"eyeRight":{"x":120,"y":54},"eyesOpen":true}"#;
        let analysis: FrameAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.face_present);
        assert_eq!(analysis.eyes_open, Some(true));

        let sample = analysis.gaze_sample(900).unwrap();
        assert!((sample.x - 110.0).abs() < 1e-9);
        assert!((sample.y - 52.0).abs() < 1e-9);
        assert_eq!(sample.timestamp_ms, 900);
    }

    #[test]
    fn test_no_face_is_valid_response() {
        let analysis: FrameAnalysis = serde_json::from_str(r#"{"facePresent":false}"#).unwrap();
        assert!(!analysis.face_present);
        assert!(analysis.gaze_sample(0).is_none());
    }

    #[test]
    fn test_missing_eye_yields_no_sample() {
        let analysis = FrameAnalysis {
            face_present: true,
            eye_left: Some(EyePoint { x: 1.0, y: 1.0 }),
            eye_right: None,
            eyes_open: Some(true),
        };
        assert!(analysis.gaze_sample(0).is_none());
    }

    #[test]
    fn test_game_log_wire_field_names() {
        let json = r#"{
            "_id": "log_1",
            "child_id": "child-1",
            "game_type": "HIDDEN_HERB",
            "level_played": 3,
            "timestamp": "2024-01-15T14:00:00Z",
            "metrics": {
                "accuracy": 80,
                "time_taken": 45,
                "impulsivity_count": 2,
                "tremor_index": 10,
                "focus_breaks": 1,
                "completion_status": "WON"
            },
            "ai_insight": "",
            "recommended_action": ""
        }"#;
        let log: GameLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.id, "log_1");
        assert_eq!(log.game_type, GameType::HiddenHerb);
        assert_eq!(log.metrics.completion_status, CompletionStatus::Won);

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["_id"], "log_1");
        assert_eq!(value["game_type"], "HIDDEN_HERB");
    }
}
