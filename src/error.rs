//! Error types for Nayanthara Flux

use thiserror::Error;

/// Errors that can occur during signal processing or scoring
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Frame analyzer failed: {0}")]
    AnalyzerFailed(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Capture-side failures reported by a camera or microphone source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("permission denied for {0}")]
    PermissionDenied(String),

    #[error("no {0} device found")]
    DeviceNotFound(String),

    #[error("{0} disconnected")]
    Disconnected(String),
}

impl SensorError {
    /// Fatal errors block the game from starting and must be reported.
    /// Anything else is treated as a transient miss for the current tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SensorError::PermissionDenied(_) | SensorError::DeviceNotFound(_)
        )
    }
}

impl From<SensorError> for ComputeError {
    fn from(e: SensorError) -> Self {
        ComputeError::SensorUnavailable(e.to_string())
    }
}
