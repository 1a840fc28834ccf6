//! Nayanthara Flux - Real-time gaze/blink signal pipeline and dosha scoring
//!
//! Flux turns per-frame eye landmarks into attention-game outcomes through a
//! deterministic pipeline: gaze sampling → smoothing → windowed classification
//! → confidence gating → session metrics. Completed games are logged and
//! scored by a rule-based dosha inference engine.
//!
//! ## Modules
//!
//! - **Games**: follow, blink and gaze-hold engines over a shared windowed classifier
//! - **Sessions**: per-session counters and archived summaries
//! - **Dosha**: Vata/Pitta/Kapha scoring over recent game logs
//! - **Runtime** (feature `runtime`): async sampling loop with a start/stop runner

pub mod analyzer;
pub mod confidence;
pub mod config;
pub mod dosha;
pub mod error;
pub mod games;
pub mod pipeline;
pub mod session;
pub mod smoothing;
pub mod store;
pub mod types;
pub mod window;

#[cfg(feature = "runtime")]
pub mod runtime;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::TrackingConfig;
pub use dosha::analyze_game_metrics;
pub use error::{ComputeError, SensorError};
pub use games::{GameEngine, GameKind, TickOutcome};
pub use pipeline::{analyze_logs_json, DoshaProfiler, GameProcessor};
pub use session::{SessionMetrics, SessionSummary, SessionTracker};
pub use store::{GameLogStore, InMemoryGameLogStore};

#[cfg(feature = "runtime")]
pub use runtime::{sampling_loop, GameRunner, RunSummary};

/// Library version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by diagnostics
pub const PRODUCER_NAME: &str = "nayanthara-flux";
