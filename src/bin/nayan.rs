//! Nayan CLI - Command-line interface for Nayanthara Flux
//!
//! Commands:
//! - analyze: Run the dosha engine over recorded game logs
//! - replay: Replay recorded analyzer frames through a game engine
//! - simulate: Drive a game engine with the simulated analyzer
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, LevelFilter};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use nayanthara_flux::analyzer::SimulatedAnalyzer;
use nayanthara_flux::dosha::{analyze_game_metrics, game_ayurvedic_name, DEFAULT_CHILD_NAME};
use nayanthara_flux::games::{GameKind, TickOutcome};
use nayanthara_flux::pipeline::{parse_game_logs, GameProcessor};
use nayanthara_flux::session::SessionTracker;
use nayanthara_flux::types::{FrameTick, GameLog};
use nayanthara_flux::{ComputeError, TrackingConfig, FLUX_VERSION, PRODUCER_NAME};

/// Nayan - gaze/blink signal pipeline and dosha scoring
#[derive(Parser)]
#[command(name = "nayan")]
#[command(author = "Nayanthara Team")]
#[command(version = FLUX_VERSION)]
#[command(about = "Score attention games and infer dosha balance", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dosha engine over recorded game logs
    Analyze {
        /// Input file path (use - for stdin); JSON array or NDJSON
        #[arg(short, long)]
        input: PathBuf,

        /// Only consider logs for this child
        #[arg(long)]
        child_id: Option<String>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Replay recorded frames (NDJSON of {timestamp_ms, analysis}) through a game engine
    Replay {
        /// Game to replay
        #[arg(short, long, value_enum)]
        game: GameArg,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Tracking configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Child id recorded on a completion log
        #[arg(long, default_value = "replay")]
        child_id: String,

        /// Child name used in the completion insight
        #[arg(long, default_value = DEFAULT_CHILD_NAME)]
        child_name: String,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Drive a game engine with the simulated analyzer
    Simulate {
        /// Game to simulate
        #[arg(short, long, value_enum)]
        game: GameArg,

        /// Number of sampling ticks
        #[arg(long, default_value = "100")]
        ticks: u64,

        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Tracking configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a tracking configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a saved session history file
        #[arg(long)]
        sessions: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GameArg {
    Follow,
    Blink,
    Gaze,
}

impl From<GameArg> for GameKind {
    fn from(arg: GameArg) -> Self {
        match arg {
            GameArg::Follow => GameKind::Follow,
            GameArg::Blink => GameKind::Blink,
            GameArg::Gaze => GameKind::Gaze,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), NayanCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            child_id,
            output_format,
        } => cmd_analyze(&input, child_id.as_deref(), output_format),

        Commands::Replay {
            game,
            input,
            config,
            child_id,
            child_name,
            flush,
        } => cmd_replay(
            game.into(),
            &input,
            config.as_deref(),
            &child_id,
            &child_name,
            flush,
        ),

        Commands::Simulate {
            game,
            ticks,
            seed,
            config,
            output_format,
        } => cmd_simulate(game.into(), ticks, seed, config.as_deref(), output_format),

        Commands::Doctor {
            config,
            sessions,
            json,
        } => cmd_doctor(config.as_deref(), sessions.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, NayanCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<TrackingConfig, NayanCliError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            TrackingConfig::from_json(&content).map_err(NayanCliError::Config)
        }
        None => Ok(TrackingConfig::default()),
    }
}

fn to_json<T: serde::Serialize>(value: &T, format: &OutputFormat) -> Result<String, NayanCliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    })
}

fn cmd_analyze(
    input: &Path,
    child_id: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), NayanCliError> {
    let input_data = read_input(input)?;
    let mut logs: Vec<GameLog> = parse_game_logs(&input_data)?;
    if let Some(child) = child_id {
        logs.retain(|log| log.child_id == child);
    }
    info!("analyzing {} game logs", logs.len());
    for log in logs.iter().rev().take(5) {
        debug!(
            "  {} ({}) accuracy {}",
            log.game_type.as_str(),
            game_ayurvedic_name(log.game_type),
            log.metrics.accuracy
        );
    }

    let analysis = analyze_game_metrics(&logs);
    println!("{}", to_json(&analysis, &output_format)?);
    Ok(())
}

/// One line of replay output
#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayRecord<'a> {
    Window {
        timestamp_ms: u64,
        #[serde(flatten)]
        report: &'a nayanthara_flux::window::WindowReport,
    },
    Completion {
        log: &'a nayanthara_flux::types::NewGameLog,
    },
    Summary {
        game: GameKind,
        frames: u64,
        skipped: u64,
        session: Option<&'a nayanthara_flux::session::SessionSummary>,
    },
}

fn cmd_replay(
    kind: GameKind,
    input: &Path,
    config: Option<&Path>,
    child_id: &str,
    child_name: &str,
    flush: bool,
) -> Result<(), NayanCliError> {
    let config = load_config(config)?;
    let mut processor = GameProcessor::new(kind, &config);
    processor.start_session();

    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        Box::new(io::BufReader::new(io::stdin()))
    } else {
        Box::new(io::BufReader::new(fs::File::open(input)?))
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut frames = 0u64;
    let mut skipped = 0u64;
    let mut completion = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tick: FrameTick = serde_json::from_str(&line)
            .map_err(|e| NayanCliError::ParseError(format!("line {}: {}", n + 1, e)))?;
        frames += 1;

        match processor.process_tick(&tick) {
            TickOutcome::Skipped => skipped += 1,
            TickOutcome::Sampled => {}
            TickOutcome::WindowClosed(report) => {
                let record = ReplayRecord::Window {
                    timestamp_ms: tick.timestamp_ms,
                    report: &report,
                };
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
                if flush {
                    out.flush()?;
                }
            }
        }

        if completion.is_none() {
            completion = processor.completion_log(child_id, child_name);
        }
    }

    if frames == 0 {
        return Err(NayanCliError::NoFrames);
    }

    if let Some(log) = &completion {
        writeln!(out, "{}", serde_json::to_string(&ReplayRecord::Completion { log })?)?;
    }

    let session = processor.end_session();
    let summary = ReplayRecord::Summary {
        game: kind,
        frames,
        skipped,
        session: session.as_ref(),
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    out.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct SimulationReport {
    game: GameKind,
    ticks: u64,
    seed: Option<u64>,
    snapshot: nayanthara_flux::games::EngineSnapshot,
    session: Option<nayanthara_flux::session::SessionSummary>,
}

fn cmd_simulate(
    kind: GameKind,
    ticks: u64,
    seed: Option<u64>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), NayanCliError> {
    let config = load_config(config)?;
    let analyzer = match seed {
        Some(seed) => SimulatedAnalyzer::with_seed(seed),
        None => SimulatedAnalyzer::new(),
    };
    let mut processor = GameProcessor::new(kind, &config);
    processor.start_session();

    let interval_ms = processor.config().sample_interval_ms;
    let (width, height) = (processor.config().frame_width, processor.config().frame_height);
    for i in 0..ticks {
        let timestamp_ms = i * interval_ms;
        let tick = FrameTick {
            timestamp_ms,
            analysis: analyzer.sample(timestamp_ms),
            width: Some(width),
            height: Some(height),
        };
        processor.process_tick(&tick);
    }

    let snapshot = processor.snapshot();
    let report = SimulationReport {
        game: kind,
        ticks,
        seed,
        snapshot,
        session: processor.end_session(),
    };
    println!("{}", to_json(&report, &output_format)?);
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    sessions: Option<&Path>,
    json: bool,
) -> Result<(), NayanCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Nayanthara Flux version {}", FLUX_VERSION),
    });

    if let Some(config_path) = config {
        checks.push(check_config(config_path));
    } else {
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using default tracking configuration".to_string(),
        });
    }

    if let Some(sessions_path) = sessions {
        checks.push(check_sessions(sessions_path));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay input ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Nayan Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(NayanCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config(path: &Path) -> DoctorCheck {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }
        }
    };
    match TrackingConfig::from_json(&content) {
        Ok(config) if config.clamped() == config => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Config valid (windows {}/{}/{}, confidence minimum {})",
                config.follow_window_size,
                config.blink_window_size,
                config.gaze_window_size,
                config.confidence_minimum
            ),
        },
        Ok(_) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config has out-of-range values; they will be clamped".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Invalid config JSON: {}", e),
        },
    }
}

fn check_sessions(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "sessions".to_string(),
            status: CheckStatus::Warning,
            message: "Sessions file does not exist".to_string(),
        };
    }
    match fs::read_to_string(path).map(|content| SessionTracker::from_json(&content)) {
        Ok(Ok(tracker)) => DoctorCheck {
            name: "sessions".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Sessions file valid ({} archived sessions)",
                tracker.archived().len()
            ),
        },
        Ok(Err(e)) => DoctorCheck {
            name: "sessions".to_string(),
            status: CheckStatus::Error,
            message: format!("Invalid sessions JSON: {}", e),
        },
        Err(e) => DoctorCheck {
            name: "sessions".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read sessions file: {}", e),
        },
    }
}

// Error types

enum NayanCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    Config(serde_json::Error),
    NoFrames,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for NayanCliError {
    fn from(e: io::Error) -> Self {
        NayanCliError::Io(e)
    }
}

impl From<ComputeError> for NayanCliError {
    fn from(e: ComputeError) -> Self {
        NayanCliError::Compute(e)
    }
}

impl From<serde_json::Error> for NayanCliError {
    fn from(e: serde_json::Error) -> Self {
        NayanCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NayanCliError> for CliError {
    fn from(e: NayanCliError) -> Self {
        match e {
            NayanCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            NayanCliError::Compute(e) => {
                let (code, hint) = compute_error_code(&e);
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            NayanCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            NayanCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'nayan doctor --config <file>' for details".to_string()),
            },
            NayanCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            NayanCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            NayanCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be {\"timestamp_ms\": .., \"analysis\": {..}}".to_string()),
            },
        }
    }
}

fn compute_error_code(e: &ComputeError) -> (&'static str, &'static str) {
    match e {
        ComputeError::ParseError(_) => (
            "PARSE_ERROR",
            "Ensure input is a JSON array or NDJSON of game logs",
        ),
        ComputeError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
        ComputeError::EncodingError(_) => ("ENCODING_ERROR", "Input must be valid UTF-8"),
        ComputeError::InvalidConfig(_) => (
            "CONFIG_ERROR",
            "Run 'nayan doctor --config <file>' for details",
        ),
        ComputeError::SensorUnavailable(_) => (
            "SENSOR_UNAVAILABLE",
            "Check camera permissions and that a device is connected",
        ),
        ComputeError::AnalyzerFailed(_) => (
            "ANALYZER_FAILED",
            "The vision endpoint failed; the simulated analyzer can stand in",
        ),
        ComputeError::UnknownGame(_) => ("UNKNOWN_GAME", "Use one of: follow, blink, gaze"),
        ComputeError::RuntimeError(_) => ("RUNTIME_ERROR", "Retry the run"),
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
