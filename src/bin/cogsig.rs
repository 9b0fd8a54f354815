//! cogsig - Command-line interface for the Cognitive Signature engine
//!
//! Commands:
//! - replay: Replay recorded activity through the engine (batch mode)
//! - run: Sample live activity from stdin on a fixed tick (streaming mode)
//! - config: Print the default engine configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cognitive_signature::encoder::{EncodedRecord, JsonLinesSink, RecordEncoder};
use cognitive_signature::profile::SCATTERED_FOCUS_BELOW;
use cognitive_signature::replay::{self, ActivityRecord};
use cognitive_signature::{
    Clock, DashboardUpdate, EngineConfig, EventCounter, Notification, SignalError,
    SignalProcessor, Sink, SystemClock, TickScheduler, PRODUCER_NAME, VERSION,
};

/// cogsig - Behavioral signal engine for live editing sessions
#[derive(Parser)]
#[command(name = "cogsig")]
#[command(version = VERSION)]
#[command(about = "Turn editing activity into behavioral signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded activity (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Sample live activity from stdin (streaming mode)
    ///
    /// Reads `key <count>` and `focus on|off` lines until EOF.
    Run {
        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the tick interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Print the default engine configuration
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Engine configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one output record per line)
    Ndjson,
    /// JSON array of output records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CogsigError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            input_format,
            output_format,
        } => cmd_replay(&input, config.as_deref(), input_format, output_format),

        Commands::Run {
            config,
            interval_ms,
        } => cmd_run(config.as_deref(), interval_ms),

        Commands::Config => {
            println!("{}", EngineConfig::default().to_json()?);
            Ok(())
        }

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), CogsigError> {
    let config = load_config(config)?;

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records: Vec<ActivityRecord> = match input_format {
        InputFormat::Ndjson => replay::parse_ndjson(&input_data)?,
        InputFormat::Json => replay::parse_array(&input_data)?,
    };

    if records.is_empty() {
        return Err(CogsigError::NoRecords);
    }

    match output_format {
        OutputFormat::Ndjson => {
            let mut sink = JsonLinesSink::new(io::stdout().lock(), false);
            replay::replay(&records, config, &mut sink)?;
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let mut sink = RecordCollector::default();
            replay::replay(&records, config, &mut sink)?;
            let output = if matches!(output_format, OutputFormat::JsonPretty) {
                serde_json::to_string_pretty(&sink.records)?
            } else {
                serde_json::to_string(&sink.records)?
            };
            println!("{}", output);
        }
    }

    info!("replayed {} activity records", records.len());
    Ok(())
}

fn cmd_run(config: Option<&Path>, interval_ms: Option<u64>) -> Result<(), CogsigError> {
    let mut config = load_config(config)?;
    if let Some(interval_ms) = interval_ms {
        config.tick_interval_ms = interval_ms;
    }

    let clock = SystemClock::new();
    let mut processor = SignalProcessor::new(config, clock.now_ms())?;
    let scheduler = TickScheduler::for_processor(&processor);
    let stop = Arc::new(AtomicBool::new(false));

    let reader = {
        let counter = processor.counter();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let result = read_activity(io::stdin().lock(), &counter);
            stop.store(true, Ordering::SeqCst);
            result
        })
    };

    let mut sink = JsonLinesSink::new(io::stdout(), true);
    let ticks = scheduler.run(&mut processor, &mut sink, &clock, &stop)?;

    // Only the reader raises `stop`, so it has already returned
    match reader.join() {
        Ok(result) => result?,
        Err(_) => warn!("stdin reader thread panicked"),
    }

    finish_run(&mut processor, &mut sink, clock.now_ms())?;
    info!("stopped after {} ticks", ticks + 1);
    Ok(())
}

/// Tick once more for activity read since the last tick, then close the session
fn finish_run<K: Sink + ?Sized>(
    processor: &mut SignalProcessor,
    sink: &mut K,
    now_ms: u64,
) -> Result<(), CogsigError> {
    processor.tick(now_ms, sink)?;
    processor.flush_session(now_ms, sink)?;
    Ok(())
}

/// A single line of live activity input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivityCommand {
    Keystrokes(u64),
    Focus(bool),
}

fn parse_activity_line(line: &str) -> Option<ActivityCommand> {
    let mut parts = line.split_whitespace();
    let command = match (parts.next()?, parts.next()) {
        ("key", None) => ActivityCommand::Keystrokes(1),
        ("key", Some(count)) => ActivityCommand::Keystrokes(count.parse().ok()?),
        ("focus", Some("on")) => ActivityCommand::Focus(true),
        ("focus", Some("off")) => ActivityCommand::Focus(false),
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(command)
}

/// Feed activity lines into `counter` until EOF
fn read_activity<R: BufRead>(input: R, counter: &EventCounter) -> Result<(), CogsigError> {
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_activity_line(trimmed) {
            Some(ActivityCommand::Keystrokes(count)) => counter.record_keystrokes(count),
            Some(ActivityCommand::Focus(focused)) => counter.set_focused(focused),
            None => warn!("ignoring unrecognized input: {}", trimmed),
        }
    }
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CogsigError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    let loaded = match config {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Config file {} does not exist", path.display()),
            });
            None
        }
        _ => match load_config(config) {
            Ok(loaded) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: match config {
                        Some(path) => format!("Config file {} valid", path.display()),
                        None => "Using default configuration".to_string(),
                    },
                });
                Some(loaded)
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: CliError::from(e).message,
                });
                None
            }
        },
    };

    if let Some(loaded) = loaded {
        if loaded.sampler_window_ms < loaded.tick_interval_ms {
            checks.push(DoctorCheck {
                name: "sampler_window".to_string(),
                status: CheckStatus::Warning,
                message: format!(
                    "Sampler window ({}ms) is shorter than a tick ({}ms)",
                    loaded.sampler_window_ms, loaded.tick_interval_ms
                ),
            });
        }
        if loaded.unfocused_score >= SCATTERED_FOCUS_BELOW {
            checks.push(DoctorCheck {
                name: "profiles".to_string(),
                status: CheckStatus::Warning,
                message: format!(
                    "unfocused_score {} never drops below {}; the context switcher profile is unreachable",
                    loaded.unfocused_score, SCATTERED_FOCUS_BELOW
                ),
            });
        }
    }

    // Live mode reads activity from stdin
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (type `key N` / `focus on|off`)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("cogsig Doctor Report");
        println!("====================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CogsigError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CogsigError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Sink buffering encoded records for array output
#[derive(Default)]
struct RecordCollector {
    encoder: RecordEncoder,
    records: Vec<EncodedRecord>,
}

impl Sink for RecordCollector {
    fn publish(&mut self, update: &DashboardUpdate) -> Result<(), SignalError> {
        self.records.push(self.encoder.encode_update(update));
        Ok(())
    }

    fn notify(&mut self, notification: &Notification) -> Result<(), SignalError> {
        self.records.push(self.encoder.encode_notification(notification));
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum CogsigError {
    Io(io::Error),
    Engine(SignalError),
    Json(serde_json::Error),
    NoRecords,
    DoctorFailed,
}

impl From<io::Error> for CogsigError {
    fn from(e: io::Error) -> Self {
        CogsigError::Io(e)
    }
}

impl From<SignalError> for CogsigError {
    fn from(e: SignalError) -> Self {
        CogsigError::Engine(e)
    }
}

impl From<serde_json::Error> for CogsigError {
    fn from(e: serde_json::Error) -> Self {
        CogsigError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CogsigError> for CliError {
    fn from(e: CogsigError) -> Self {
        match e {
            CogsigError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CogsigError::Engine(SignalError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'cogsig config' for a valid starting point".to_string()),
            },
            CogsigError::Engine(SignalError::ParseError(msg)) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    "Each record needs timestamp_ms, keystrokes and is_focused".to_string(),
                ),
            },
            CogsigError::Engine(SignalError::Io(e)) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that the output stream is still open".to_string()),
            },
            CogsigError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CogsigError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CogsigError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No activity records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CogsigError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activity_line() {
        assert_eq!(
            parse_activity_line("key 12"),
            Some(ActivityCommand::Keystrokes(12))
        );
        assert_eq!(parse_activity_line("key"), Some(ActivityCommand::Keystrokes(1)));
        assert_eq!(
            parse_activity_line("focus off"),
            Some(ActivityCommand::Focus(false))
        );
        assert_eq!(parse_activity_line("focus maybe"), None);
        assert_eq!(parse_activity_line("key -3"), None);
        assert_eq!(parse_activity_line("key 1 2"), None);
        assert_eq!(parse_activity_line("paste 40"), None);
    }

    #[test]
    fn test_read_activity_feeds_counter() {
        let counter = EventCounter::new();
        let input = "key 5\n\nfocus off\nkey 3\nbogus\n";
        read_activity(input.as_bytes(), &counter).unwrap();

        assert_eq!(counter.keystrokes(), 8);
        assert!(!counter.is_focused());
    }

    #[test]
    fn test_finish_run_ticks_pending_activity() {
        let mut processor = SignalProcessor::new(EngineConfig::default(), 0).unwrap();
        let counter = processor.counter();
        read_activity("key 40\nfocus off\n".as_bytes(), &counter).unwrap();

        let mut sink = cognitive_signature::CollectingSink::new();
        finish_run(&mut processor, &mut sink, 1_000).unwrap();

        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].typing_speed, 220.0);
        assert_eq!(sink.updates[0].focus, 30);
        match sink.notifications.last() {
            Some(Notification::SessionSummary(summary)) => {
                assert_eq!(summary.tick_count, 1);
                assert_eq!(summary.peak_typing_speed, 220.0);
                assert_eq!(summary.average_focus, 30);
            }
            other => panic!("expected a session summary, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_error_codes() {
        let err = CliError::from(CogsigError::Engine(SignalError::InvalidConfig(
            "bad".to_string(),
        )));
        assert_eq!(err.code, "INVALID_CONFIG");
        assert_eq!(CliError::from(CogsigError::NoRecords).code, "NO_RECORDS");
    }

    #[test]
    fn test_record_collector_encodes_both_kinds() {
        let mut sink = RecordCollector::default();
        let records = replay::parse_ndjson(
            "{\"timestamp_ms\": 5000, \"keystrokes\": 0, \"is_focused\": true}",
        )
        .unwrap();
        replay::replay(&records, EngineConfig::default(), &mut sink).unwrap();

        let kinds: Vec<String> = sink
            .records
            .iter()
            .map(|r| serde_json::to_value(r).unwrap()["kind"].to_string())
            .collect();
        assert_eq!(kinds[0], "\"dashboard\"");
        assert!(kinds[1..].iter().all(|k| k == "\"notification\""));
    }
}
