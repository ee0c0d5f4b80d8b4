use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use capreplay_core::{
    DriverConfig, DriverError, FrameCheckRuntime, PcapFileOpener, RunSummary, ShutdownController,
    StatsProfiler, StopReason, install_interrupt_handler,
};
use clap::{CommandFactory, Parser, ValueEnum};
use glob::glob;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CAPREPLAY_BUILD_COMMIT"),
    " ",
    env!("CAPREPLAY_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "capreplay")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Replay a capture file into a packet runtime until interrupted.",
    long_about = None,
    after_help = "Examples:\n  capreplay capture.pcapng\n  capreplay capture.pcap --passes 10 --summary json\n\nPress Ctrl-C once to stop after the current packet, twice to kill."
)]
struct Cli {
    /// Path to a .pcap or .pcapng file (a glob matching one file is accepted)
    capture: Option<PathBuf>,

    /// Stop cleanly after this many complete passes (default: replay forever)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    passes: Option<u64>,

    /// Profile summary printed on clean shutdown
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary: SummaryFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
    None,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let Some(capture) = cli.capture else {
        println!("no capture file given");
        println!("{}", Cli::command().render_usage());
        return ExitCode::SUCCESS;
    };

    match cmd_replay(capture, cli.passes, cli.summary) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<DriverError> for CliError {
    fn from(err: DriverError) -> Self {
        let hint = match &err {
            DriverError::Init(_) => None,
            DriverError::Open { .. } => {
                Some("expected a readable .pcap or .pcapng file".to_string())
            }
            DriverError::Source { .. } => {
                Some("the capture must stay readable while it is replayed".to_string())
            }
            DriverError::Cleanup(_) => {
                Some("packets were processed; teardown did not complete".to_string())
            }
        };
        CliError::new(err.to_string(), hint)
    }
}

fn cmd_replay(
    capture: PathBuf,
    passes: Option<u64>,
    summary: SummaryFormat,
) -> Result<(), CliError> {
    let resolved = resolve_input_path(&capture)?;
    if resolved.is_dir() {
        return Err(CliError::new(
            format!("input is not a file: {}", resolved.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    tracing::debug!(input = %resolved.display(), "capture resolved");

    let shutdown = Arc::new(ShutdownController::new());
    install_interrupt_handler(Arc::clone(&shutdown)).context("cannot handle interrupts")?;

    let mut runtime = FrameCheckRuntime::new();
    let mut profiler = StatsProfiler::new();
    let config = DriverConfig { max_passes: passes };
    let run = capreplay_core::run(
        PcapFileOpener::new(&resolved),
        &mut runtime,
        &mut profiler,
        shutdown.as_ref(),
        &config,
    )?;

    print_summary(&profiler, &run, summary)?;
    println!("shut down correctly");
    Ok(())
}

fn print_summary(
    profiler: &StatsProfiler,
    run: &RunSummary,
    format: SummaryFormat,
) -> Result<(), CliError> {
    let profile = profiler.summary();
    match format {
        SummaryFormat::None => {}
        SummaryFormat::Text => {
            print!("{profile}");
            println!(
                "passes: {} (opens: {}, stopped: {})",
                run.passes,
                run.opens,
                stop_name(run.stop)
            );
        }
        SummaryFormat::Json => {
            let mut value =
                serde_json::to_value(&profile).context("JSON serialization failed")?;
            value["passes"] = serde_json::json!(run.passes);
            value["opens"] = serde_json::json!(run.opens);
            value["stop"] = serde_json::json!(stop_name(run.stop));
            let json = serde_json::to_string(&value).context("JSON serialization failed")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn stop_name(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Interrupted => "interrupted",
        StopReason::PassLimit => "pass_limit",
    }
}

fn resolve_input_path(input: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("only one capture can be replayed at a time".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
