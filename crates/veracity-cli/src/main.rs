//! veracity CLI
//!
//! Runs quality gates and output validators over JSON or YAML files.
//!
//! # Commands
//!
//! - `gate`: Validate one stage's data against its gate
//! - `metrics`: Check a metric set for mathematical consistency
//! - `artifact`: Validate a finished artifact (math, then citations)
//! - `config`: Check a configuration file
//! - `run`: Replay recorded stage data through the orchestrator
//!
//! Results go to stdout as JSON. Logs go to stderr.
//!
//! # Exit codes
//!
//! - 0: APPROVE, or gate/run passed
//! - 1: WARN
//! - 2: BLOCK, or gate/run failed
//! - 3: Input could not be read or parsed

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Quality gates and fabrication checks for research pipelines
#[derive(Parser)]
#[command(name = "veracity")]
#[command(version)]
#[command(about = "Quality gates and fabrication checks for research pipelines")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one stage's data against its gate
    ///
    /// The stage is a number (1-7) or a name such as `data-gathering`.
    Gate(commands::gate::GateArgs),
    /// Check a metric set for mathematical consistency
    Metrics(commands::metrics::MetricsArgs),
    /// Validate a finished artifact
    ///
    /// Runs the mathematical validator, then (unless --math-only) the
    /// citation and fabrication validator.
    Artifact(commands::artifact::ArtifactArgs),
    /// Check a configuration file against the schema
    Config(commands::config::ConfigArgs),
    /// Replay recorded stage data through the orchestrator
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Gate(args) => commands::gate::handle_gate(args),
        Commands::Metrics(args) => commands::metrics::handle_metrics(args),
        Commands::Artifact(args) => commands::artifact::handle_artifact(args),
        Commands::Config(args) => commands::config::handle_config(args),
        Commands::Run(args) => commands::run::handle_run(args).await,
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            commands::EXIT_INPUT_ERROR
        }
    };

    std::process::exit(exit_code);
}
