//! Sieve CLI
//!
//! Offline front end for the triage engine:
//! - assess a message from an evidence file with pre-computed producer output
//! - replay a recorded decision trace under a configuration
//! - validate a configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod advisor;
mod commands;
mod evidence;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "sieve")]
#[command(about = "Sieve - evidence routing and risk fusion for message triage", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, e.g. `info` or `sieve_engine=debug`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Output format (json, yaml)
    #[arg(short, long, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one message from an evidence file
    Assess {
        /// Evidence file (JSON or YAML) with the input and producer fragments
        #[arg(short, long)]
        evidence: PathBuf,

        /// Engine configuration (TOML, YAML or JSON)
        #[arg(short, long, env = "SIEVE_CONFIG")]
        config: Option<PathBuf>,

        /// Recorded advisor output (JSON) to use as the advisor's answer
        #[arg(short, long)]
        advisory: Option<PathBuf>,

        /// Write the decision trace here
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },

    /// Recompute a decision from its trace
    Replay {
        /// Trace file written by `assess --trace-out`
        #[arg(short, long)]
        trace: PathBuf,

        #[arg(short, long, env = "SIEVE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and print its fingerprint
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level).ok(),
        None => tracing_subscriber::EnvFilter::try_from_default_env().ok(),
    };
    tracing_subscriber::registry()
        .with(filter.unwrap_or_else(|| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Assess {
            evidence,
            config,
            advisory,
            trace_out,
        } => {
            commands::assess(
                &evidence,
                config.as_deref(),
                advisory.as_deref(),
                trace_out.as_deref(),
                cli.output,
            )
            .await
        }
        Commands::Replay { trace, config } => commands::replay(&trace, config.as_deref(), cli.output),
        Commands::CheckConfig { config } => commands::check_config(&config, cli.output),
    }
}
