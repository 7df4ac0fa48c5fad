//! rollgate — drive a single subject through the rollout state machine.
//!
//! # Usage
//!
//! ```text
//! rollgate run --config rollgate.toml
//! rollgate table
//! rollgate trigger --state pending --event startup_deploy
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use rollgate_core::{Event, State};

mod commands;

#[derive(Parser)]
#[command(
    name = "rollgate",
    about = "Rollout state machine — deploy, probe, and gate a single subject",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rollout until it reaches a terminal state.
    ///
    /// Exits 0 on success, 1 when the rollout ends in failure or is
    /// revoked, 2 on error. Ctrl-C revokes the rollout.
    Run {
        /// Path to rollgate.toml (default: built-in defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        #[command(flatten)]
        overrides: commands::run::Overrides,
    },
    /// Print the effective transition table and lint findings.
    Table {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Evaluate a single transition.
    Trigger {
        /// Current state (e.g. pending, startup_success).
        #[arg(short, long)]
        state: State,
        /// Event to apply (e.g. startup_deploy, event1).
        #[arg(short, long)]
        event: Event,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let result = match cli.command {
        Commands::Run {
            config,
            format,
            overrides,
        } => commands::run::run(config.as_deref(), format, overrides).await,
        Commands::Table { config, format } => {
            commands::table::print_table(config.as_deref(), format).map(|_| true)
        }
        Commands::Trigger {
            state,
            event,
            config,
        } => commands::table::trigger(config.as_deref(), state, event).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rollgate=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
