//! pmsync CLI
//!
//! Command-line interface for pmsync - PMS reservation reconciliation.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pmsync_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pmsync")]
#[command(about = "pmsync - keep local reservations in step with your PMS")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync pass
    Sync {
        /// Full reconciliation against the PMS snapshot (default)
        #[arg(long, conflicts_with = "incremental")]
        full: bool,
        /// Apply changes since the last successful sync
        #[arg(long)]
        incremental: bool,
    },
    /// Full sync, then incremental syncs on the configured interval
    Run,
    /// Show store and sync status
    Status,
    /// Show recent sync history
    Log {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect local reservations
    #[command(alias = "res")]
    Reservations {
        #[command(subcommand)]
        command: ReservationCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ReservationCommands {
    /// List all reservations
    #[command(alias = "ls")]
    List,
    /// Show one reservation
    Show {
        /// PMS reservation id
        pms_id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (see `pmsync config show`)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the file is incomplete
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, &cli);

    match cli.command {
        Commands::Sync { incremental, .. } => {
            if incremental {
                commands::sync::incremental(&config, &output).await
            } else {
                commands::sync::full(&config, &output).await
            }
        }
        Commands::Run => commands::run::run(&config, &output).await,
        Commands::Status => commands::status::show(&config, &output),
        Commands::Log { limit } => commands::log::show(&config, limit, &output),
        Commands::Reservations { command } => match command {
            ReservationCommands::List => commands::reservations::list(&config, &output),
            ReservationCommands::Show { pms_id } => {
                commands::reservations::show(&config, &pms_id, &output)
            }
        },
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize tracing
///
/// `PMSYNC_LOG` takes any `EnvFilter` directive. Otherwise the level is
/// `debug` with `--verbose`, `info` for `run` and `warn` for one-shot
/// commands. Logs go to `log_file` when configured, else stderr.
fn init_logging(config: &Config, cli: &Cli) {
    let env_filter = match std::env::var("PMSYNC_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => {
            let level = if cli.verbose {
                "debug"
            } else if matches!(cli.command, Commands::Run) {
                "info"
            } else {
                "warn"
            };
            EnvFilter::new(format!("pmsync_core={},pmsync={}", level, level))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    if let Some(ref log_path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => {
                let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = builder.with_writer(std::io::stderr).try_init();
}
