//! Conductor CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Drive an agent from a scripted provider, single-shot or interactive
//! - `config`  — Show, locate, initialize or validate configuration
//! - `log`     — Print a persisted behavior log

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "conductor",
    about = "Conductor — tool-calling agent orchestration with tracing and breakpoints",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an agent against a scripted provider
    Run(commands::run::RunArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a persisted behavior log
    Log {
        /// Log file (defaults to the configured behavior log path)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Only show the last N events
        #[arg(short, long)]
        tail: Option<usize>,

        /// Print the raw JSON instead of one line per event
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Log { path, tail, json } => commands::log::run(path, tail, json).await?,
    }

    Ok(())
}
