//! `trawler` - scrape configured listing searches into SQLite.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "trawler", version, about = "Scrape paginated job listings into SQLite")]
struct Cli {
    /// Path to the configuration file (defaults to the XDG config dir)
    #[arg(long, global = true, env = "TRAWLER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape every configured search once
    Run {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a configuration file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the most recent runs
    Runs {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Delete listings past their retention window
    Purge,
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,trawler=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Run { json } => {
            let config = commands::load_config(config_path)?;
            let succeeded = commands::run(config, json).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::InitConfig { force } => {
            commands::init_config(config_path, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Runs { limit } => {
            let config = commands::load_config(config_path)?;
            commands::list_runs(&config, limit).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Purge => {
            let config = commands::load_config(config_path)?;
            commands::purge(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
