//! Clover CLI - curate planetary-surface image archives into tiled ML datasets.
//!
//! Clover walks a mounted archive, quarantines corrupt, distorted and
//! statistically suspect images, and cuts the rest into square tiles with a
//! per-output report.
//!
//! # Usage
//!
//! ```bash
//! # Curate one LROC mission phase
//! clover process --dtype edr --phase 12
//!
//! # Curate a flat labeled-image directory with explicit roots
//! clover process --source ./msl --output ./msl_tiles --format jsonl
//!
//! # View configuration
//! clover config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Clover - curate planetary-surface image archives into tiled ML datasets.
#[derive(Parser, Debug)]
#[command(name = "clover")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, rescale and tile an image archive
    Process(cli::process::ProcessArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match clover_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `clover config path`."
            );
            clover_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Clover v{}", clover_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
