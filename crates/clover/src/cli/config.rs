//! The `clover config` command for configuration management.

use std::fmt::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use clover_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration with resolved dataset roots
    Show,

    /// Show config file path
    Path,

    /// Check a config file for errors
    Check {
        /// Config file to check (defaults to the standard location)
        path: Option<std::path::PathBuf>,
    },

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            println!("{}", render_resolved(&config, &Config::default_path()));
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Check { path } => {
            let path = path.unwrap_or_else(Config::default_path);
            if !path.exists() {
                anyhow::bail!("No config file at: {}", path.display());
            }
            Config::load_from(&path)?;
            println!("Configuration OK: {}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Write default config
            let config = Config::default();
            let toml = config.to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Summary of where a run would read from and write to, after tilde expansion.
pub fn render_resolved(config: &Config, config_path: &Path) -> String {
    let source = config.data_source();
    let output = config.out_path();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# config file:  {} ({})",
        config_path.display(),
        if config_path.exists() { "found" } else { "not found, using defaults" }
    );
    let _ = writeln!(
        out,
        "# data source:  {}{}",
        source.display(),
        if source.is_dir() { "" } else { " (missing)" }
    );
    let _ = writeln!(out, "# output root:  {}", output.display());
    let _ = writeln!(
        out,
        "# dataset:      {} ({} workers, {}px short side)",
        config.general.dataset_name,
        config.processing.parallel_workers,
        config.processing.target_short_side
    );
    out
}
