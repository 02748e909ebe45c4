//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use s3sync_core::{Config, ConfigManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod init;
mod invalidate;
mod sync;

/// s3sync - Sync a local directory to an S3 bucket
///
/// Uploads changed files, removes files this tool uploaded that no longer
/// exist locally, and invalidates a CloudFront distribution.
#[derive(Parser, Debug)]
#[command(name = "s3sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Configuration file (default: ./s3sync.toml, then the user config dir)
    #[arg(long, global = true, env = "S3SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync configured targets (or one ad-hoc target) to S3
    Sync(sync::SyncArgs),

    /// Invalidate paths on a CloudFront distribution
    Invalidate(invalidate::InvalidateArgs),

    /// Write a starter configuration file
    Init(init::InitArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Sync(args) => sync::execute(args, cli.config, output_config).await,
        Commands::Invalidate(args) => invalidate::execute(args, cli.config, output_config).await,
        Commands::Init(args) => init::execute(args, cli.config, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}

fn config_manager(path: Option<PathBuf>) -> s3sync_core::Result<ConfigManager> {
    match path {
        Some(path) => Ok(ConfigManager::with_path(path)),
        None => ConfigManager::new(),
    }
}

/// Load the configuration, reporting failures through `formatter`
fn load_config(path: Option<PathBuf>, formatter: &Formatter) -> Result<Config, ExitCode> {
    let loaded = config_manager(path).and_then(|manager| {
        tracing::debug!(path = %manager.config_path().display(), "Loading configuration");
        manager.load()
    });

    loaded.map_err(|e| {
        formatter.error(&format!("Failed to load configuration: {e}"));
        ExitCode::from_error(&e)
    })
}
