//! init command - Write a starter configuration
//!
//! Creates a configuration file with one example target that the user
//! edits before the first sync.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use s3sync_core::{Config, TargetConfig};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Write a starter configuration file
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,

    /// Bucket for the example target
    #[arg(long, default_value = "my-bucket")]
    pub bucket: String,

    /// Source directory for the example target
    #[arg(long, default_value = "dist")]
    pub source: PathBuf,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    status: &'static str,
    path: String,
}

fn starter_config(args: &InitArgs) -> Config {
    Config {
        targets: vec![TargetConfig {
            bucket: args.bucket.clone(),
            source_dir: args.source.clone(),
            cleanup: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Execute the init command
pub fn execute(args: InitArgs, config_path: Option<PathBuf>, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match super::config_manager(config_path) {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let path = manager.config_path().display().to_string();
    if manager.config_path().exists() && !args.force {
        formatter.error(&format!("{path} already exists, use --force to overwrite it"));
        return ExitCode::UsageError;
    }

    if let Err(e) = manager.save(&starter_config(&args)) {
        formatter.error(&format!("Failed to write {path}: {e}"));
        return ExitCode::from_error(&e);
    }

    if formatter.is_json() {
        formatter.json(&InitOutput {
            status: "success",
            path,
        });
    } else {
        formatter.success(&format!("Wrote {path}"));
    }
    ExitCode::Success
}
