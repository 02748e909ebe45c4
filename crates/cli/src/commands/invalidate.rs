//! invalidate command - Manual CloudFront invalidation
//!
//! Submits an invalidation batch for the given paths without syncing.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use s3sync_aws::{CloudFrontCdn, load_sdk_config};
use s3sync_core::{InvalidationResult, Invalidator};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Invalidate paths on a CloudFront distribution
#[derive(Args, Debug)]
pub struct InvalidateArgs {
    /// Distribution to invalidate
    #[arg(long)]
    pub distribution_id: String,

    /// Paths or keys to invalidate (a leading "/" is added when missing)
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InvalidateOutput {
    status: &'static str,
    #[serde(flatten)]
    result: InvalidationResult,
}

/// Execute the invalidate command
pub async fn execute(
    args: InvalidateArgs,
    config_path: Option<PathBuf>,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match super::load_config(config_path, &formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let sdk_config = load_sdk_config(&config.connection).await;
    let invalidator = Invalidator::new(Arc::new(CloudFrontCdn::new(&sdk_config)));

    match invalidator.run(&args.distribution_id, args.paths.as_slice()).await {
        Ok(result) => {
            if formatter.is_json() {
                formatter.json(&InvalidateOutput {
                    status: "success",
                    result,
                });
            } else {
                formatter.success(&format!(
                    "Invalidated {} paths on {} (reference {})",
                    result.paths.len(),
                    result.distribution_id,
                    result.caller_reference
                ));
                formatter.println(&format!("Check https://{} in 10-15 minutes", result.domain_name));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to invalidate {}: {e}", args.distribution_id));
            ExitCode::from_error(&e)
        }
    }
}
