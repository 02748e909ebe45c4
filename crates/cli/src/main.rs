//! s3sync - Sync a local directory to S3
//!
//! Uploads changed files to a bucket, removes stale files it uploaded
//! earlier, and invalidates the CloudFront distribution in front of it.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod exit_code;
mod output;

use commands::Cli;

const DEBUG_FILTER: &str = "s3sync_core=debug,s3sync_aws=debug,s3sync_cli=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so that --json output stays parseable
    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
