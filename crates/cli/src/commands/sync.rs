//! sync command - Sync local directories to S3
//!
//! Runs every configured target in turn, or a single ad-hoc target given on
//! the command line, and prints a per-target summary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

use s3sync_aws::{CloudFrontCdn, S3Store, load_sdk_config};
use s3sync_core::{Config, SyncEngine, SyncOptions, SyncReport, TargetConfig};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Sync local directories to S3
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Only sync the configured target for this bucket
    #[arg(long, conflicts_with = "bucket")]
    pub target: Option<String>,

    /// Ad-hoc target bucket, instead of the configured targets
    #[arg(long, requires = "source")]
    pub bucket: Option<String>,

    /// Source directory for the ad-hoc target
    #[arg(long, requires = "bucket")]
    pub source: Option<PathBuf>,

    /// Only include paths matching this regex
    #[arg(long, conflicts_with = "glob")]
    pub pattern: Option<String>,

    /// Only include paths matching this glob
    #[arg(long)]
    pub glob: Option<String>,

    /// Delete tagged remote objects that no longer exist locally
    #[arg(long)]
    pub cleanup: bool,

    /// CloudFront distribution to invalidate afterwards
    #[arg(long)]
    pub distribution_id: Option<String>,

    /// Maximum number of entries processed at once (1-512)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Upload objects as publicly readable
    #[arg(long)]
    pub public_read: bool,

    /// Send a one-year Cache-Control header with uploads
    #[arg(long)]
    pub long_lived_cache: bool,

    /// Follow symlinks instead of skipping them
    #[arg(long)]
    pub dereference_symlinks: bool,

    /// Abort on the first error
    #[arg(long)]
    pub stop_on_error: bool,

    /// Append errors to this file
    #[arg(long)]
    pub error_log: Option<PathBuf>,
}

impl SyncArgs {
    /// Command-line flags take precedence over the config file
    fn apply_to(&self, target: &mut TargetConfig) {
        if self.pattern.is_some() || self.glob.is_some() {
            target.pattern = self.pattern.clone();
            target.glob = self.glob.clone();
        }
        if let Some(concurrency) = self.concurrency {
            target.concurrency = Some(concurrency);
        }
        if let Some(id) = &self.distribution_id {
            target.distribution_id = Some(id.clone());
        }
        if let Some(path) = &self.error_log {
            target.error_log = Some(path.clone());
        }
        target.cleanup |= self.cleanup;
        target.public_read |= self.public_read;
        target.long_lived_cache |= self.long_lived_cache;
        target.dereference_symlinks |= self.dereference_symlinks;
        target.stop_on_error |= self.stop_on_error;
    }

    /// The targets selected by these arguments
    fn select_targets(&self, config: &Config) -> s3sync_core::Result<Vec<TargetConfig>> {
        let mut targets = match (&self.bucket, &self.source, &self.target) {
            (Some(bucket), Some(source), _) => vec![TargetConfig {
                bucket: bucket.clone(),
                source_dir: source.clone(),
                ..Default::default()
            }],
            (_, _, Some(name)) => vec![config.target(name)?.clone()],
            _ => config.targets.clone(),
        };

        if targets.is_empty() {
            return Err(s3sync_core::Error::Config(
                "No sync targets configured. Run `s3sync init` or pass --bucket and --source".into(),
            ));
        }

        for target in &mut targets {
            self.apply_to(target);
        }
        Ok(targets)
    }
}

#[derive(Debug, Serialize)]
struct SyncOutput<'a> {
    status: &'static str,
    targets: &'a [SyncReport],
}

/// Execute the sync command
pub async fn execute(
    args: SyncArgs,
    config_path: Option<PathBuf>,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match super::load_config(config_path, &formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let options: Vec<SyncOptions> = match args
        .select_targets(&config)
        .and_then(|targets| targets.iter().map(TargetConfig::to_options).collect())
    {
        Ok(options) => options,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let sdk_config = load_sdk_config(&config.connection).await;
    let engine = SyncEngine::new(Arc::new(S3Store::new(&sdk_config, &config.connection)))
        .with_cdn(Arc::new(CloudFrontCdn::new(&sdk_config)));

    let spinner = ProgressBar::spinner(formatter.config(), "Syncing...");
    let reports = tokio::select! {
        reports = engine.run_all(options) => reports,
        _ = tokio::signal::ctrl_c() => {
            spinner.finish_and_clear();
            formatter.error("Interrupted, pending uploads were cancelled");
            return ExitCode::Interrupted;
        }
    };
    spinner.finish_and_clear();

    let code = exit_code_for(&reports);

    if formatter.is_json() {
        formatter.json(&SyncOutput {
            status: if code == ExitCode::Success { "success" } else { "error" },
            targets: &reports,
        });
    } else {
        for report in &reports {
            print_report(report, &formatter);
        }
    }

    code
}

/// Overall exit code for a set of reports
///
/// An aborted run exits with the code of the error that stopped it; any
/// other error makes the run a partial failure.
fn exit_code_for(reports: &[SyncReport]) -> ExitCode {
    if let Some(error) = reports
        .iter()
        .find(|r| r.aborted)
        .and_then(|r| r.errors.first())
    {
        return ExitCode::from_error(&error.error);
    }

    if reports.iter().all(SyncReport::is_success) {
        ExitCode::Success
    } else {
        ExitCode::PartialFailure
    }
}

fn summary_table(report: &SyncReport, formatter: &Formatter) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header = |text: &str| {
        if formatter.colors_enabled() {
            Cell::new(text).fg(Color::Cyan)
        } else {
            Cell::new(text)
        }
    };
    table.set_header(vec![header("Changed"), header("Skipped"), header("Removed"), header("Uploaded"), header("Errors")]);

    let removed = match &report.reconcile {
        Some(reconcile) => reconcile.removed.len().to_string(),
        None => "-".to_string(),
    };
    table.add_row(vec![
        Cell::new(report.changed().len()),
        Cell::new(report.skipped().len()),
        Cell::new(removed),
        Cell::new(humansize::format_size(report.walk.uploaded_bytes, humansize::BINARY)),
        Cell::new(report.errors.len()),
    ]);
    table
}

fn print_report(report: &SyncReport, formatter: &Formatter) {
    if formatter.is_quiet() {
        for error in &report.errors {
            formatter.error(&error.to_string());
        }
        return;
    }

    formatter.println(&formatter.heading(&format!("s3://{}", report.bucket)));
    formatter.println(&summary_table(report, formatter).to_string());

    for key in report.changed() {
        tracing::debug!(key = %key, "Changed");
    }
    if let Some(reconcile) = &report.reconcile {
        for key in &reconcile.foreign {
            formatter.warning(&format!("Left untracked object in place: {key}"));
        }
    }
    if report.walk.stats.unsupported > 0 {
        formatter.warning(&format!(
            "Skipped {} unsupported entries (symlinks or special files)",
            report.walk.stats.unsupported
        ));
    }
    for error in &report.errors {
        formatter.error(&error.to_string());
    }

    if report.aborted {
        formatter.error("Sync stopped at the first error");
    } else if let Some(endpoint) = report.endpoint() {
        formatter.success(&format!(
            "Invalidation submitted, check https://{endpoint} in 10-15 minutes"
        ));
    } else if report.is_success() {
        formatter.success("Sync complete");
    }
}
