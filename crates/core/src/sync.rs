//! Sync orchestration
//!
//! Runs the stages of one sync strictly in order:
//! walk, then cleanup when enabled, then CDN invalidation when a
//! distribution is configured. A disabled stage is not run at all.
//! Stage failures are recorded in the report; they never discard the
//! results of earlier stages.

use std::sync::Arc;

use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::error::Error;
use crate::invalidate::{InvalidationResult, Invalidator};
use crate::options::SyncOptions;
use crate::path::RelativeKey;
use crate::reconcile::{ReconcileResult, Reconciler};
use crate::sink::{ErrorSink, Stage, SyncError};
use crate::traits::{CdnClient, ObjectStore};
use crate::upload::Uploader;
use crate::walker::{SyncResult, Walker};

/// Everything one sync run produced
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub bucket: String,
    pub walk: SyncResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation: Option<InvalidationResult>,
    /// The walk stopped at its first error
    pub aborted: bool,
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    pub fn changed(&self) -> &[RelativeKey] {
        &self.walk.changed
    }

    pub fn skipped(&self) -> &[RelativeKey] {
        &self.walk.skipped
    }

    /// Keys deleted by cleanup, empty when cleanup did not run
    pub fn removed(&self) -> &[String] {
        self.reconcile
            .as_ref()
            .map(|r| r.removed.as_slice())
            .unwrap_or_default()
    }

    /// Public domain of the invalidated distribution
    pub fn endpoint(&self) -> Option<&str> {
        self.invalidation.as_ref().map(|i| i.domain_name.as_str())
    }

    pub fn is_success(&self) -> bool {
        !self.aborted && self.errors.is_empty()
    }
}

/// Runs syncs against an object store and, optionally, a CDN
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
    cdn: Option<Arc<dyn CdnClient>>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, cdn: None }
    }

    pub fn with_cdn(mut self, cdn: Arc<dyn CdnClient>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    /// Sync each target in turn
    pub async fn run_all(&self, targets: Vec<SyncOptions>) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for options in targets {
            reports.push(self.run(options).await);
        }
        reports
    }

    /// Sync one target
    pub async fn run(&self, options: SyncOptions) -> SyncReport {
        let options = Arc::new(options);
        let cancel = CancellationToken::new();
        let bucket = options.bucket.clone();
        tracing::info!(bucket = %bucket, source = %options.source_dir.display(), "Starting sync");

        let errors = self.error_sink(&options);
        let uploader = Arc::new(Uploader::new(Arc::clone(&self.store), Arc::clone(&options)));
        let walk = Walker::new(Arc::clone(&options), uploader, cancel.clone())
            .run(errors)
            .await;
        let mut errors = walk.errors;

        let mut report = SyncReport {
            bucket: bucket.clone(),
            walk: walk.result,
            reconcile: None,
            invalidation: None,
            aborted: walk.aborted,
            errors: Vec::new(),
        };

        if report.aborted {
            report.errors = errors.into_errors();
            return report;
        }

        if options.cleanup {
            let reconciler = Reconciler::new(Arc::clone(&self.store), Arc::clone(&options), cancel);
            match reconciler.run(&report.walk).await {
                Ok(result) => report.reconcile = Some(result),
                Err(e) => errors.push(SyncError::new(Stage::Reconcile, &bucket, e)),
            }
        }

        if let Some(distribution_id) = &options.distribution_id {
            match &self.cdn {
                Some(cdn) => {
                    let paths: Vec<&str> = report
                        .changed()
                        .iter()
                        .map(RelativeKey::as_str)
                        .chain(report.removed().iter().map(String::as_str))
                        .collect();
                    let invalidator = Invalidator::new(Arc::clone(cdn));
                    match invalidator.run(distribution_id, paths.as_slice()).await {
                        Ok(result) => {
                            tracing::info!(
                                "Invalidated distribution at https://{}",
                                result.domain_name
                            );
                            report.invalidation = Some(result);
                        }
                        Err(e) => errors.push(SyncError::new(Stage::Invalidate, distribution_id, e)),
                    }
                }
                None => errors.push(SyncError::new(
                    Stage::Invalidate,
                    distribution_id,
                    Error::Config("No CDN client configured".into()),
                )),
            }
        }

        report.errors = errors.into_errors();
        report
    }

    fn error_sink(&self, options: &SyncOptions) -> ErrorSink {
        let Some(path) = &options.error_log else {
            return ErrorSink::new();
        };

        match ErrorSink::with_log(path) {
            Ok(sink) => sink,
            Err(e) => {
                let mut sink = ErrorSink::new();
                sink.push(SyncError::new(Stage::Walk, path.display().to_string(), e));
                sink
            }
        }
    }
}
