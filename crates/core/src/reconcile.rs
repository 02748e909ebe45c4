//! Provenance-scoped cleanup of remote objects
//!
//! Mark and sweep: the walk marks every key that still exists locally, the
//! full bucket listing is paged in, and every unmarked object is deleted
//! only if it carries this tool's provenance tag. Objects without the tag
//! were put there by someone else and are never touched.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::options::SyncOptions;
use crate::traits::{ListOptions, ObjectInfo, ObjectStore};
use crate::walker::SyncResult;

/// Keys removed by one cleanup run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileResult {
    pub removed: Vec<String>,
    /// Number of objects in the bucket listing
    pub listed: usize,
    /// Untagged objects left alone although missing locally
    pub foreign: Vec<String>,
}

/// Keys that must survive cleanup
struct PresentSet<'a> {
    keys: HashSet<&'a str>,
    failed: Vec<&'a str>,
    everything: bool,
}

impl<'a> PresentSet<'a> {
    fn new(local: &'a SyncResult) -> Self {
        Self {
            keys: local.present_keys().map(|k| k.as_str()).collect(),
            failed: local.failed.iter().map(|k| k.as_str()).collect(),
            everything: local.root_failed,
        }
    }

    /// Present keys, plus anything at or below an entry that failed to process
    fn contains(&self, key: &str) -> bool {
        self.everything
            || self.keys.contains(key)
            || self.failed.iter().any(|failed| {
                key.strip_prefix(failed)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
    }
}

enum Sweep {
    Removed(String),
    Foreign(String),
    Gone,
}

/// Deletes tagged remote objects that no longer exist locally
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    options: Arc<SyncOptions>,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        options: Arc<SyncOptions>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            options,
            cancel,
        }
    }

    /// Page through the whole bucket
    ///
    /// Any failing page fails the listing; partial listings are never diffed.
    pub async fn list_all(&self) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            self.cancel.check()?;
            let options = ListOptions {
                continuation_token: continuation_token.take(),
            };
            let page = self.store.list_objects(&self.options.bucket, options).await?;
            tracing::trace!(items = page.items.len(), truncated = page.truncated, "Listed page");
            objects.extend(page.items);

            if !page.truncated {
                break;
            }
            continuation_token = Some(page.continuation_token.ok_or_else(|| {
                Error::General(format!(
                    "Listing of {} is truncated but has no continuation token",
                    self.options.bucket
                ))
            })?);
        }

        Ok(objects)
    }

    /// Remove tagged objects missing from `local`
    pub async fn run(&self, local: &SyncResult) -> Result<ReconcileResult> {
        let objects = self.list_all().await?;
        let listed = objects.len();
        let present = PresentSet::new(local);

        if present.everything {
            tracing::warn!("Source directory could not be read, skipping cleanup");
            return Ok(ReconcileResult {
                listed,
                ..Default::default()
            });
        }

        let candidates: Vec<String> = objects
            .into_iter()
            .map(|object| object.key)
            .filter(|key| {
                let keep = present.contains(key);
                if keep {
                    tracing::trace!(key = %key, "Present locally and remotely");
                }
                !keep
            })
            .collect();

        let sweeps: Vec<Sweep> = stream::iter(candidates)
            .map(|key| self.sweep(key))
            .buffer_unordered(self.options.concurrency_limit)
            .try_collect()
            .await?;

        let mut result = ReconcileResult {
            listed,
            ..Default::default()
        };
        for sweep in sweeps {
            match sweep {
                Sweep::Removed(key) => result.removed.push(key),
                Sweep::Foreign(key) => result.foreign.push(key),
                Sweep::Gone => {}
            }
        }
        Ok(result)
    }

    async fn sweep(&self, key: String) -> Result<Sweep> {
        self.cancel.check()?;
        let bucket = &self.options.bucket;

        let head = match self.store.head_object(bucket, &key).await {
            Ok(head) => head,
            Err(e) if e.is_not_found() => return Ok(Sweep::Gone),
            Err(e) => return Err(e),
        };

        if !self.options.provenance.is_present_in(&head.metadata) {
            tracing::debug!(key = %key, "Manually uploaded file detected in bucket");
            return Ok(Sweep::Foreign(key));
        }

        tracing::debug!(key = %key, "File marked for deletion");
        self.store.delete_object(bucket, &key).await?;
        tracing::info!(key = %key, "File deleted");
        Ok(Sweep::Removed(key))
    }
}
