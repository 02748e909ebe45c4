//! CDN invalidation
//!
//! Changed and removed keys are submitted as one invalidation batch. The
//! batch's caller reference is the current time truncated to a 10 second
//! window, so repeated triggers inside one window are deduplicated by the
//! CDN instead of piling up invalidations. Propagation itself takes 10-15
//! minutes and is not awaited here.

use std::collections::HashSet;
use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;

use crate::error::Result;
use crate::path::cdn_path;
use crate::traits::CdnClient;

/// Width of the caller reference window, in seconds
pub const IDEMPOTENCY_WINDOW_SECS: i64 = 10;

/// Caller reference for an invalidation submitted at `now`
///
/// Rendered as an ISO-8601 UTC timestamp with milliseconds, which are always
/// zero after truncation.
pub fn caller_reference(now: Timestamp) -> String {
    let secs = now.as_second();
    let window_start = secs - secs.rem_euclid(IDEMPOTENCY_WINDOW_SECS);
    let truncated = Timestamp::from_second(window_start).unwrap_or(now);
    format!("{}.000Z", truncated.strftime("%Y-%m-%dT%H:%M:%S"))
}

/// Leading-slash CDN paths for `keys`, without duplicates
pub fn normalize_paths<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .map(|key| cdn_path(key.as_ref()))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Outcome of an invalidation request
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResult {
    pub distribution_id: String,
    /// Public domain of the distribution
    pub domain_name: String,
    pub caller_reference: String,
    pub paths: Vec<String>,
    /// Present when a batch was actually submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidation_id: Option<String>,
}

/// Submits invalidations for a distribution
pub struct Invalidator {
    cdn: Arc<dyn CdnClient>,
}

impl Invalidator {
    pub fn new(cdn: Arc<dyn CdnClient>) -> Self {
        Self { cdn }
    }

    /// Invalidate `keys` using the current time for the caller reference
    pub async fn run<S: AsRef<str>>(
        &self,
        distribution_id: &str,
        keys: &[S],
    ) -> Result<InvalidationResult> {
        self.invalidate_at(distribution_id, keys, Timestamp::now())
            .await
    }

    /// Invalidate `keys` as if submitted at `now`
    pub async fn invalidate_at<S: AsRef<str>>(
        &self,
        distribution_id: &str,
        keys: &[S],
        now: Timestamp,
    ) -> Result<InvalidationResult> {
        let paths = normalize_paths(keys);
        let reference = caller_reference(now);

        let invalidation_id = if paths.is_empty() {
            tracing::debug!(distribution_id, "Nothing to invalidate");
            None
        } else {
            let id = self
                .cdn
                .create_invalidation(distribution_id, &paths, &reference)
                .await?;
            tracing::info!(
                distribution_id,
                invalidation_id = %id,
                paths = paths.len(),
                "Created distribution invalidation"
            );
            Some(id)
        };

        let distribution = self.cdn.get_distribution(distribution_id).await?;
        tracing::debug!(domain = %distribution.domain_name, "Resolved distribution");

        Ok(InvalidationResult {
            distribution_id: distribution_id.to_string(),
            domain_name: distribution.domain_name,
            caller_reference: reference,
            paths,
            invalidation_id,
        })
    }
}
