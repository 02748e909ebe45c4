//! Sync options
//!
//! Immutable settings for a single sync target. Built once, then shared
//! read-only by every stage of the run.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::filter::Filter;

/// Default number of entries processed concurrently
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Lower bound for the concurrency limit
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound for the concurrency limit
pub const MAX_CONCURRENCY: usize = 512;

/// Cache-Control value used when long-lived caching is requested (one year)
pub const LONG_CACHE_CONTROL: &str = "max-age=31536000";

/// Content type used when neither the extension nor the configuration gives one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata key/value stamped on every object this tool uploads
///
/// Only objects carrying exactly this pair are ever deleted during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceTag {
    /// Metadata key
    pub key: String,
    /// Metadata value
    pub value: String,
}

impl ProvenanceTag {
    /// Create a tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether an object's metadata carries this tag
    pub fn is_present_in(&self, metadata: &HashMap<String, String>) -> bool {
        metadata.get(&self.key) == Some(&self.value)
    }

    /// Metadata map holding just this tag
    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([(self.key.clone(), self.value.clone())])
    }
}

impl Default for ProvenanceTag {
    fn default() -> Self {
        Self::new("origin", "s3-sync")
    }
}

/// Clamp a requested concurrency into the supported range
pub fn clamp_concurrency(limit: usize) -> usize {
    limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Settings for one local-directory-to-bucket sync
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target bucket
    pub bucket: String,
    /// Local directory to upload
    pub source_dir: PathBuf,
    /// Which entries to include
    pub filter: Option<Filter>,
    /// Follow symlinks instead of reporting them as unsupported
    pub dereference_symlinks: bool,
    /// Maximum number of entries in flight
    pub concurrency_limit: usize,
    /// Delete tagged remote objects that no longer exist locally
    pub cleanup: bool,
    /// CDN distribution to invalidate after the sync
    pub distribution_id: Option<String>,
    /// Upload with the "public-read" canned ACL
    pub public_read: bool,
    /// Custom canned ACL, takes precedence over `public_read`
    pub acl: Option<String>,
    /// Upload with a one-year Cache-Control header
    pub long_lived_cache: bool,
    /// Content type for files whose extension is unknown
    pub default_content_type: Option<String>,
    /// File that receives a copy of every accumulated error
    pub error_log: Option<PathBuf>,
    /// Abort the whole run on the first per-entry error
    pub stop_on_error: bool,
    /// Provenance tag stamped on uploads
    pub provenance: ProvenanceTag,
}

impl SyncOptions {
    /// Create options with defaults for everything but the bucket and source
    pub fn new(bucket: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            source_dir: source_dir.into(),
            filter: None,
            dereference_symlinks: false,
            concurrency_limit: DEFAULT_CONCURRENCY,
            cleanup: false,
            distribution_id: None,
            public_read: false,
            acl: None,
            long_lived_cache: false,
            default_content_type: None,
            error_log: None,
            stop_on_error: false,
            provenance: ProvenanceTag::default(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency_limit = clamp_concurrency(n);
        self
    }

    pub fn cleanup(mut self, enabled: bool) -> Self {
        self.cleanup = enabled;
        self
    }

    pub fn distribution_id(mut self, id: impl Into<String>) -> Self {
        self.distribution_id = Some(id.into());
        self
    }

    pub fn stop_on_error(mut self, enabled: bool) -> Self {
        self.stop_on_error = enabled;
        self
    }

    pub fn dereference_symlinks(mut self, enabled: bool) -> Self {
        self.dereference_symlinks = enabled;
        self
    }

    /// The canned ACL to send with uploads, if any
    pub fn effective_acl(&self) -> Option<String> {
        match &self.acl {
            Some(acl) => Some(acl.clone()),
            None if self.public_read => Some("public-read".to_string()),
            None => None,
        }
    }

    /// The Cache-Control header to send with uploads, if any
    pub fn cache_control(&self) -> Option<&'static str> {
        self.long_lived_cache.then_some(LONG_CACHE_CONTROL)
    }
}
