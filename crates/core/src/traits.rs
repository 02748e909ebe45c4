//! ObjectStore and CdnClient trait definitions
//!
//! These traits define the remote collaborators of the sync engine.
//! They allow the engine to be decoupled from the specific SDK implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for a remote object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag with surrounding quotes removed (MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// User metadata attached to the object
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the ETag, stripping any quoting the backend kept around it
    pub fn with_etag(mut self, etag: &str) -> Self {
        self.etag = Some(strip_etag(etag).to_string());
        self
    }

    /// Attach user metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Remove the quote marks S3 keeps inside ETag values
pub fn strip_etag(etag: &str) -> &str {
    etag.trim_matches('"')
}

/// An upload request
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Target bucket
    pub bucket: String,
    /// Target key
    pub key: String,
    /// Object body
    pub body: Vec<u8>,
    /// Content type header
    pub content_type: String,
    /// Canned ACL, e.g. "public-read"
    pub acl: Option<String>,
    /// Cache-Control header
    pub cache_control: Option<String>,
    /// User metadata
    pub metadata: HashMap<String, String>,
}

/// Result of a list operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Continuation token for pagination
    pub continuation_token: Option<String>,
}

/// Public information about a CDN distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInfo {
    /// Distribution identifier
    pub id: String,
    /// Public domain name, e.g. d111111abcdef8.cloudfront.net
    pub domain_name: String,
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and faked in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get object metadata. A missing object is `Error::NotFound`.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    /// Upload an object
    async fn put_object(&self, request: PutRequest) -> Result<ObjectInfo>;

    /// List one page of objects in a bucket
    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Trait for edge cache operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdnClient: Send + Sync {
    /// Submit an invalidation batch, returning the invalidation id
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<String>;

    /// Look up a distribution
    async fn get_distribution(&self, distribution_id: &str) -> Result<DistributionInfo>;
}
