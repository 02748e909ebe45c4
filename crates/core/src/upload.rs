//! Change detection and upload
//!
//! A file is uploaded unless the remote object's ETag already equals the
//! MD5 of the local bytes. Every upload carries the provenance tag so that
//! cleanup can later recognise it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::error::Result;
use crate::options::{FALLBACK_CONTENT_TYPE, SyncOptions};
use crate::path::RelativeKey;
use crate::traits::{ObjectStore, PutRequest, strip_etag};
use crate::walker::{FileHandler, FileOutcome, LocalEntry};

/// Hex MD5 of a body, comparable with a single-part upload's ETag
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// Content type for a path based on its extension
///
/// Text types get an explicit UTF-8 charset.
pub fn guess_content_type(path: &Path) -> Option<String> {
    let mime = mime_guess::from_path(path).first()?;
    let essence = mime.essence_str();
    let textual = mime.type_() == mime_guess::mime::TEXT
        || essence == "application/json"
        || essence == "application/javascript";

    Some(if textual {
        format!("{essence}; charset=utf-8")
    } else {
        essence.to_string()
    })
}

/// Uploads changed files to the target bucket
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    options: Arc<SyncOptions>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, options: Arc<SyncOptions>) -> Self {
        Self { store, options }
    }

    /// Upload `path` as `key` unless the remote copy is identical
    pub async fn sync_file(&self, path: &Path, key: RelativeKey) -> Result<FileOutcome> {
        let bucket = &self.options.bucket;
        let body = tokio::fs::read(path).await?;
        let hash = content_hash(&body);

        match self.store.head_object(bucket, key.as_str()).await {
            Ok(remote) => {
                if remote.etag.as_deref().map(strip_etag) == Some(hash.as_str()) {
                    tracing::debug!(key = %key, "Skipping identical file");
                    return Ok(FileOutcome::Skipped(key));
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(key = %key, "File doesn't exist remotely yet");
            }
            Err(e) => return Err(e),
        }

        let bytes = body.len() as u64;
        let request = PutRequest {
            bucket: bucket.clone(),
            key: key.to_string(),
            body,
            content_type: self.content_type_for(path),
            acl: self.options.effective_acl(),
            cache_control: self.options.cache_control().map(str::to_string),
            metadata: self.options.provenance.to_metadata(),
        };
        self.store.put_object(request).await?;

        tracing::info!(key = %key, bytes, "Uploaded");
        Ok(FileOutcome::Changed { key, bytes })
    }

    fn content_type_for(&self, path: &Path) -> String {
        if let Some(content_type) = guess_content_type(path) {
            return content_type;
        }

        let fallback = self
            .options
            .default_content_type
            .as_deref()
            .unwrap_or(FALLBACK_CONTENT_TYPE);
        tracing::warn!(
            "Unknown content type for {}, using {fallback}",
            path.display()
        );
        fallback.to_string()
    }
}

#[async_trait]
impl FileHandler for Uploader {
    async fn handle_file(&self, entry: &LocalEntry, key: RelativeKey) -> Result<FileOutcome> {
        self.sync_file(&entry.path, key).await
    }
}
