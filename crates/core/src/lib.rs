//! s3sync-core: Core library for the s3sync tool
//!
//! This crate provides the sync engine itself:
//! - Concurrent walking of the source directory
//! - MD5/ETag change detection and tagged uploads
//! - Provenance-scoped cleanup of remote objects
//! - CDN invalidation of changed paths
//! - Configuration management
//!
//! Storage and CDN access go through the [`ObjectStore`] and [`CdnClient`]
//! traits, so the engine is independent of any specific SDK.

pub mod cancel;
pub mod config;
pub mod connection;
pub mod error;
pub mod filter;
pub mod invalidate;
pub mod options;
pub mod path;
pub mod reconcile;
pub mod sink;
pub mod sync;
pub mod traits;
pub mod upload;
pub mod walker;

#[cfg(test)]
mod testing;

pub use cancel::CancellationToken;
pub use config::{Config, ConfigManager, TargetConfig};
pub use connection::Connection;
pub use error::{Error, Result};
pub use filter::Filter;
pub use invalidate::{InvalidationResult, Invalidator};
pub use options::{ProvenanceTag, SyncOptions};
pub use path::RelativeKey;
pub use reconcile::{ReconcileResult, Reconciler};
pub use sink::{ErrorSink, Stage, SyncError};
pub use sync::{SyncEngine, SyncReport};
pub use traits::{
    CdnClient, DistributionInfo, ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest,
};
pub use upload::Uploader;
pub use walker::{SyncResult, WalkStats, Walker};
