//! s3sync-aws: AWS SDK adapters for s3sync
//!
//! This crate provides the implementations of the ObjectStore and
//! CdnClient traits using aws-sdk-s3 and aws-sdk-cloudfront. It is the
//! only crate that directly depends on the AWS SDK.

pub mod client;
pub mod cloudfront;
pub mod config;
mod error;

pub use client::S3Store;
pub use cloudfront::CloudFrontCdn;
pub use config::load_sdk_config;
