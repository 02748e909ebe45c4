//! CloudFront client implementation
//!
//! Implements the CdnClient trait from s3sync-core on top of
//! aws-sdk-cloudfront.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};

use s3sync_core::{CdnClient, DistributionInfo, Error, Result};

use crate::error::map_sdk_error;

/// CloudFront CDN client
pub struct CloudFrontCdn {
    inner: aws_sdk_cloudfront::Client,
}

impl CloudFrontCdn {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            inner: aws_sdk_cloudfront::Client::new(sdk_config),
        }
    }
}

fn build_batch(paths: &[String], caller_reference: &str) -> Result<InvalidationBatch> {
    let paths = Paths::builder()
        .quantity(paths.len() as i32)
        .set_items(Some(paths.to_vec()))
        .build()
        .map_err(|e| Error::General(e.to_string()))?;

    InvalidationBatch::builder()
        .paths(paths)
        .caller_reference(caller_reference)
        .build()
        .map_err(|e| Error::General(e.to_string()))
}

#[async_trait]
impl CdnClient for CloudFrontCdn {
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<String> {
        let response = self
            .inner
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(build_batch(paths, caller_reference)?)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, distribution_id))?;

        response
            .invalidation()
            .map(|invalidation| invalidation.id().to_string())
            .ok_or_else(|| Error::General("CreateInvalidation returned no invalidation".into()))
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionInfo> {
        let response = self
            .inner
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, id))?;

        let distribution = response
            .distribution()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        Ok(DistributionInfo {
            id: distribution.id().to_string(),
            domain_name: distribution.domain_name().to_string(),
        })
    }
}
