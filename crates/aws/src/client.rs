//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3sync-core.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use s3sync_core::{
    Connection, Error, ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest, Result,
};

use crate::error::map_sdk_error;

/// S3 object store
pub struct S3Store {
    inner: aws_sdk_s3::Client,
}

impl S3Store {
    /// Create a store from a loaded SDK config and the connection settings
    pub fn new(sdk_config: &SdkConfig, connection: &Connection) -> Self {
        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(connection.force_path_style);

        if let Some(endpoint) = &connection.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            inner: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

fn timestamp(dt: &aws_sdk_s3::primitives::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let subject = format!("{bucket}/{key}");
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                // HEAD responses carry no body, so a 404 has no error code
                if e.as_service_error().is_some_and(HeadObjectError::is_not_found) {
                    Error::NotFound(subject.clone())
                } else {
                    map_sdk_error(e, &subject)
                }
            })?;

        let mut info = ObjectInfo::new(key);
        info.size_bytes = response.content_length();
        info.last_modified = response.last_modified().and_then(timestamp);
        info.content_type = response.content_type().map(str::to_string);
        if let Some(etag) = response.e_tag() {
            info = info.with_etag(etag);
        }
        if let Some(metadata) = response.metadata() {
            info = info.with_metadata(metadata.clone());
        }

        Ok(info)
    }

    async fn put_object(&self, request: PutRequest) -> Result<ObjectInfo> {
        let subject = format!("{}/{}", request.bucket, request.key);
        let size = request.body.len() as i64;

        let response = self
            .inner
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_cache_control(request.cache_control)
            .set_metadata(Some(request.metadata))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &subject))?;

        let mut info = ObjectInfo::new(request.key);
        info.size_bytes = Some(size);
        if let Some(etag) = response.e_tag() {
            info = info.with_etag(etag);
        }

        Ok(info)
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(options.continuation_token)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let mut info = ObjectInfo::new(object.key().unwrap_or_default());
                info.size_bytes = object.size();
                info.last_modified = object.last_modified().and_then(timestamp);
                if let Some(etag) = object.e_tag() {
                    info = info.with_etag(etag);
                }
                info
            })
            .collect();

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("{bucket}/{key}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region};

    #[test]
    fn test_endpoint_override_and_path_style() {
        let sdk_config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let connection = Connection {
            endpoint: Some("http://localhost:9000".into()),
            force_path_style: true,
            ..Default::default()
        };

        let store = S3Store::new(&sdk_config, &connection);
        let config = store.inner().config();
        assert_eq!(config.region().map(|r| r.as_ref()), Some("us-east-1"));
    }
}
