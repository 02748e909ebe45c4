//! Shared SDK configuration
//!
//! Builds one `SdkConfig` from the connection settings. Both the S3 and the
//! CloudFront clients are derived from it.

use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use s3sync_core::Connection;

/// Load the SDK configuration for `connection`
///
/// Unset fields fall back to the SDK default chain. The endpoint override
/// is not applied here since it only concerns S3.
pub async fn load_sdk_config(connection: &Connection) -> SdkConfig {
    let retry = connection.retry_config();
    let timeout = connection.timeout_config();

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::standard()
                .with_max_attempts(retry.max_attempts)
                .with_initial_backoff(Duration::from_millis(retry.initial_backoff_ms)),
        )
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(Duration::from_millis(timeout.connect_ms))
                .read_timeout(Duration::from_millis(timeout.read_ms))
                .build(),
        );

    if let Some(region) = &connection.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(profile) = &connection.profile {
        loader = loader.profile_name(profile);
    }

    if let Some((access_key, secret_key)) = connection.static_credentials() {
        tracing::debug!("Using static credentials from configuration");
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "s3sync-static-credentials",
        ));
    }

    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_region_and_credentials_applied() {
        let connection = Connection {
            region: Some("eu-west-1".into()),
            access_key: Some("AKIDEXAMPLE".into()),
            secret_key: Some("secret".into()),
            ..Default::default()
        };

        let config = load_sdk_config(&connection).await;
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-1"));
        assert!(config.credentials_provider().is_some());
        assert_eq!(
            config.retry_config().map(|r| r.max_attempts()),
            Some(3)
        );
    }
}
