//! SDK error mapping
//!
//! Translates AWS SDK failures into s3sync-core errors so that exit codes
//! distinguish missing resources and credential problems from transport
//! failures.

use aws_sdk_s3::error::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use s3sync_core::Error;

const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "NoSuchKey",
    "NoSuchBucket",
    "NoSuchDistribution",
];

const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidClientTokenId",
    "InvalidToken",
];

/// Map an SDK error about `subject` into a core error
pub(crate) fn map_sdk_error<E, R>(err: SdkError<E, R>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    classify(code.as_deref(), DisplayErrorContext(&err).to_string(), subject)
}

fn classify(code: Option<&str>, message: String, subject: &str) -> Error {
    match code {
        Some(code) if NOT_FOUND_CODES.contains(&code) => Error::NotFound(subject.to_string()),
        Some(code) if AUTH_CODES.contains(&code) => Error::Auth(message),
        _ => Error::Network(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes() {
        let err = classify(Some("NoSuchKey"), "gone".into(), "bucket/a.txt");
        assert!(matches!(err, Error::NotFound(ref s) if s == "bucket/a.txt"));
        assert!(classify(Some("NoSuchDistribution"), String::new(), "E1").is_not_found());
    }

    #[test]
    fn test_auth_codes() {
        let err = classify(Some("AccessDenied"), "denied".into(), "bucket");
        assert!(matches!(err, Error::Auth(ref m) if m == "denied"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_everything_else_is_network() {
        assert!(matches!(
            classify(Some("SlowDown"), "busy".into(), "bucket"),
            Error::Network(_)
        ));
        assert!(matches!(
            classify(None, "dispatch failure".into(), "bucket"),
            Error::Network(_)
        ));
    }
}
