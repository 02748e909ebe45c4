//! Error types for s3sync-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for s3sync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for s3sync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Path cannot be turned into an object key
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Filter pattern failed to compile
    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication or permission error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Work was stopped through a cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::InvalidPattern(_) => 2, // UsageError
            Error::Config(_) | Error::TomlParse(_) => 2,           // UsageError
            Error::Network(_) => 3,                                // NetworkError
            Error::Auth(_) => 4,                                   // AuthError
            Error::NotFound(_) => 5,                               // NotFound
            Error::Cancelled => 130,                               // Interrupted
            _ => 1,                                                // GeneralError
        }
    }

    /// Whether this error is the expected "object does not exist" answer
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}
