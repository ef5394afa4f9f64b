//! Error types for s3cli-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for s3cli-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for s3cli-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// Alias already exists
    #[error("Alias already exists: {0}")]
    AliasExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Feature not supported by backend
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// The transfer source could not be fully enumerated; nothing was transferred
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    /// A single object transfer failed
    #[error("Transfer {from} -> {to} failed: {cause}")]
    Transfer {
        from: String,
        to: String,
        cause: Box<Error>,
    },

    /// The operation was cancelled or its deadline expired
    #[error("Operation cancelled")]
    Cancelled,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an error with the source and destination of the transfer it belongs to
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, cause: Error) -> Self {
        Error::Transfer {
            from: from.into(),
            to: to.into(),
            cause: Box::new(cause),
        }
    }

    /// Innermost error, looking through transfer wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Transfer { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Error::Cancelled)
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                        // UsageError
            Error::Config(_) => 2,                             // UsageError
            Error::Network(_) => 3,                            // NetworkError
            Error::Auth(_) => 4,                               // AuthError
            Error::NotFound(_) | Error::AliasNotFound(_) => 5, // NotFound
            Error::Conflict(_) | Error::AliasExists(_) => 6,   // Conflict
            Error::UnsupportedFeature(_) => 7,                 // UnsupportedFeature
            Error::Cancelled => 130,                           // Interrupted
            Error::Transfer { cause, .. } => cause.exit_code(),
            _ => 1, // GeneralError
        }
    }
}
