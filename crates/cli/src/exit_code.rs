//! Process exit codes
//!
//! Scripts branch on these values, so existing codes never change meaning.
//! New outcomes get new numbers.

use s3cli_core::Error;

/// Exit status of an s3cli invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error, including local I/O failures
    GeneralError = 1,

    /// Invalid arguments, malformed path or bad configuration
    UsageError = 2,

    /// Retryable network error: timeout, connection reset, 503, etc.
    NetworkError = 3,

    /// Authentication or permission failure
    AuthError = 4,

    /// Alias, bucket, object or local source does not exist
    NotFound = 5,

    /// Alias already exists or precondition failure
    Conflict = 6,

    /// Backend does not support this feature
    UnsupportedFeature = 7,

    /// Bulk transfer finished but at least one file failed
    PartialFailure = 8,

    /// Ctrl+C or the operation deadline fired
    Interrupted = 130,
}

impl ExitCode {
    /// Every code, in numeric order
    pub const ALL: [ExitCode; 10] = [
        Self::Success,
        Self::GeneralError,
        Self::UsageError,
        Self::NetworkError,
        Self::AuthError,
        Self::NotFound,
        Self::Conflict,
        Self::UnsupportedFeature,
        Self::PartialFailure,
        Self::Interrupted,
    ];

    /// Value passed to `std::process::exit`
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Success => "Operation completed successfully",
            Self::GeneralError => "General error",
            Self::UsageError => "Invalid arguments or path format",
            Self::NetworkError => "Network error (retryable)",
            Self::AuthError => "Authentication or permission failure",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflict or precondition failure",
            Self::UnsupportedFeature => "Feature not supported by backend",
            Self::PartialFailure => "Some transfers failed",
            Self::Interrupted => "Operation interrupted",
        }
    }
}

impl TryFrom<i32> for ExitCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, i32> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_i32() == code)
            .ok_or(code)
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        Self::try_from(err.exit_code()).unwrap_or(Self::GeneralError)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}
