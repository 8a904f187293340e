//! Error types for entry indexing operations.

use common::LogError;

/// Error type for entry indexing operations.
///
/// # Error Categories
///
/// - [`InvalidArgument`](Error::InvalidArgument): malformed input to a public
///   operation, rejected before any state mutation.
/// - [`IllegalState`](Error::IllegalState): a contract violation by the
///   caller, such as seeding the index assigner after appends began.
/// - [`Recovery`](Error::Recovery): persisted checkpoint state is present but
///   corrupt; fatal to opening the log, never silently defaulted.
/// - [`Encoding`](Error::Encoding): serialization failures for checkpoint
///   values. Per-entry header decode problems are not errors; decoding
///   returns `None` and scans continue.
/// - [`Log`](Error::Log): failures from the underlying segmented log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input to a public operation (e.g. batch size of zero).
    InvalidArgument(String),

    /// Contract violation by the caller; fatal to the calling operation.
    IllegalState(String),

    /// Persisted recovery state is structurally corrupt.
    Recovery(String),

    /// Encoding or decoding failure for persisted values.
    Encoding(String),

    /// Failure from the underlying segmented log.
    Log(LogError),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Log(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::IllegalState(msg) => write!(f, "Illegal state: {}", msg),
            Error::Recovery(msg) => write!(f, "Recovery failed: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::Log(err) => write!(f, "Log error: {}", err),
        }
    }
}

impl From<LogError> for Error {
    fn from(err: LogError) -> Self {
        Error::Log(err)
    }
}

/// Result type alias for entry indexing operations.
pub type Result<T> = std::result::Result<T, Error>;
