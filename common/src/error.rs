//! Error types for the segmented log collaborators.

use crate::log::SegmentId;

/// Error type for segmented log operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Storage-related failures from the underlying backend.
    Storage(String),

    /// A segment id that does not exist in the log.
    SegmentNotFound(SegmentId),

    /// Unexpected internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for LogError {}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Storage(msg) => write!(f, "Storage error: {}", msg),
            LogError::SegmentNotFound(id) => write!(f, "Segment {} not found", id),
            LogError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Result type alias for segmented log operations.
pub type LogResult<T> = std::result::Result<T, LogError>;
