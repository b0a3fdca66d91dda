//! Error types.

use crate::status::Status;
use thiserror::Error;

/// Error type.
///
/// Every variant carries plain data so the same error can be returned to
/// the caller and handed to the delegate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required setting is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The capture backend could not begin a segment.
    #[error("Capture backend failed to start: {0}")]
    BackendStart(String),

    /// The capture backend failed while a segment was open or closing.
    #[error("Capture error: {0}")]
    Capture(String),

    /// A closed segment could not be merged into the timeline.
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// The final transcode failed.
    #[error("Export error: {0}")]
    Export(String),

    /// Operation is not allowed in the current status.
    #[error("Cannot {operation} while {status:?}")]
    InvalidTransition {
        /// Rejected operation.
        operation: &'static str,
        /// Status observed when the operation was rejected.
        status: Status,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

/// Reasons a segment artifact could not be merged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// The artifact could not be opened or decoded.
    #[error("segment {segment} is unreadable: {reason}")]
    Unreadable {
        /// Segment index.
        segment: usize,
        /// Underlying reason.
        reason: String,
    },

    /// The artifact decoded but carries no audio channels.
    #[error("segment {segment} has no audio track")]
    NoAudioTrack {
        /// Segment index.
        segment: usize,
    },

    /// The artifact's format differs from the timeline track.
    #[error("segment {segment} format mismatch: expected {expected}, found {found}")]
    FormatMismatch {
        /// Segment index.
        segment: usize,
        /// Track format.
        expected: String,
        /// Segment format.
        found: String,
    },

    /// The insertion range is not representable on the track.
    #[error("segment {segment} has an invalid insertion range: {reason}")]
    InvalidRange {
        /// Segment index.
        segment: usize,
        /// Underlying reason.
        reason: String,
    },
}

// External error types are flattened to strings at the API boundary so the
// error stays cloneable for delegate delivery.

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            operation: "record",
            status: Status::Finishing,
        };
        assert_eq!(err.to_string(), "Cannot record while Finishing");
    }

    #[test]
    fn test_merge_error_wraps() {
        let err: Error = MergeError::NoAudioTrack { segment: 2 }.into();
        assert!(matches!(err, Error::Merge(MergeError::NoAudioTrack { segment: 2 })));
        assert_eq!(err.to_string(), "Merge error: segment 2 has no audio track");
    }

    #[test]
    fn test_io_error_flattened() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err, Error::Io("gone".to_string()));
    }
}
