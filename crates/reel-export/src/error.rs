//! Error types for reel-export

use std::io;
use thiserror::Error;

/// Export error type
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid encoder settings
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Invalid audio data
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(feature = "wav")]
impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::Io(io),
            other => ExportError::InvalidData(other.to_string()),
        }
    }
}

impl From<ExportError> for reel_core::Error {
    fn from(e: ExportError) -> Self {
        reel_core::Error::Export(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_error_into_core() {
        let err: reel_core::Error = ExportError::InvalidOptions("bit depth 12".into()).into();
        assert_eq!(
            err,
            reel_core::Error::Export("Invalid options: bit depth 12".to_string())
        );
    }
}
