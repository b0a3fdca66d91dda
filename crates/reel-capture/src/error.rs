//! Error types for reel-capture.

use thiserror::Error;

/// Errors raised while starting or running a capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Format mismatch: source produces {produced}, segment expects {requested}")]
    FormatMismatch { produced: String, requested: String },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture router is not running")]
    RouterStopped,

    #[cfg(feature = "device-input")]
    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[cfg(feature = "device-input")]
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[cfg(feature = "device-input")]
    #[error("Input device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "device-input")]
    #[error("Failed to build input stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "device-input")]
    #[error("Failed to play input stream")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, CaptureError>;

impl From<CaptureError> for reel_core::Error {
    fn from(e: CaptureError) -> Self {
        reel_core::Error::BackendStart(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_backend_start() {
        let err = CaptureError::FormatMismatch {
            produced: "48000 Hz / 1 ch".into(),
            requested: "44100 Hz / 1 ch".into(),
        };
        let core: reel_core::Error = err.into();
        assert!(matches!(core, reel_core::Error::BackendStart(ref m) if m.contains("48000 Hz")));
    }
}
