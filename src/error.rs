//! Centralized error type for the reel umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] reel_core::Error),

    #[cfg(feature = "capture")]
    #[error("Capture: {0}")]
    Capture(#[from] reel_capture::CaptureError),

    #[cfg(feature = "export")]
    #[error("Export: {0}")]
    Export(#[from] reel_export::ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
