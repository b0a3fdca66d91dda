//! # Reel Capture
//!
//! Capture backends for reel recording sessions.
//!
//! Two variants of the [`CaptureBackend`](reel_core::CaptureBackend)
//! capability:
//! - [`FileCaptureBackend`]: one WAV file per segment, written by a capture
//!   thread pulling from a [`SampleSource`]
//! - [`BufferCaptureBackend`]: samples pushed by a host audio callback,
//!   delivered as in-memory clips with frame-derived elapsed time
//!
//! ## Feature Flags
//!
//! - `device-input`: stream the default CPAL input device into a
//!   [`BufferInput`]

pub mod buffer;
pub mod error;
pub mod file;
pub mod source;

#[cfg(feature = "device-input")]
pub mod device;

pub use buffer::{BufferCaptureBackend, BufferInput};
pub use error::{CaptureError, Result};
pub use file::{FileCaptureBackend, DEFAULT_CAPTURE_PERIOD};
pub use source::{SampleSource, SilenceSource, ToneSource};

#[cfg(feature = "device-input")]
pub use device::{default_input_spec, DeviceInput};
