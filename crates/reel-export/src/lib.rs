//! # Reel Export
//!
//! Final file export for reel recording sessions.
//!
//! [`WavExporter`] implements the session's
//! [`Exporter`](reel_core::Exporter) capability: the merged timeline is
//! encoded once, after the last segment has been merged.
//!
//! ## Feature Flags
//!
//! - `wav` (default): WAV encoding via hound

pub mod error;
pub mod format;
pub mod options;

#[cfg(feature = "wav")]
pub mod exporter;

pub use error::{ExportError, Result};
pub use options::BitDepth;

#[cfg(feature = "wav")]
pub use exporter::WavExporter;
#[cfg(feature = "wav")]
pub use format::wav::{encode_wav_file, encode_wav_memory, WavConfig};
