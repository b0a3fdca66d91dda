//! # Reel - Segmented Audio Recording
//!
//! Pause/resume recording sessions that produce one continuous file.
//!
//! ## Architecture
//!
//! Reel is an umbrella crate that coordinates:
//! - **reel-core** - Session state machine, duration tracker, timeline merge, segment store
//! - **reel-capture** - Capture backends (file-per-segment, pushed live buffer, CPAL input)
//! - **reel-export** - Final WAV export
//!
//! Every pause closes the current segment and every resume opens the next
//! one. Closed segments are appended to a single timeline in index order
//! and the timeline is exported once, after the last segment is merged.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reel::prelude::*;
//!
//! let (recorder, input) = RecorderBuilder::new("take.wav")
//!     .sample_rate(48000)
//!     .build_live()?;
//!
//! recorder.record()?;
//! input.push(&samples_from_callback);
//! recorder.pause();
//! recorder.resume();
//! recorder.stop_with(|| println!("saved"));
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Session core, capture backends and WAV export
//! - `capture` - File and live-buffer capture backends
//! - `export` - WAV exporter
//! - `device-input` - Default CPAL input device feeding the live buffer

/// Re-export of reel-core for direct access
pub use reel_core as core;

pub use reel_core::{
    AudioClip, AudioSpec, CaptureBackend, CaptureEvent, CaptureHandle, CaptureSink,
    DurationSource, EncoderSettings, ExportCompletion, ExportJob, Exporter, MergeError,
    NoopDelegate, Progress, RecorderConfig, SegmentArtifact, SegmentRequest, SegmentStore,
    SessionController, SessionDelegate, SettingValue, Status, StopCompletion, Timeline,
    TimelineEntry,
};

/// Encoder setting keys
pub use reel_core::keys;

mod builder;
mod error;

pub use builder::RecorderBuilder;
pub use error::{Error, Result};

#[cfg(all(feature = "capture", feature = "export"))]
pub use builder::{FileRecorder, LiveRecorder};

#[cfg(feature = "capture")]
pub mod capture {
    pub use reel_capture::*;
}

#[cfg(feature = "export")]
pub mod export {
    pub use reel_export::*;
}

/// Common imports for building and driving a session.
pub mod prelude {
    pub use crate::{
        AudioSpec, EncoderSettings, Progress, RecorderBuilder, SessionController,
        SessionDelegate, Status,
    };
    pub use std::time::Duration;

    #[cfg(feature = "capture")]
    pub use reel_capture::{BufferInput, SilenceSource, ToneSource};

    #[cfg(feature = "export")]
    pub use reel_export::{BitDepth, WavExporter};
}
