//! # Reel Core
//!
//! Session state machine for segmented audio recording.
//!
//! A recording is split into contiguous segments across pause/resume
//! cycles. Each closed segment is merged onto a single timeline and the
//! timeline is exported once, after the last segment closes.
//!
//! This crate holds the parts that do not touch audio hardware or codecs:
//! - **SessionController**: status, control operations, event ordering
//! - **DurationTracker**: elapsed time and the maximum-duration cutoff
//! - **Timeline**: gap-free concatenation of merged segments
//! - **SegmentStore**: temporary per-segment artifacts
//! - **Capabilities**: [`CaptureBackend`], [`Exporter`] and [`SessionDelegate`]
//!
//! Concrete backends live in `reel-capture` and the WAV exporter in
//! `reel-export`.

pub mod audio;
pub mod capture;
pub mod config;
pub mod delegate;
pub mod error;
pub mod export;
pub mod segment_store;
pub mod session;
pub mod status;
pub mod timeline;
pub mod tracker;

pub use audio::{AudioClip, AudioSpec};
pub use capture::{
    CaptureBackend, CaptureEvent, CaptureHandle, CaptureSink, SegmentArtifact, SegmentRequest,
};
pub use config::{keys, EncoderSettings, RecorderConfig, RecorderConfigBuilder, SettingValue};
pub use delegate::{NoopDelegate, Progress, SessionDelegate};
pub use error::{Error, MergeError, Result};
pub use export::{ExportCancel, ExportCompletion, ExportJob, Exporter};
pub use segment_store::SegmentStore;
pub use session::{SessionController, StopCompletion};
pub use status::Status;
pub use timeline::{Timeline, TimelineEntry};
pub use tracker::{DurationSource, DurationTracker, TickReport};
