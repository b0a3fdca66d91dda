//! Capture backend capability.
//!
//! A backend captures one segment at a time. `start` begins a segment and
//! returns a handle; `stop` requests the close and returns immediately. Some
//! time later the backend reports through the segment's [`CaptureSink`],
//! either [`CaptureSink::segment_closed`] with the produced artifact or
//! [`CaptureSink::capture_failed`].

use crate::audio::{AudioClip, AudioSpec};
use crate::config::EncoderSettings;
use crate::error::Result;
use crate::session::event::SessionEvent;
use crate::tracker::DurationSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;

/// Backend-defined identifier for an open segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle(pub u64);

/// Parameters for one segment.
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    /// Segment index within the recording attempt
    pub index: usize,
    /// Where a file-based backend should write the segment
    pub artifact_path: PathBuf,
    /// Audio format the timeline expects
    pub spec: AudioSpec,
    /// Pass-through encoder settings
    pub settings: EncoderSettings,
}

/// Data produced by one closed segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentArtifact {
    /// Encoded file on disk
    File(PathBuf),
    /// Samples held in memory
    Buffer(AudioClip),
}

/// What a backend reported through a probe sink.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    FramesCaptured(u64),
    Closed(SegmentArtifact),
    Failed(String),
}

/// Capture capability the session controller drives.
///
/// Implementations must not call back into the controller synchronously;
/// all reports go through the [`CaptureSink`].
pub trait CaptureBackend: Send + 'static {
    /// Begin capturing a segment.
    fn start(&mut self, request: SegmentRequest, sink: CaptureSink) -> Result<CaptureHandle>;

    /// Request the segment to close. Completion is reported through its sink.
    fn stop(&mut self, handle: CaptureHandle);

    /// Whether a segment is currently capturing.
    fn is_capturing(&self) -> bool;

    /// How the controller should derive elapsed time for this backend.
    fn duration_source(&self) -> DurationSource {
        DurationSource::WallClock
    }
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn start(&mut self, request: SegmentRequest, sink: CaptureSink) -> Result<CaptureHandle> {
        (**self).start(request, sink)
    }

    fn stop(&mut self, handle: CaptureHandle) {
        (**self).stop(handle)
    }

    fn is_capturing(&self) -> bool {
        (**self).is_capturing()
    }

    fn duration_source(&self) -> DurationSource {
        (**self).duration_source()
    }
}

enum SinkTarget {
    Session {
        events: Sender<SessionEvent>,
        token: u64,
    },
    Probe(Sender<CaptureEvent>),
}

/// Reporting channel for one segment.
///
/// Closing or failing consumes the sink, so a segment reports its outcome at
/// most once. A sink dropped without reporting is treated as a capture
/// failure.
pub struct CaptureSink {
    segment: usize,
    target: SinkTarget,
    finished: bool,
}

impl CaptureSink {
    pub(crate) fn session(events: Sender<SessionEvent>, token: u64, segment: usize) -> Self {
        Self {
            segment,
            target: SinkTarget::Session { events, token },
            finished: false,
        }
    }

    /// A sink detached from any session; reports arrive on the receiver.
    ///
    /// Useful for driving a backend directly, e.g. in tests.
    pub fn probe(segment: usize) -> (Self, Receiver<CaptureEvent>) {
        let (tx, rx) = unbounded();
        (
            Self {
                segment,
                target: SinkTarget::Probe(tx),
                finished: false,
            },
            rx,
        )
    }

    /// Segment index this sink reports for.
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Report progress for the frame-derived duration source.
    pub fn frames_captured(&self, frames: u64) {
        if frames == 0 {
            return;
        }
        self.send(CaptureEvent::FramesCaptured(frames));
    }

    /// Report that capture has ceased and the artifact is complete.
    pub fn segment_closed(mut self, artifact: SegmentArtifact) {
        self.finished = true;
        self.send(CaptureEvent::Closed(artifact));
    }

    /// Report that the segment failed.
    pub fn capture_failed(mut self, message: impl Into<String>) {
        self.finished = true;
        self.send(CaptureEvent::Failed(message.into()));
    }

    fn send(&self, event: CaptureEvent) {
        match &self.target {
            SinkTarget::Session { events, token } => {
                let token = *token;
                let segment = self.segment;
                let message = match event {
                    CaptureEvent::FramesCaptured(frames) => SessionEvent::FramesCaptured {
                        token,
                        segment,
                        frames,
                    },
                    CaptureEvent::Closed(artifact) => SessionEvent::SegmentClosed {
                        token,
                        segment,
                        artifact,
                    },
                    CaptureEvent::Failed(message) => SessionEvent::CaptureFailed {
                        token,
                        segment,
                        message,
                    },
                };
                // Session already shut down; nothing left to notify
                let _ = events.send(message);
            }
            SinkTarget::Probe(tx) => {
                let _ = tx.send(event);
            }
        }
    }
}

impl Drop for CaptureSink {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.send(CaptureEvent::Failed(format!(
                "segment {} ended without being closed",
                self.segment
            )));
        }
    }
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink")
            .field("segment", &self.segment)
            .field("finished", &self.finished)
            .finish()
    }
}
