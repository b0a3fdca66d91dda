//! Messages on the session worker queue.

use crate::capture::SegmentArtifact;
use crate::delegate::Progress;
use crate::error::{Error, Result};

/// Caller-supplied callback run once the stop sequence resolves.
pub type StopCompletion = Box<dyn FnOnce() + Send + 'static>;

/// Everything that reaches the session from a background context.
///
/// Capture events carry the token of the segment that produced them and
/// export events carry the recording attempt; the worker drops whatever no
/// longer matches the current state.
pub(crate) enum SessionEvent {
    SegmentClosed {
        token: u64,
        segment: usize,
        artifact: SegmentArtifact,
    },
    CaptureFailed {
        token: u64,
        segment: usize,
        message: String,
    },
    FramesCaptured {
        token: u64,
        segment: usize,
        frames: u64,
    },
    Tick {
        generation: u64,
    },
    ExportFinished {
        attempt: u64,
        result: Result<()>,
    },
    /// Notifications produced by a control operation on a caller thread
    Notify(Vec<Notification>),
    Shutdown,
}

/// Work to run on the worker thread after the session lock is released.
pub(crate) enum Notification {
    Finished,
    Error(Error),
    Progress(Progress),
    Completion(StopCompletion),
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::Finished => f.write_str("Finished"),
            Notification::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Notification::Progress(p) => f.debug_tuple("Progress").field(p).finish(),
            Notification::Completion(_) => f.write_str("Completion"),
        }
    }
}
