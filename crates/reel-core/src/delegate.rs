//! Session notifications.

use crate::error::Error;
use crate::status::Status;
use std::time::Duration;

/// Elapsed time and status reported on each tracker update and transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub elapsed: Duration,
    pub status: Status,
}

/// Receives session outcomes.
///
/// All methods are called from the session worker thread, one at a time,
/// and never while the session lock is held. Calling back into the
/// controller from a delegate method is allowed.
pub trait SessionDelegate: Send + Sync + 'static {
    /// The final export finished successfully.
    fn on_finished(&self) {}

    /// An asynchronous operation failed.
    fn on_error(&self, _error: &Error) {}

    fn on_progress(&self, _progress: Progress) {}
}

/// Delegate that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelegate;

impl SessionDelegate for NoopDelegate {}
