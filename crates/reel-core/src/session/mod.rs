//! Recording session controller.
//!
//! [`SessionController`] is the state machine tying the pieces together. It
//! is written once and parameterized over a [`CaptureBackend`] and an
//! [`Exporter`].
//!
//! ```text
//!            record()               pause()
//!   Idle ─────────────▶ Recording ─────────▶ Paused
//!    ▲                     │    ◀─────────     │
//!    │                     │      resume()     │
//!    │                     │ stop()            │ stop()
//!    │                     ▼                   │
//!    └── export done ── Finishing ◀────────────┘
//! ```
//!
//! Control operations run on the caller's thread under the session lock.
//! Backend acknowledgments, tracker ticks and export completions are queued
//! to a single worker thread, which also delivers every delegate callback.

pub(crate) mod event;
mod state;
mod worker;


pub use event::StopCompletion;

use crate::audio::AudioSpec;
use crate::capture::CaptureBackend;
use crate::config::{EncoderSettings, RecorderConfig};
use crate::delegate::SessionDelegate;
use crate::error::Result;
use crate::export::Exporter;
use crate::segment_store::remove_file_if_exists;
use crate::status::Status;
use crate::timeline::Timeline;
use crossbeam_channel::{unbounded, Sender};
use event::SessionEvent;
use parking_lot::Mutex;
use state::SessionState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

/// State shared between the controller and its worker.
pub(crate) struct Core<B, E> {
    state: Mutex<SessionState<B, E>>,
    delegate: Arc<dyn SessionDelegate>,
}

/// Segmented recording session.
///
/// # Example
/// ```ignore
/// let config = RecorderConfig::builder("take.wav")
///     .settings(EncoderSettings::with_sample_rate(48000))
///     .build();
/// let session = SessionController::new(config, backend, exporter, Arc::new(NoopDelegate))?;
///
/// session.record()?;
/// session.pause();
/// session.resume();
/// session.stop();
/// ```
pub struct SessionController<B: CaptureBackend, E: Exporter> {
    core: Arc<Core<B, E>>,
    config: RecorderConfig,
    spec: AudioSpec,
    events: Sender<SessionEvent>,
    worker: Option<JoinHandle<()>>,
}

impl<B: CaptureBackend, E: Exporter> SessionController<B, E> {
    /// Create a session.
    ///
    /// Fails with a configuration error if the settings carry no sample
    /// rate. Any file already at the output path is deleted.
    pub fn new(
        config: RecorderConfig,
        backend: B,
        exporter: E,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Self> {
        let spec = config.validate()?;
        remove_file_if_exists(config.output_path())?;

        let (events, rx) = unbounded();
        let state = SessionState::new(config.clone(), spec, backend, exporter, events.clone());
        let core = Arc::new(Core {
            state: Mutex::new(state),
            delegate,
        });
        let worker = worker::spawn(Arc::clone(&core), rx);

        info!(
            "Session created: {} -> {}",
            spec,
            config.output_path().display()
        );
        Ok(Self {
            core,
            config,
            spec,
            events,
            worker: Some(worker),
        })
    }

    /// Start a new recording with no duration limit.
    pub fn record(&self) -> Result<()> {
        self.record_for(Duration::ZERO)
    }

    /// Start a new recording that stops itself once `max` has been captured.
    ///
    /// A zero `max` means unlimited. Rejected while recording or finishing.
    /// Starting from `Paused` discards the paused attempt.
    pub fn record_for(&self, max: Duration) -> Result<()> {
        self.with_state(|state| state.record(max))
    }

    /// Close the current segment and suspend capture.
    ///
    /// Returns `false` when idle or finishing. Pausing while paused is a no-op.
    pub fn pause(&self) -> bool {
        self.with_state(SessionState::pause)
    }

    /// Open the next segment. Only accepted while paused.
    pub fn resume(&self) -> bool {
        self.with_state(SessionState::resume)
    }

    /// Close the current segment, merge it and export the timeline.
    ///
    /// Returns `false` if a stop is already in progress.
    pub fn stop(&self) -> bool {
        self.with_state(|state| state.stop(None))
    }

    /// Like [`stop`](Self::stop), calling `completion` once the stop resolves.
    ///
    /// The completion runs on the session worker after the delegate has been
    /// told the outcome, whether the export succeeded or the attempt failed.
    /// It is dropped without running if the stop is rejected or the session
    /// is reset first.
    pub fn stop_with<F>(&self, completion: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.with_state(|state| state.stop(Some(Box::new(completion))))
    }

    /// Delete the output file and every temporary segment artifact.
    ///
    /// Rejected while finishing.
    pub fn delete_record(&self) -> Result<()> {
        self.with_state(SessionState::delete_record)
    }

    /// Abandon the current attempt without exporting and return to `Idle`.
    pub fn reset_and_stop(&self) {
        self.with_state(SessionState::reset_and_stop)
    }

    pub fn status(&self) -> Status {
        self.core.state.lock().status()
    }

    /// Time captured in the current recording attempt.
    pub fn elapsed(&self) -> Duration {
        self.core.state.lock().elapsed()
    }

    /// Index of the most recently opened segment.
    pub fn segment_index(&self) -> usize {
        self.core.state.lock().segment_index()
    }

    /// Duration of the audio merged so far in the current attempt.
    pub fn merged_duration(&self) -> Duration {
        self.core.state.lock().timeline().duration()
    }

    /// Snapshot of the timeline merged so far. Shares its samples.
    pub fn timeline_snapshot(&self) -> Timeline {
        self.core.state.lock().timeline().clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.core.state.lock().is_capturing()
    }

    pub fn output_path(&self) -> &Path {
        self.config.output_path()
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.config.settings
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Directory holding the temporary segment artifacts.
    pub fn segment_dir(&self) -> PathBuf {
        self.core.state.lock().segment_dir().to_path_buf()
    }

    /// Run a control operation under the session lock.
    ///
    /// Its notifications are queued before the lock is released, so they
    /// reach the delegate ahead of anything the worker produces afterwards.
    fn with_state<T>(&self, f: impl FnOnce(&mut SessionState<B, E>) -> T) -> T {
        let mut state = self.core.state.lock();
        let value = f(&mut *state);
        let notifications = state.take_notifications();
        if !notifications.is_empty() {
            let _ = self.events.send(SessionEvent::Notify(notifications));
        }
        value
    }
}

impl<B: CaptureBackend, E: Exporter> Drop for SessionController<B, E> {
    fn drop(&mut self) {
        self.reset_and_stop();
        let _ = self.events.send(SessionEvent::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl<B: CaptureBackend, E: Exporter> std::fmt::Debug for SessionController<B, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("status", &self.status())
            .field("output_path", &self.config.output_path)
            .field("spec", &self.spec)
            .finish()
    }
}
