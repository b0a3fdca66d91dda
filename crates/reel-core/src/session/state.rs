//! Session state and transitions.
//!
//! Every method here runs with the session lock held, either from a control
//! operation on a caller thread or from the worker handling a queued event.
//! Nothing in this file calls the delegate; outcomes are queued as
//! [`Notification`]s and dispatched after the lock is released.

use super::event::{Notification, SessionEvent, StopCompletion};
use crate::audio::AudioSpec;
use crate::capture::{CaptureBackend, CaptureHandle, CaptureSink, SegmentArtifact, SegmentRequest};
use crate::config::RecorderConfig;
use crate::delegate::Progress;
use crate::error::{Error, Result};
use crate::export::{ExportCancel, ExportCompletion, ExportJob, Exporter};
use crate::segment_store::{remove_file_if_exists, SegmentStore};
use crate::status::Status;
use crate::timeline::{merge_segment, Timeline};
use crate::tracker::{DurationTracker, TickReport};
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Segment currently capturing.
struct OpenSegment {
    index: usize,
    token: u64,
    handle: CaptureHandle,
    path: PathBuf,
}

/// Segment whose close was requested, waiting to be merged.
struct ClosingSegment {
    index: usize,
    token: u64,
    path: PathBuf,
    /// Set once the backend acknowledges the close
    artifact: Option<SegmentArtifact>,
}

/// What to do once every closing segment has merged.
///
/// A single slot: each pause or stop overwrites it.
enum PendingFinish {
    Merge,
    Export(Option<StopCompletion>),
}

pub(crate) struct SessionState<B, E> {
    status: Status,
    backend: B,
    exporter: E,
    config: RecorderConfig,
    spec: AudioSpec,
    store: SegmentStore,
    tracker: DurationTracker,
    timeline: Timeline,
    segment_index: usize,
    /// Bumped whenever the current recording attempt is abandoned
    attempt: u64,
    next_token: u64,
    active: Option<OpenSegment>,
    closing: VecDeque<ClosingSegment>,
    pending: Option<PendingFinish>,
    /// Stop completion held while the export runs
    completion: Option<StopCompletion>,
    /// Cancels the export in flight, if any
    export_cancel: Option<ExportCancel>,
    /// Set once this attempt's export resolved; the timeline is then kept
    /// for inspection only and is never exported again
    attempt_done: bool,
    events: Sender<SessionEvent>,
    notifications: Vec<Notification>,
}

impl<B: CaptureBackend, E: Exporter> SessionState<B, E> {
    pub(crate) fn new(
        config: RecorderConfig,
        spec: AudioSpec,
        backend: B,
        exporter: E,
        events: Sender<SessionEvent>,
    ) -> Self {
        let tracker = DurationTracker::new(backend.duration_source(), config.tick_interval);
        let store = SegmentStore::new(config.segment_dir());
        Self {
            status: Status::Idle,
            backend,
            exporter,
            spec,
            store,
            tracker,
            timeline: Timeline::new(spec),
            segment_index: 0,
            attempt: 0,
            next_token: 0,
            active: None,
            closing: VecDeque::new(),
            pending: None,
            completion: None,
            export_cancel: None,
            attempt_done: false,
            events,
            notifications: Vec::new(),
            config,
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.tracker.elapsed()
    }

    pub(crate) fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub(crate) fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub(crate) fn is_capturing(&self) -> bool {
        self.backend.is_capturing()
    }

    pub(crate) fn segment_dir(&self) -> &Path {
        self.store.dir()
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ---- control operations ----

    pub(crate) fn record(&mut self, max: Duration) -> Result<()> {
        if matches!(self.status, Status::Recording | Status::Finishing) {
            debug!("record rejected while {:?}", self.status);
            return Err(Error::InvalidTransition {
                operation: "record",
                status: self.status,
            });
        }

        self.discard_attempt();
        if let Err(e) = remove_file_if_exists(&self.config.output_path) {
            warn!(
                "Failed to remove previous output {}: {}",
                self.config.output_path.display(),
                e
            );
        }
        self.tracker.reset(max);

        if let Err(e) = self.open_segment(0) {
            error!("Failed to start recording: {}", e);
            self.status = Status::Idle;
            self.notifications.push(Notification::Error(e.clone()));
            return Err(e);
        }

        self.status = Status::Recording;
        if max.is_zero() {
            info!("Recording started");
        } else {
            info!("Recording started (limit {:?})", max);
        }
        self.notify_progress();
        Ok(())
    }

    pub(crate) fn pause(&mut self) -> bool {
        match self.status {
            Status::Recording => {
                self.tracker.stop();
                self.close_active();
                self.pending = Some(PendingFinish::Merge);
                self.status = Status::Paused;
                info!("Recording paused at {:?}", self.tracker.elapsed());
                self.notify_progress();
                true
            }
            Status::Paused => true,
            status => {
                debug!("pause ignored while {:?}", status);
                false
            }
        }
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.status != Status::Paused {
            debug!("resume ignored while {:?}", self.status);
            return false;
        }

        let next = self.segment_index + 1;
        match self.open_segment(next) {
            Ok(()) => {
                self.segment_index = next;
                self.status = Status::Recording;
                info!("Recording resumed (segment {})", next);
                self.notify_progress();
                true
            }
            Err(e) => {
                error!("Failed to resume recording: {}", e);
                self.notifications.push(Notification::Error(e));
                false
            }
        }
    }

    pub(crate) fn stop(&mut self, completion: Option<StopCompletion>) -> bool {
        self.tracker.stop();
        if self.status == Status::Finishing {
            debug!("stop ignored while Finishing");
            return false;
        }

        self.close_active();
        self.status = Status::Finishing;
        info!("Stopping after {:?}", self.tracker.elapsed());
        self.pending = Some(PendingFinish::Export(completion));
        self.notify_progress();
        self.try_finish();
        true
    }

    pub(crate) fn delete_record(&mut self) -> Result<()> {
        if self.status == Status::Finishing {
            debug!("delete rejected while Finishing");
            return Err(Error::InvalidTransition {
                operation: "delete record",
                status: self.status,
            });
        }
        remove_file_if_exists(&self.config.output_path)?;
        self.store.purge()?;
        if self.status == Status::Idle {
            self.timeline = Timeline::new(self.spec);
        }
        info!("Deleted recording {}", self.config.output_path.display());
        Ok(())
    }

    pub(crate) fn reset_and_stop(&mut self) {
        let previous = self.status;
        self.discard_attempt();
        self.completion = None;
        self.status = Status::Idle;
        if previous != Status::Idle {
            info!("Session reset from {:?}", previous);
            self.notify_progress();
        }
    }

    // ---- queued events ----

    pub(crate) fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SegmentClosed {
                token,
                segment,
                artifact,
            } => self.on_segment_closed(token, segment, artifact),
            SessionEvent::CaptureFailed {
                token,
                segment,
                message,
            } => self.on_capture_failed(token, segment, message),
            SessionEvent::FramesCaptured { token, frames, .. } => {
                // Frames of a closing segment were captured before its close
                if self.is_active(token) || self.is_closing(token) {
                    let report = self.tracker.advance(self.spec.frames_to_duration(frames));
                    self.on_report(report);
                }
            }
            SessionEvent::Tick { generation } => {
                let report = self.tracker.on_tick(generation);
                self.on_report(report);
            }
            SessionEvent::ExportFinished { attempt, result } => {
                self.on_export_finished(attempt, result)
            }
            SessionEvent::Notify(notifications) => self.notifications.extend(notifications),
            SessionEvent::Shutdown => {}
        }
    }

    fn on_segment_closed(&mut self, token: u64, segment: usize, artifact: SegmentArtifact) {
        if let Some(entry) = self.closing.iter_mut().find(|c| c.token == token) {
            debug!("Segment {} closed", segment);
            entry.artifact = Some(artifact);
            self.drain_closed();
            return;
        }

        if self.is_active(token) {
            // Backend ended the segment on its own; treat it as a pause
            warn!("Segment {} closed without a stop request", segment);
            if let Some(open) = self.active.take() {
                self.tracker.stop();
                self.closing.push_back(ClosingSegment {
                    index: open.index,
                    token: open.token,
                    path: open.path,
                    artifact: Some(artifact),
                });
                self.pending = Some(PendingFinish::Merge);
                self.status = Status::Paused;
                self.notify_progress();
                self.drain_closed();
            }
            return;
        }

        warn!("Discarding unexpected close of segment {}", segment);
        self.discard_artifact(artifact);
    }

    fn on_capture_failed(&mut self, token: u64, segment: usize, message: String) {
        let current = self.is_active(token) || self.is_closing(token);
        if !current {
            debug!("Ignoring failure of stale segment {}: {}", segment, message);
            return;
        }
        self.fail(Error::Capture(format!("segment {}: {}", segment, message)));
    }

    fn on_report(&mut self, report: Option<TickReport>) {
        let Some(report) = report else {
            return;
        };
        self.notifications.push(Notification::Progress(Progress {
            elapsed: report.elapsed,
            status: self.status,
        }));
        if report.cutoff {
            info!("Maximum duration reached after {:?}", report.elapsed);
            self.stop(None);
        }
    }

    fn on_export_finished(&mut self, attempt: u64, result: Result<()>) {
        if attempt != self.attempt || self.status != Status::Finishing {
            debug!("Ignoring stale export completion");
            return;
        }

        self.status = Status::Idle;
        self.export_cancel = None;
        self.attempt_done = true;
        if let Err(e) = self.store.purge() {
            warn!("Failed to purge segment directory: {}", e);
        }
        match result {
            Ok(()) => {
                info!("Export finished: {}", self.config.output_path.display());
                self.notifications.push(Notification::Finished);
            }
            Err(e) => {
                error!("Export failed: {}", e);
                let e = match e {
                    Error::Export(_) => e,
                    other => Error::Export(other.to_string()),
                };
                self.notifications.push(Notification::Error(e));
            }
        }
        if let Some(completion) = self.completion.take() {
            self.notifications.push(Notification::Completion(completion));
        }
    }

    // ---- steps ----

    fn open_segment(&mut self, index: usize) -> Result<()> {
        let path = self.store.segment_path(index)?;
        let token = self.next_token;
        self.next_token += 1;

        let sink = CaptureSink::session(self.events.clone(), token, index);
        let request = SegmentRequest {
            index,
            artifact_path: path.clone(),
            spec: self.spec,
            settings: self.config.settings.clone(),
        };
        let handle = self.backend.start(request, sink).map_err(|e| match e {
            Error::BackendStart(_) => e,
            other => Error::BackendStart(other.to_string()),
        })?;
        debug!("Opened segment {} ({:?})", index, handle);

        self.active = Some(OpenSegment {
            index,
            token,
            handle,
            path,
        });
        let events = self.events.clone();
        self.tracker.start(move |generation| {
            let _ = events.send(SessionEvent::Tick { generation });
        });
        Ok(())
    }

    fn close_active(&mut self) {
        if let Some(open) = self.active.take() {
            self.backend.stop(open.handle);
            debug!("Closing segment {}", open.index);
            self.closing.push_back(ClosingSegment {
                index: open.index,
                token: open.token,
                path: open.path,
                artifact: None,
            });
        }
    }

    /// Merge acknowledged segments in index order, then run the pending finish.
    fn drain_closed(&mut self) {
        while self.closing.front().is_some_and(|c| c.artifact.is_some()) {
            let Some(entry) = self.closing.pop_front() else {
                break;
            };
            let Some(artifact) = entry.artifact else {
                continue;
            };
            let file = match &artifact {
                SegmentArtifact::File(path) => Some(path.clone()),
                SegmentArtifact::Buffer(_) => None,
            };
            if let Err(e) = merge_segment(&mut self.timeline, entry.index, artifact) {
                self.fail(e.into());
                return;
            }
            if let Some(path) = file {
                if let Err(e) = remove_file_if_exists(&path) {
                    warn!("Failed to remove merged segment {}: {}", path.display(), e);
                }
            }
        }
        self.try_finish();
    }

    fn try_finish(&mut self) {
        if !self.closing.is_empty() {
            return;
        }
        match self.pending.take() {
            Some(PendingFinish::Export(completion)) => self.begin_export(completion),
            Some(PendingFinish::Merge) | None => {}
        }
    }

    fn begin_export(&mut self, completion: Option<StopCompletion>) {
        self.completion = completion;
        // Shared with the job; stays readable until the next record()
        let timeline = self.timeline.clone();

        if self.attempt_done || !timeline.has_track() {
            warn!("Nothing was recorded, skipping export");
            self.on_export_finished(self.attempt, Err(Error::Export("empty timeline".into())));
            return;
        }

        info!(
            "Exporting {:?} ({} segments) to {}",
            timeline.duration(),
            timeline.entries().len(),
            self.config.output_path.display()
        );
        let job = ExportJob {
            timeline,
            output_path: self.config.output_path.clone(),
            settings: self.config.settings.clone(),
        };
        // The exporter may complete before this operation returns
        self.flush_notifications();
        let token = ExportCompletion::session(self.events.clone(), self.attempt);
        self.export_cancel = Some(token.cancel_handle());
        self.exporter.export(job, token);
    }

    /// Abandon the recording attempt after a fatal error.
    fn fail(&mut self, error: Error) {
        error!("Recording attempt failed: {}", error);
        let completion = match self.pending.take() {
            Some(PendingFinish::Export(completion)) => completion,
            _ => None,
        }
        .or_else(|| self.completion.take());

        self.discard_attempt();
        self.status = Status::Idle;
        self.notifications.push(Notification::Error(error));
        if let Some(completion) = completion {
            self.notifications.push(Notification::Completion(completion));
        }
    }

    /// Stop capture and drop everything belonging to the current attempt.
    fn discard_attempt(&mut self) {
        self.tracker.stop();
        if let Some(open) = self.active.take() {
            self.backend.stop(open.handle);
        }
        if let Some(cancel) = self.export_cancel.take() {
            info!("Cancelling export in flight");
            if cancel.cancel() {
                if let Err(e) = remove_file_if_exists(&self.config.output_path) {
                    warn!("Failed to remove cancelled export: {}", e);
                }
            }
        }
        self.attempt += 1;
        self.attempt_done = false;
        self.closing.clear();
        self.pending = None;
        self.timeline = Timeline::new(self.spec);
        self.segment_index = 0;
        if let Err(e) = self.store.purge() {
            warn!("Failed to purge segment directory: {}", e);
        }
    }

    fn discard_artifact(&self, artifact: SegmentArtifact) {
        let SegmentArtifact::File(path) = artifact else {
            return;
        };
        // A stale segment may share its path with a segment of the new attempt
        let in_use = self.active.as_ref().is_some_and(|o| o.path == path)
            || self.closing.iter().any(|c| c.path == path);
        if !in_use {
            if let Err(e) = remove_file_if_exists(&path) {
                warn!("Failed to remove stale segment {}: {}", path.display(), e);
            }
        }
    }

    /// Queue buffered notifications ahead of any event sent from here on.
    fn flush_notifications(&mut self) {
        if !self.notifications.is_empty() {
            let _ = self
                .events
                .send(SessionEvent::Notify(std::mem::take(&mut self.notifications)));
        }
    }

    fn is_active(&self, token: u64) -> bool {
        self.active.as_ref().is_some_and(|o| o.token == token)
    }

    fn is_closing(&self, token: u64) -> bool {
        self.closing.iter().any(|c| c.token == token)
    }

    fn notify_progress(&mut self) {
        self.notifications.push(Notification::Progress(Progress {
            elapsed: self.tracker.elapsed(),
            status: self.status,
        }));
    }
}
