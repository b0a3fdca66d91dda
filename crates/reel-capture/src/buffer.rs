//! Live-buffer capture backend.
//!
//! A host audio callback pushes interleaved samples through a cloneable
//! [`BufferInput`]. Each push travels as one chunk over a channel to a router
//! thread that appends it to the open segment's in-memory clip. Closing a
//! segment delivers the clip itself instead of a file.
//!
//! Every chunk is tagged with the segment that was open when it was pushed.
//! A chunk that reaches the router after its segment closed is dropped and
//! counted, so audio never leaks into the next segment.
//!
//! Elapsed time is derived from the number of captured frames rather than
//! the wall clock.

use crate::error::{CaptureError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use reel_core::{
    AudioClip, AudioSpec, CaptureBackend, CaptureHandle, CaptureSink, DurationSource,
    SegmentArtifact, SegmentRequest,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

enum LiveMessage {
    /// Whole frames pushed while `handle` was open
    Samples {
        handle: CaptureHandle,
        samples: Vec<f32>,
    },
    Begin {
        handle: CaptureHandle,
        sink: CaptureSink,
    },
    End {
        handle: CaptureHandle,
    },
    Shutdown,
}

/// State shared by every input clone and the router.
struct Shared {
    /// Open capture handle plus one; zero while idle
    open: AtomicU64,
    /// Samples queued but not yet routed
    queued: AtomicUsize,
    capacity: usize,
    dropped: AtomicU64,
    dropped_idle: AtomicU64,
}

impl Shared {
    fn open_handle(&self) -> Option<CaptureHandle> {
        match self.open.load(Ordering::Acquire) {
            0 => None,
            id => Some(CaptureHandle(id - 1)),
        }
    }

    fn set_open(&self, handle: Option<CaptureHandle>) {
        let id = handle.map(|h| h.0 + 1).unwrap_or(0);
        self.open.store(id, Ordering::Release);
    }
}

/// Handle for feeding samples into a [`BufferCaptureBackend`].
///
/// Cheap to clone and safe to use from an audio callback: pushing never
/// blocks. Samples pushed while no segment is capturing, or while the queue
/// is full, are dropped and counted.
#[derive(Clone)]
pub struct BufferInput {
    tx: Sender<LiveMessage>,
    spec: AudioSpec,
    shared: Arc<Shared>,
}

impl BufferInput {
    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Whether pushed samples are currently being captured.
    pub fn is_capturing(&self) -> bool {
        self.shared.open_handle().is_some()
    }

    /// Push interleaved samples, returning how many were queued.
    ///
    /// Only whole frames are queued; a trailing partial frame is dropped.
    /// Queued samples that arrive after their segment closed are counted in
    /// [`dropped_idle_samples`](Self::dropped_idle_samples).
    pub fn push(&self, samples: &[f32]) -> usize {
        let Some(handle) = self.shared.open_handle() else {
            self.shared
                .dropped_idle
                .fetch_add(samples.len() as u64, Ordering::Relaxed);
            return 0;
        };

        let channels = self.spec.channels.max(1) as usize;
        let whole = samples.len() - samples.len() % channels;
        let room = self
            .shared
            .capacity
            .saturating_sub(self.shared.queued.load(Ordering::Acquire));
        let accepted = whole.min(room - room % channels);
        if accepted < samples.len() {
            self.shared
                .dropped
                .fetch_add((samples.len() - accepted) as u64, Ordering::Relaxed);
        }
        if accepted == 0 {
            return 0;
        }

        self.shared.queued.fetch_add(accepted, Ordering::AcqRel);
        let message = LiveMessage::Samples {
            handle,
            samples: samples[..accepted].to_vec(),
        };
        if self.tx.send(message).is_err() {
            self.shared.queued.fetch_sub(accepted, Ordering::AcqRel);
            self.shared
                .dropped
                .fetch_add(accepted as u64, Ordering::Relaxed);
            return 0;
        }
        accepted
    }

    /// Samples dropped because the queue was full or they did not form a
    /// whole frame.
    pub fn dropped_samples(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Samples pushed while no segment was capturing, or routed after their
    /// segment closed.
    pub fn dropped_idle_samples(&self) -> u64 {
        self.shared.dropped_idle.load(Ordering::Relaxed)
    }

    pub fn reset_dropped_samples(&self) {
        self.shared.dropped.store(0, Ordering::Relaxed);
        self.shared.dropped_idle.store(0, Ordering::Relaxed);
    }
}

/// Capture backend fed by a host audio callback.
pub struct BufferCaptureBackend {
    input: BufferInput,
    next_handle: u64,
    open: Option<CaptureHandle>,
    router: Option<JoinHandle<()>>,
}

impl BufferCaptureBackend {
    /// Create a backend buffering up to half a second of audio.
    pub fn new(spec: AudioSpec) -> Self {
        let capacity = (spec.sample_rate as usize * spec.channels.max(1) as usize) / 2;
        Self::with_capacity(spec, capacity)
    }

    /// Create a backend whose queue holds `capacity` samples.
    pub fn with_capacity(spec: AudioSpec, capacity: usize) -> Self {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared {
            open: AtomicU64::new(0),
            queued: AtomicUsize::new(0),
            capacity: capacity.max(spec.channels.max(1) as usize),
            dropped: AtomicU64::new(0),
            dropped_idle: AtomicU64::new(0),
        });
        let input = BufferInput {
            tx,
            spec,
            shared: Arc::clone(&shared),
        };

        let router = thread::Builder::new()
            .name("reel-buffer-router".into())
            .spawn(move || router_loop(rx, spec, shared))
            .expect("Failed to spawn buffer router thread");

        Self {
            input,
            next_handle: 0,
            open: None,
            router: Some(router),
        }
    }

    /// Handle for the host audio callback.
    pub fn input(&self) -> BufferInput {
        self.input.clone()
    }

    pub fn spec(&self) -> AudioSpec {
        self.input.spec
    }

    fn start_segment(
        &mut self,
        request: SegmentRequest,
        sink: CaptureSink,
    ) -> Result<CaptureHandle> {
        if request.spec != self.input.spec {
            return Err(CaptureError::FormatMismatch {
                produced: self.input.spec.to_string(),
                requested: request.spec.to_string(),
            });
        }
        if let Some(open) = self.open {
            self.stop(open);
        }

        let handle = CaptureHandle(self.next_handle);
        self.next_handle += 1;
        // Begin is queued ahead of any chunk tagged with the new handle
        self.input
            .tx
            .send(LiveMessage::Begin { handle, sink })
            .map_err(|_| CaptureError::RouterStopped)?;
        self.input.shared.set_open(Some(handle));
        self.open = Some(handle);
        debug!("Buffer capture {:?} started for segment {}", handle, request.index);
        Ok(handle)
    }
}

impl CaptureBackend for BufferCaptureBackend {
    fn start(
        &mut self,
        request: SegmentRequest,
        sink: CaptureSink,
    ) -> reel_core::Result<CaptureHandle> {
        Ok(self.start_segment(request, sink)?)
    }

    fn stop(&mut self, handle: CaptureHandle) {
        if self.open != Some(handle) {
            debug!("Stop for unknown capture {:?}", handle);
            return;
        }
        self.input.shared.set_open(None);
        self.open = None;
        if self.input.tx.send(LiveMessage::End { handle }).is_err() {
            warn!("Buffer router stopped before capture {:?} closed", handle);
        }
    }

    fn is_capturing(&self) -> bool {
        self.open.is_some()
    }

    fn duration_source(&self) -> DurationSource {
        DurationSource::CapturedFrames
    }
}

impl Drop for BufferCaptureBackend {
    fn drop(&mut self) {
        if let Some(open) = self.open {
            self.stop(open);
        }
        let _ = self.input.tx.send(LiveMessage::Shutdown);
        if let Some(router) = self.router.take() {
            let _ = router.join();
        }
    }
}

struct OpenClip {
    handle: CaptureHandle,
    sink: CaptureSink,
    samples: Vec<f32>,
}

fn router_loop(rx: Receiver<LiveMessage>, spec: AudioSpec, shared: Arc<Shared>) {
    let channels = spec.channels.max(1) as usize;
    let mut current: Option<OpenClip> = None;

    for message in rx.iter() {
        match message {
            LiveMessage::Samples { handle, samples } => {
                shared.queued.fetch_sub(samples.len(), Ordering::AcqRel);
                match current.as_mut() {
                    Some(clip) if clip.handle == handle => {
                        clip.samples.extend_from_slice(&samples);
                        clip.sink.frames_captured((samples.len() / channels) as u64);
                    }
                    _ => {
                        shared
                            .dropped_idle
                            .fetch_add(samples.len() as u64, Ordering::Relaxed);
                    }
                }
            }
            LiveMessage::Begin { handle, sink } => {
                if let Some(previous) = current.take() {
                    close_clip(previous, spec);
                }
                current = Some(OpenClip {
                    handle,
                    sink,
                    samples: Vec::with_capacity(spec.sample_rate as usize * channels),
                });
            }
            LiveMessage::End { handle } => match current.take() {
                Some(clip) if clip.handle == handle => close_clip(clip, spec),
                other => current = other,
            },
            LiveMessage::Shutdown => break,
        }
    }
    debug!("Buffer router stopped");
}

fn close_clip(clip: OpenClip, spec: AudioSpec) {
    debug!(
        "Buffer capture {:?} closed ({} frames)",
        clip.handle,
        clip.samples.len() / spec.channels.max(1) as usize
    );
    clip.sink
        .segment_closed(SegmentArtifact::Buffer(AudioClip::new(spec, clip.samples)));
}
