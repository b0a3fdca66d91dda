//! File-encoding capture backend.
//!
//! Every segment gets its own capture thread that pulls from a shared
//! [`SampleSource`] at the pace of the wall clock and writes a 32-bit float
//! WAV file at the segment's artifact path. Closing finalizes the file and
//! reports its path.

use crate::error::{CaptureError, Result};
use crate::source::SampleSource;
use crossbeam_channel::{bounded, Receiver, Sender};
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use reel_core::{
    AudioSpec, CaptureBackend, CaptureHandle, CaptureSink, SegmentArtifact, SegmentRequest,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default pacing period of capture threads.
pub const DEFAULT_CAPTURE_PERIOD: Duration = Duration::from_millis(10);

type SegmentWriter = WavWriter<BufWriter<File>>;

struct CaptureThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Capture backend writing one WAV file per segment.
pub struct FileCaptureBackend<S: SampleSource> {
    source: Arc<Mutex<S>>,
    spec: AudioSpec,
    period: Duration,
    next_handle: u64,
    active: HashMap<u64, CaptureThread>,
    /// Threads asked to stop, still finalizing
    closing: Vec<JoinHandle<()>>,
}

impl<S: SampleSource> FileCaptureBackend<S> {
    pub fn new(source: S) -> Self {
        let spec = source.spec();
        Self {
            source: Arc::new(Mutex::new(source)),
            spec,
            period: DEFAULT_CAPTURE_PERIOD,
            next_handle: 0,
            active: HashMap::new(),
            closing: Vec::new(),
        }
    }

    /// How often capture threads pull from the source.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn start_segment(
        &mut self,
        request: SegmentRequest,
        sink: CaptureSink,
    ) -> Result<CaptureHandle> {
        if request.spec != self.spec {
            return Err(CaptureError::FormatMismatch {
                produced: self.spec.to_string(),
                requested: request.spec.to_string(),
            });
        }

        let writer = create_wav_writer(&request.artifact_path, self.spec)?;
        let id = self.next_handle;
        self.next_handle += 1;

        let (stop_tx, stop_rx) = bounded(1);
        let job = CaptureJob {
            writer,
            source: Arc::clone(&self.source),
            spec: self.spec,
            period: self.period,
            path: request.artifact_path,
            stop_rx,
            sink,
        };
        let handle = thread::Builder::new()
            .name(format!("reel-capture-{}", request.index))
            .spawn(move || job.run())
            .expect("Failed to spawn capture thread");

        debug!("File capture {} started for segment {}", id, request.index);
        self.active.insert(id, CaptureThread { stop_tx, handle });
        Ok(CaptureHandle(id))
    }
}

impl<S: SampleSource> CaptureBackend for FileCaptureBackend<S> {
    fn start(
        &mut self,
        request: SegmentRequest,
        sink: CaptureSink,
    ) -> reel_core::Result<CaptureHandle> {
        Ok(self.start_segment(request, sink)?)
    }

    fn stop(&mut self, handle: CaptureHandle) {
        self.closing.retain(|h| !h.is_finished());
        match self.active.remove(&handle.0) {
            Some(capture) => {
                let _ = capture.stop_tx.send(());
                self.closing.push(capture.handle);
            }
            None => debug!("Stop for unknown capture {:?}", handle),
        }
    }

    fn is_capturing(&self) -> bool {
        !self.active.is_empty()
    }
}

impl<S: SampleSource> Drop for FileCaptureBackend<S> {
    fn drop(&mut self) {
        for (_, capture) in self.active.drain() {
            let _ = capture.stop_tx.send(());
            self.closing.push(capture.handle);
        }
        for handle in self.closing.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Open a 32-bit float WAV writer at `path`.
pub(crate) fn create_wav_writer(path: &Path, spec: AudioSpec) -> Result<SegmentWriter> {
    let wav_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let file = File::create(path)?;
    Ok(WavWriter::new(BufWriter::new(file), wav_spec)?)
}

struct CaptureJob<S> {
    writer: SegmentWriter,
    source: Arc<Mutex<S>>,
    spec: AudioSpec,
    period: Duration,
    path: PathBuf,
    stop_rx: Receiver<()>,
    sink: CaptureSink,
}

impl<S: SampleSource> CaptureJob<S> {
    fn run(mut self) {
        let started = Instant::now();
        let channels = self.spec.channels.max(1) as usize;
        let mut written: u64 = 0;
        let mut buf = Vec::new();

        loop {
            let stop = crossbeam_channel::select! {
                recv(self.stop_rx) -> _ => true,
                default(self.period) => false,
            };

            // Catch up with the wall clock
            let due = self.spec.duration_to_frames(started.elapsed());
            if due > written {
                let frames = (due - written) as usize;
                buf.clear();
                buf.resize(frames * channels, 0.0);
                self.source.lock().read(&mut buf);

                if let Err(e) = buf.iter().try_for_each(|&s| self.writer.write_sample(s)) {
                    warn!("Segment write failed: {}", e);
                    self.sink.capture_failed(e.to_string());
                    return;
                }
                written = due;
                self.sink.frames_captured(frames as u64);
            }

            if stop {
                break;
            }
        }

        match self.writer.finalize() {
            Ok(()) => {
                debug!("Segment file {} closed ({} frames)", self.path.display(), written);
                self.sink.segment_closed(SegmentArtifact::File(self.path));
            }
            Err(e) => {
                warn!("Failed to finalize {}: {}", self.path.display(), e);
                self.sink.capture_failed(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SilenceSource, ToneSource};
    use reel_core::{CaptureEvent, EncoderSettings};

    fn request(dir: &Path, index: usize, spec: AudioSpec) -> SegmentRequest {
        SegmentRequest {
            index,
            artifact_path: dir.join(format!("{}.wav", index)),
            spec,
            settings: EncoderSettings::with_sample_rate(spec.sample_rate),
        }
    }

    fn wait_closed(rx: &Receiver<CaptureEvent>) -> (SegmentArtifact, u64) {
        let mut frames = 0;
        loop {
            match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                CaptureEvent::FramesCaptured(n) => frames += n,
                CaptureEvent::Closed(artifact) => return (artifact, frames),
                CaptureEvent::Failed(message) => panic!("capture failed: {}", message),
            }
        }
    }

    #[test]
    fn test_segment_written_to_artifact_path() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AudioSpec::mono(8000);
        let mut backend = FileCaptureBackend::new(ToneSource::new(spec, 440.0));

        let (sink, rx) = CaptureSink::probe(0);
        let handle = backend.start(request(dir.path(), 0, spec), sink).unwrap();
        assert!(backend.is_capturing());
        thread::sleep(Duration::from_millis(60));
        backend.stop(handle);
        assert!(!backend.is_capturing());

        let (artifact, reported) = wait_closed(&rx);
        let path = dir.path().join("0.wav");
        assert_eq!(artifact, SegmentArtifact::File(path.clone()));

        let reader = hound::WavReader::open(&path).unwrap();
        let wav = reader.spec();
        assert_eq!(wav.sample_rate, 8000);
        assert_eq!(wav.channels, 1);
        assert_eq!(wav.bits_per_sample, 32);
        assert_eq!(wav.sample_format, SampleFormat::Float);
        // Paced by wall clock: at least the time slept
        assert!(reader.duration() >= 8000 * 50 / 1000);
        assert_eq!(reader.duration() as u64, reported);
    }

    #[test]
    fn test_format_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileCaptureBackend::new(SilenceSource::new(AudioSpec::mono(8000)));

        let (sink, _rx) = CaptureSink::probe(0);
        let err = backend
            .start(request(dir.path(), 0, AudioSpec::stereo(8000)), sink)
            .unwrap_err();
        assert!(matches!(err, reel_core::Error::BackendStart(_)));
        assert!(!backend.is_capturing());
        assert!(!dir.path().join("0.wav").exists());
    }

    #[test]
    fn test_unwritable_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AudioSpec::mono(8000);
        let mut backend = FileCaptureBackend::new(SilenceSource::new(spec));

        let mut req = request(dir.path(), 0, spec);
        req.artifact_path = dir.path().join("missing").join("0.wav");
        let (sink, _rx) = CaptureSink::probe(0);
        assert!(backend.start(req, sink).is_err());
    }

    #[test]
    fn test_drop_closes_open_segments() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AudioSpec::mono(8000);
        let mut backend =
            FileCaptureBackend::new(SilenceSource::new(spec)).with_period(Duration::from_millis(2));

        let (sink, rx) = CaptureSink::probe(3);
        backend.start(request(dir.path(), 3, spec), sink).unwrap();
        drop(backend);

        let (artifact, _) = wait_closed(&rx);
        assert_eq!(artifact, SegmentArtifact::File(dir.path().join("3.wav")));
    }

    #[test]
    fn test_overlapping_close_and_start() {
        let dir = tempfile::tempdir().unwrap();
        let spec = AudioSpec::mono(8000);
        let mut backend = FileCaptureBackend::new(ToneSource::new(spec, 220.0));

        let (first, first_rx) = CaptureSink::probe(0);
        let h0 = backend.start(request(dir.path(), 0, spec), first).unwrap();
        thread::sleep(Duration::from_millis(20));
        backend.stop(h0);

        let (second, second_rx) = CaptureSink::probe(1);
        let h1 = backend.start(request(dir.path(), 1, spec), second).unwrap();
        assert_ne!(h0, h1);
        thread::sleep(Duration::from_millis(20));
        backend.stop(h1);

        assert!(matches!(wait_closed(&first_rx).0, SegmentArtifact::File(_)));
        assert!(matches!(wait_closed(&second_rx).0, SegmentArtifact::File(_)));
    }
}
