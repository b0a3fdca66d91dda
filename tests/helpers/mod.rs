//! Shared fixtures for reel integration tests.
//!
//! Sessions run against real capture backends and the WAV exporter, so
//! timings are wall-clock and assertions use generous tolerances.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use reel::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Low rate keeps segment files small.
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Upper bound on waiting for an asynchronous outcome.
pub const OUTCOME_TIMEOUT: Duration = Duration::from_secs(5);

/// Delegate notification, as observed by a test.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Finished,
    Error(reel::core::Error),
    Progress(Progress),
}

/// Delegate forwarding every notification to a channel.
pub struct ChannelDelegate {
    tx: Sender<Outcome>,
}

impl ChannelDelegate {
    pub fn new() -> (Arc<Self>, Receiver<Outcome>) {
        let (tx, rx) = unbounded();
        (Arc::new(Self { tx }), rx)
    }
}

impl SessionDelegate for ChannelDelegate {
    fn on_finished(&self) {
        let _ = self.tx.send(Outcome::Finished);
    }

    fn on_error(&self, error: &reel::core::Error) {
        let _ = self.tx.send(Outcome::Error(error.clone()));
    }

    fn on_progress(&self, progress: Progress) {
        let _ = self.tx.send(Outcome::Progress(progress));
    }
}

/// Wait for the next finished or error notification, skipping progress.
pub fn next_outcome(rx: &Receiver<Outcome>) -> Outcome {
    loop {
        match rx
            .recv_timeout(OUTCOME_TIMEOUT)
            .expect("Timed out waiting for session outcome")
        {
            Outcome::Progress(_) => continue,
            outcome => return outcome,
        }
    }
}

/// Scratch directory holding the output file and segment directory.
pub struct Scratch {
    dir: tempfile::TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("take.wav")
    }

    pub fn segments(&self) -> PathBuf {
        self.dir.path().join("segments")
    }

    /// Builder preconfigured for a mono test session in this directory.
    pub fn builder(&self) -> RecorderBuilder {
        RecorderBuilder::new(self.output())
            .sample_rate(TEST_SAMPLE_RATE)
            .temp_dir(self.segments())
            .tick_interval(Duration::from_millis(10))
    }
}

/// Frame count and format of a WAV file.
pub fn wav_frames(path: &Path) -> (u32, hound::WavSpec) {
    let reader = hound::WavReader::open(path).expect("Failed to open exported file");
    (reader.duration(), reader.spec())
}

pub fn frames_to_duration(frames: u32) -> Duration {
    AudioSpec::mono(TEST_SAMPLE_RATE).frames_to_duration(frames as u64)
}

/// Enable log output for a test run (`RUST_LOG=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
