//! Builder for configuring and constructing a recording session.

use crate::Result;
use reel_core::{
    CaptureBackend, EncoderSettings, Exporter, NoopDelegate, RecorderConfig,
    RecorderConfigBuilder, SessionController, SessionDelegate,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[cfg(all(feature = "capture", feature = "export"))]
use reel_capture::{BufferCaptureBackend, BufferInput, FileCaptureBackend, SampleSource};
#[cfg(feature = "export")]
use reel_export::{BitDepth, WavExporter};

/// Session writing one WAV file per segment from a [`SampleSource`].
#[cfg(all(feature = "capture", feature = "export"))]
pub type FileRecorder<S> = SessionController<FileCaptureBackend<S>, WavExporter>;

/// Session fed by a host audio callback through a [`BufferInput`].
#[cfg(all(feature = "capture", feature = "export"))]
pub type LiveRecorder = SessionController<BufferCaptureBackend, WavExporter>;

/// The sample rate is the only required setting. Everything else has a
/// default: mono input, segments under `<temp>/reel_segments`, 100ms
/// progress cadence and a delegate that ignores every notification.
///
/// # Example
///
/// ```ignore
/// use reel::prelude::*;
///
/// let recorder = RecorderBuilder::new("take.wav")
///     .sample_rate(48000)
///     .channels(2)
///     .build_with_source(ToneSource::new(AudioSpec::stereo(48000), 440.0))?;
///
/// recorder.record_for(Duration::from_secs(30))?;
/// ```
pub struct RecorderBuilder {
    config: RecorderConfigBuilder,
    settings: EncoderSettings,
    delegate: Arc<dyn SessionDelegate>,

    #[cfg(feature = "export")]
    bit_depth: BitDepth,
}

impl RecorderBuilder {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            config: RecorderConfig::builder(output_path),
            settings: EncoderSettings::new(),
            delegate: Arc::new(NoopDelegate),

            #[cfg(feature = "export")]
            bit_depth: BitDepth::default(),
        }
    }

    /// Replace all encoder settings.
    pub fn settings(mut self, settings: EncoderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.settings = self.settings.set(reel_core::keys::SAMPLE_RATE, sample_rate);
        self
    }

    /// Default: 1
    pub fn channels(mut self, channels: u16) -> Self {
        self.settings = self.settings.set(reel_core::keys::CHANNELS, channels as u32);
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.temp_dir(dir);
        self
    }

    /// Default: 100ms
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.tick_interval(interval);
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn SessionDelegate>) -> Self {
        self.delegate = delegate;
        self
    }

    /// Bit depth of the exported file when the settings carry no
    /// `bit_depth`. Default: 16-bit.
    #[cfg(feature = "export")]
    pub fn bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Finished configuration, without building a session.
    pub fn config(&self) -> RecorderConfig {
        self.config.clone().settings(self.settings.clone()).build()
    }

    /// Build a session over caller-supplied collaborators.
    pub fn build<B, E>(self, backend: B, exporter: E) -> Result<SessionController<B, E>>
    where
        B: CaptureBackend,
        E: Exporter,
    {
        let config = self.config();
        Ok(SessionController::new(config, backend, exporter, self.delegate)?)
    }

    /// Build a session recording from `source` into per-segment WAV files.
    #[cfg(all(feature = "capture", feature = "export"))]
    pub fn build_with_source<S: SampleSource>(self, source: S) -> Result<FileRecorder<S>> {
        let exporter = WavExporter::new(self.bit_depth);
        self.build(FileCaptureBackend::new(source), exporter)
    }

    /// Build a session fed by pushed samples.
    ///
    /// Returns the session and the input handle the audio callback pushes
    /// into. Elapsed time follows captured frames rather than the wall clock.
    #[cfg(all(feature = "capture", feature = "export"))]
    pub fn build_live(self) -> Result<(LiveRecorder, BufferInput)> {
        let spec = self.config().validate()?;
        let backend = BufferCaptureBackend::new(spec);
        let input = backend.input();
        let exporter = WavExporter::new(self.bit_depth);
        Ok((self.build(backend, exporter)?, input))
    }
}
