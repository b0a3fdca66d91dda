//! Sample sources for the file capture backend.

use reel_core::AudioSpec;
use std::f64::consts::TAU;

/// Pull-based producer of interleaved `f32` samples.
pub trait SampleSource: Send + 'static {
    fn spec(&self) -> AudioSpec;

    /// Fill `buf` with interleaved samples, returning how many were written.
    ///
    /// Only whole frames are written. A short read means the source has
    /// nothing more for now; the caller pads with silence.
    fn read(&mut self, buf: &mut [f32]) -> usize;
}

/// Sine generator, identical on every channel.
#[derive(Debug, Clone)]
pub struct ToneSource {
    spec: AudioSpec,
    frequency: f64,
    amplitude: f32,
    phase: f64,
}

impl ToneSource {
    pub fn new(spec: AudioSpec, frequency: f64) -> Self {
        Self {
            spec,
            frequency,
            amplitude: 0.5,
            phase: 0.0,
        }
    }

    /// Peak amplitude (clamped to 0.0 - 1.0).
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }
}

impl SampleSource for ToneSource {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [f32]) -> usize {
        let channels = self.spec.channels.max(1) as usize;
        let step = self.frequency / self.spec.sample_rate.max(1) as f64;
        let mut written = 0;

        for frame in buf.chunks_exact_mut(channels) {
            let value = (self.phase * TAU).sin() as f32 * self.amplitude;
            frame.fill(value);
            self.phase = (self.phase + step).fract();
            written += channels;
        }
        written
    }
}

/// Digital silence.
#[derive(Debug, Clone, Copy)]
pub struct SilenceSource {
    spec: AudioSpec,
}

impl SilenceSource {
    pub fn new(spec: AudioSpec) -> Self {
        Self { spec }
    }
}

impl SampleSource for SilenceSource {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [f32]) -> usize {
        let channels = self.spec.channels.max(1) as usize;
        let len = buf.len() - buf.len() % channels;
        buf[..len].fill(0.0);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tone_writes_whole_frames() {
        let mut tone = ToneSource::new(AudioSpec::stereo(48000), 440.0);
        let mut buf = vec![9.0; 7];
        assert_eq!(tone.read(&mut buf), 6);
        // Both channels carry the same value
        assert_eq!(buf[2], buf[3]);
        assert_eq!(buf[6], 9.0);
    }

    #[test]
    fn test_tone_amplitude_bounded() {
        let mut tone = ToneSource::new(AudioSpec::mono(8000), 1000.0).with_amplitude(0.25);
        let mut buf = vec![0.0; 8000];
        tone.read(&mut buf);
        let peak = buf.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak <= 0.25 + f32::EPSILON);
        assert_relative_eq!(peak, 0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_tone_phase_continues_across_reads() {
        let spec = AudioSpec::mono(8000);
        let mut whole = ToneSource::new(spec, 440.0);
        let mut split = ToneSource::new(spec, 440.0);

        let mut a = vec![0.0; 100];
        whole.read(&mut a);

        let mut b = vec![0.0; 100];
        split.read(&mut b[..40]);
        split.read(&mut b[40..]);

        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_silence() {
        let mut silence = SilenceSource::new(AudioSpec::stereo(44100));
        let mut buf = vec![1.0; 5];
        assert_eq!(silence.read(&mut buf), 4);
        assert_eq!(&buf[..4], &[0.0; 4]);
    }
}
