//! Audio format and in-memory clip types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Sample rate and channel layout shared by segments, the timeline and the
/// exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl AudioSpec {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }

    /// Duration of `frames` frames at this sample rate.
    pub fn frames_to_duration(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let secs = frames / self.sample_rate as u64;
        let rem = frames % self.sample_rate as u64;
        Duration::from_secs(secs)
            + Duration::from_nanos(rem * 1_000_000_000 / self.sample_rate as u64)
    }

    /// Number of whole frames covering `duration`.
    pub fn duration_to_frames(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.sample_rate as f64).round() as u64
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// Interleaved `f32` audio held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub spec: AudioSpec,
    /// Interleaved samples, normalized -1.0 to 1.0
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn new(spec: AudioSpec, samples: Vec<f32>) -> Self {
        Self { spec, samples }
    }

    pub fn silence(spec: AudioSpec, frames: usize) -> Self {
        Self::new(spec, vec![0.0; frames * spec.channels as usize])
    }

    /// Number of complete frames.
    pub fn frames(&self) -> u64 {
        if self.spec.channels == 0 {
            return 0;
        }
        (self.samples.len() / self.spec.channels as usize) as u64
    }

    pub fn duration(&self) -> Duration {
        self.spec.frames_to_duration(self.frames())
    }
}
