//! WAV format encoder using hound
//!
//! Supports 16-bit, 24-bit, and 32-bit float WAV files with any channel
//! count. Input samples are interleaved and normalized to -1.0..1.0.

use crate::error::{ExportError, Result};
use crate::options::BitDepth;
use hound::{SampleFormat, WavSpec, WavWriter};
use reel_core::AudioSpec;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// WAV encoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit depth
    pub bit_depth: BitDepth,
    /// Number of interleaved channels
    pub channels: u16,
}

impl WavConfig {
    pub fn new(spec: AudioSpec, bit_depth: BitDepth) -> Self {
        Self {
            sample_rate: spec.sample_rate,
            bit_depth,
            channels: spec.channels,
        }
    }

    /// Create a new WAV config for mono output
    pub fn mono(sample_rate: u32, bit_depth: BitDepth) -> Self {
        Self::new(AudioSpec::mono(sample_rate), bit_depth)
    }

    /// Create a new WAV config for stereo output
    pub fn stereo(sample_rate: u32, bit_depth: BitDepth) -> Self {
        Self::new(AudioSpec::stereo(sample_rate), bit_depth)
    }
}

/// Encode interleaved audio to a WAV file
///
/// # Arguments
/// * `samples` - Interleaved samples (normalized -1.0 to 1.0)
/// * `path` - Output file path
/// * `config` - WAV configuration
pub fn encode_wav_file(samples: &[f32], path: &Path, config: &WavConfig) -> Result<()> {
    check_layout(samples, config)?;

    let file = File::create(path)?;
    let mut writer = WavWriter::new(BufWriter::new(file), create_wav_spec(config))?;
    write_samples(&mut writer, samples, config.bit_depth)?;
    writer.finalize()?;

    Ok(())
}

/// Encode interleaved audio to WAV in memory
///
/// # Returns
/// WAV file bytes
pub fn encode_wav_memory(samples: &[f32], config: &WavConfig) -> Result<Vec<u8>> {
    check_layout(samples, config)?;

    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, create_wav_spec(config))?;
        write_samples(&mut writer, samples, config.bit_depth)?;

        // Finalize writes the header and flushes
        writer.finalize()?;
    }

    Ok(buffer)
}

fn check_layout(samples: &[f32], config: &WavConfig) -> Result<()> {
    if config.channels == 0 {
        return Err(ExportError::InvalidData("No audio channels".into()));
    }
    if samples.len() % config.channels as usize != 0 {
        return Err(ExportError::InvalidData(format!(
            "{} samples is not a whole number of {}-channel frames",
            samples.len(),
            config.channels
        )));
    }
    Ok(())
}

/// Create hound WavSpec from our config
fn create_wav_spec(config: &WavConfig) -> WavSpec {
    let sample_format = match config.bit_depth {
        BitDepth::Float32 => SampleFormat::Float,
        _ => SampleFormat::Int,
    };

    WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: config.bit_depth.bits(),
        sample_format,
    }
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    bit_depth: BitDepth,
) -> Result<()> {
    match bit_depth {
        BitDepth::Int16 => {
            for &sample in samples {
                writer.write_sample(float_to_i16(sample))?;
            }
        }
        BitDepth::Int24 => {
            for &sample in samples {
                writer.write_sample(float_to_i24(sample))?;
            }
        }
        BitDepth::Float32 => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }

    Ok(())
}

/// Convert float sample to 16-bit integer with clipping
#[inline]
fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert float sample to 24-bit integer (stored as i32) with clipping
#[inline]
fn float_to_i24(sample: f32) -> i32 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 8388607.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_float_to_i16() {
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(1.0), 32767);
        assert_eq!(float_to_i16(-1.0), -32767);
        // Test clipping
        assert_eq!(float_to_i16(1.5), 32767);
        assert_eq!(float_to_i16(-1.5), -32767);
    }

    #[test]
    fn test_float_to_i24() {
        assert_eq!(float_to_i24(0.0), 0);
        assert_eq!(float_to_i24(1.0), 8388607);
        assert_eq!(float_to_i24(-1.0), -8388607);
    }

    #[test]
    fn test_encode_wav_memory() {
        let samples = vec![0.0, 0.1, 0.5, -0.1, -0.5, 0.0];
        let config = WavConfig::stereo(44100, BitDepth::Int16);

        let bytes = encode_wav_memory(&samples, &config).unwrap();

        // Check WAV header magic
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn test_encode_wav_memory_partial_frame() {
        let samples = vec![0.0, 0.5, -0.5];
        let config = WavConfig::stereo(44100, BitDepth::Int16);

        let result = encode_wav_memory(&samples, &config);
        assert!(matches!(result, Err(ExportError::InvalidData(_))));
    }

    #[test]
    fn test_encode_wav_file_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples = vec![0.25, -0.25, 0.75, 0.0];
        let config = WavConfig::mono(8000, BitDepth::Float32);

        encode_wav_file(&samples, &path, &config).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        let read: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_encode_wav_file_24_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let config = WavConfig::new(AudioSpec::new(48000, 3), BitDepth::Int24);

        encode_wav_file(&[0.5, 0.0, -0.5], &path, &config).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        assert_eq!(reader.duration(), 1);
        let read: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_relative_eq!(read[0] as f64 / 8388607.0, 0.5, epsilon = 1e-6);
        assert_eq!(read[1], 0);
    }
}
