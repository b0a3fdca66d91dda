//! Recorder configuration.

use crate::audio::AudioSpec;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Well-known encoder setting keys.
pub mod keys {
    pub const SAMPLE_RATE: &str = "sample_rate";
    pub const CHANNELS: &str = "channels";
    pub const BIT_DEPTH: &str = "bit_depth";
    pub const QUALITY: &str = "quality";
}

/// Default tracker cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Directory name used under the system temp dir when none is configured.
pub const DEFAULT_TEMP_DIR_NAME: &str = "reel_segments";

/// Encoder setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    fn as_positive_u64(&self) -> Option<u64> {
        match *self {
            SettingValue::Int(v) if v > 0 => Some(v as u64),
            SettingValue::Float(v) if v >= 1.0 && v.fract() == 0.0 => Some(v as u64),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u32> for SettingValue {
    fn from(v: u32) -> Self {
        SettingValue::Int(v as i64)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

/// Opaque settings handed to the capture backend and the exporter.
///
/// Only `sample_rate` is interpreted by the session itself; everything else
/// passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderSettings(BTreeMap<String, SettingValue>);

impl EncoderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mono, low quality settings at the given sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::new()
            .set(keys::SAMPLE_RATE, sample_rate)
            .set(keys::CHANNELS, 1u32)
            .set(keys::QUALITY, "low")
    }

    /// Insert or replace a setting.
    pub fn set(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sample rate in Hz, if present and positive.
    pub fn sample_rate(&self) -> Option<u32> {
        self.get(keys::SAMPLE_RATE)
            .and_then(SettingValue::as_positive_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Channel count (default: 1).
    pub fn channels(&self) -> u16 {
        self.get(keys::CHANNELS)
            .and_then(SettingValue::as_positive_u64)
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(1)
    }

    /// Bits per sample requested for the exported file.
    pub fn bit_depth(&self) -> Option<u16> {
        self.get(keys::BIT_DEPTH)
            .and_then(SettingValue::as_positive_u64)
            .and_then(|v| u16::try_from(v).ok())
    }

    /// Derive the audio format, rejecting settings without a sample rate.
    pub fn audio_spec(&self) -> Result<AudioSpec> {
        let sample_rate = self.sample_rate().ok_or_else(|| {
            Error::Configuration(format!(
                "`{}` must be set to a positive integer",
                keys::SAMPLE_RATE
            ))
        })?;
        Ok(AudioSpec::new(sample_rate, self.channels()))
    }
}

/// Configuration for one recorder.
///
/// Fixed for the lifetime of the session controller that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Final output file, overwritten by each successful export
    pub output_path: PathBuf,
    /// Settings passed through to the backend and exporter
    #[serde(default)]
    pub settings: EncoderSettings,
    /// Directory for per-segment artifacts (default: `<temp>/reel_segments`)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Duration tracker cadence (default: 100ms)
    #[serde(default = "default_tick_interval")]
    pub tick_interval: Duration,
}

fn default_tick_interval() -> Duration {
    DEFAULT_TICK_INTERVAL
}

impl RecorderConfig {
    /// Create a builder for the given output path
    ///
    /// # Example
    /// ```ignore
    /// let config = RecorderConfig::builder("take.wav")
    ///     .settings(EncoderSettings::with_sample_rate(48000))
    ///     .tick_interval(Duration::from_millis(50))
    ///     .build();
    /// ```
    pub fn builder(output_path: impl Into<PathBuf>) -> RecorderConfigBuilder {
        RecorderConfigBuilder {
            config: RecorderConfig {
                output_path: output_path.into(),
                settings: EncoderSettings::default(),
                temp_dir: None,
                tick_interval: DEFAULT_TICK_INTERVAL,
            },
        }
    }

    /// Effective segment directory.
    pub fn segment_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_TEMP_DIR_NAME))
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Check every required setting, returning the session audio format.
    pub fn validate(&self) -> Result<AudioSpec> {
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Configuration("output path is empty".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(Error::Configuration("tick interval must be non-zero".into()));
        }
        self.settings.audio_spec()
    }
}

/// Builder for RecorderConfig with fluent API
#[derive(Clone, Debug)]
pub struct RecorderConfigBuilder {
    config: RecorderConfig,
}

impl RecorderConfigBuilder {
    pub fn settings(mut self, settings: EncoderSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn build(self) -> RecorderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sample_rate() {
        let settings = EncoderSettings::with_sample_rate(48000);
        assert_eq!(settings.sample_rate(), Some(48000));
        assert_eq!(settings.channels(), 1);
        assert_eq!(
            settings.get(keys::QUALITY),
            Some(&SettingValue::Text("low".into()))
        );
    }

    #[test]
    fn test_missing_sample_rate_is_fatal() {
        let settings = EncoderSettings::new().set(keys::CHANNELS, 2u32);
        assert!(matches!(
            settings.audio_spec(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_non_positive_sample_rate_rejected() {
        let settings = EncoderSettings::new().set(keys::SAMPLE_RATE, 0i64);
        assert_eq!(settings.sample_rate(), None);
        let settings = EncoderSettings::new().set(keys::SAMPLE_RATE, -44100i64);
        assert_eq!(settings.sample_rate(), None);
    }

    #[test]
    fn test_float_sample_rate_accepted() {
        let settings = EncoderSettings::new().set(keys::SAMPLE_RATE, 44100.0);
        assert_eq!(settings.sample_rate(), Some(44100));
        let settings = EncoderSettings::new().set(keys::SAMPLE_RATE, 44100.5);
        assert_eq!(settings.sample_rate(), None);
    }

    #[test]
    fn test_audio_spec() {
        let settings = EncoderSettings::with_sample_rate(44100).set(keys::CHANNELS, 2u32);
        assert_eq!(settings.audio_spec().unwrap(), AudioSpec::stereo(44100));
    }

    #[test]
    fn test_builder_defaults() {
        let config = RecorderConfig::builder("/tmp/out.wav").build();
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
        assert!(config.temp_dir.is_none());
        assert!(config.segment_dir().ends_with(DEFAULT_TEMP_DIR_NAME));
        // No sample rate configured
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = RecorderConfig::builder("/tmp/out.wav")
            .settings(EncoderSettings::with_sample_rate(8000))
            .tick_interval(Duration::ZERO)
            .build();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let config = RecorderConfig::builder("/tmp/out.wav")
            .settings(EncoderSettings::with_sample_rate(22050).set(keys::BIT_DEPTH, 24u32))
            .temp_dir("/tmp/segments")
            .build();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: RecorderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
        assert_eq!(decoded.settings.bit_depth(), Some(24));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{ "output_path": "/tmp/a.wav", "settings": { "sample_rate": 16000 } }"#;
        let config: RecorderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(config.validate().unwrap(), AudioSpec::mono(16000));
    }
}
