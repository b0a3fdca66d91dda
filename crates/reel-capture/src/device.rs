//! Hardware input via CPAL, feeding a [`BufferInput`].

use crate::buffer::BufferInput;
use crate::error::{CaptureError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use reel_core::AudioSpec;
use tracing::{info, warn};

/// Format of the default input device.
pub fn default_input_spec() -> Result<AudioSpec> {
    let device = default_device()?;
    let config = device.default_input_config()?;
    Ok(AudioSpec::new(config.sample_rate().0, config.channels()))
}

/// Running input stream.
///
/// Samples flow into the buffer input for as long as this value is alive.
pub struct DeviceInput {
    spec: AudioSpec,
    _stream: cpal::Stream,
}

impl DeviceInput {
    /// Open the default input device and stream into `input`.
    ///
    /// The device's default format must match the input's format.
    pub fn open_default(input: BufferInput) -> Result<Self> {
        let device = default_device()?;
        let config = device.default_input_config()?;
        let spec = AudioSpec::new(config.sample_rate().0, config.channels());
        if spec != input.spec() {
            return Err(CaptureError::FormatMismatch {
                produced: spec.to_string(),
                requested: input.spec().to_string(),
            });
        }

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), input)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), input)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), input)?,
            format => {
                return Err(CaptureError::UnsupportedFormat(format!("{:?}", format)));
            }
        };
        stream.play()?;

        let name = device.name().unwrap_or_else(|_| "Default".to_string());
        info!("Input stream opened on {} ({})", name, spec);
        Ok(Self {
            spec,
            _stream: stream,
        })
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }
}

fn default_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| CaptureError::InvalidDevice("No input device available".to_string()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    input: BufferInput,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let mut converted: Vec<f32> = Vec::new();
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            converted.clear();
            converted.extend(data.iter().map(|&s| cpal::Sample::from_sample(s)));
            input.push(&converted);
        },
        |err| warn!("Input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
