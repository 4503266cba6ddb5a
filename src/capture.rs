// src/capture.rs

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream, StreamConfig};

use crate::engine::SampleInput;

/// The default input device and the format it will deliver.
/// Open it first so the analyzer can be configured for its rate and channels.
pub struct InputDevice {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    pub name: String,
    pub channels: usize,
    pub sample_rate: u32,
}

impl InputDevice {
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No input device available"))?;
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());

        let supported_config = device
            .default_input_config()
            .context("querying default input config")?;
        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        log::info!("input device '{name}': {channels} ch @ {sample_rate} Hz, {sample_format:?}");

        Ok(Self {
            device,
            config,
            sample_format,
            name,
            channels,
            sample_rate,
        })
    }

    /// Starts capture. Every device callback is converted to f32 and pushed
    /// into `input` as one interleaved block. Keep the returned stream alive.
    pub fn start(self, input: SampleInput) -> Result<Stream> {
        let stream = match self.sample_format {
            SampleFormat::F32 => build_stream::<f32>(&self.device, &self.config, input)?,
            SampleFormat::I16 => build_stream::<i16>(&self.device, &self.config, input)?,
            SampleFormat::U16 => build_stream::<u16>(&self.device, &self.config, input)?,
            SampleFormat::I32 => build_stream::<i32>(&self.device, &self.config, input)?,
            other => anyhow::bail!("Unsupported sample format: {:?}", other),
        };
        stream.play()?;
        Ok(stream)
    }
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mut input: SampleInput) -> Result<Stream>
where
    T: SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels as usize;
    // Grows to the largest callback size once, then reused.
    let mut converted: Vec<f32> = Vec::with_capacity(4096);
    let err_fn = |err: cpal::StreamError| log::error!("Input stream error: {err}");

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            converted.clear();
            converted.extend(data.iter().map(|&s| s.to_sample::<f32>()));
            input.push_interleaved(&converted, channels);
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
