// src/audio.rs

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{
    BufferSize, Device, FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
};

use crate::config::{CHANNELS, EngineConfig};
use crate::error::{EngineError, Result};
use crate::mixer::RenderHandle;

/// Output device plus the stream config we will open it with.
pub struct OutputConfig {
    pub device: Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
    pub device_channels: usize,
}

/// Find the default output device and pin it to the engine's rate and block
/// size. The device keeps its own channel count; we write stereo into the
/// first two channels.
pub fn setup_output_device(engine: &EngineConfig) -> Result<OutputConfig> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(EngineError::NoOutputDevice)?;
    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let device_channels = supported.channels() as usize;

    let config = StreamConfig {
        channels: supported.channels(),
        sample_rate: SampleRate(engine.sample_rate),
        buffer_size: BufferSize::Fixed(engine.block_size),
    };

    let name = device.name().unwrap_or_else(|_| "unknown".into());
    tracing::info!(
        device = %name,
        channels = device_channels,
        sample_rate = engine.sample_rate,
        block_size = engine.block_size,
        ?sample_format,
        "output device selected"
    );

    Ok(OutputConfig {
        device,
        config,
        sample_format,
        device_channels,
    })
}

/// Open an output stream that renders through `handle`.
pub fn open_stream(
    output: &OutputConfig,
    handle: RenderHandle,
    block_frames: usize,
) -> Result<Stream> {
    match output.sample_format {
        SampleFormat::F32 => build_stream::<f32>(output, handle, block_frames),
        SampleFormat::I16 => build_stream::<i16>(output, handle, block_frames),
        SampleFormat::U16 => build_stream::<u16>(output, handle, block_frames),
        other => Err(EngineError::SampleFormat(other)),
    }
}

fn build_stream<T>(
    output: &OutputConfig,
    handle: RenderHandle,
    block_frames: usize,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let device_channels = output.device_channels.max(1);
    let mut scratch: Vec<f32> = vec![0.0; block_frames * CHANNELS];

    let stream = output.device.build_output_stream(
        &output.config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / device_channels;
            if scratch.len() < frames * CHANNELS {
                // Only if the host ignores the fixed block size.
                scratch.resize(frames * CHANNELS, 0.0);
            }
            let stereo = &mut scratch[..frames * CHANNELS];
            handle.render(stereo);

            for (frame, lr) in data.chunks_mut(device_channels).zip(stereo.chunks_exact(CHANNELS)) {
                match frame.len() {
                    1 => frame[0] = T::from_sample((lr[0] + lr[1]) * 0.5),
                    _ => {
                        frame[0] = T::from_sample(lr[0]);
                        frame[1] = T::from_sample(lr[1]);
                        for s in frame.iter_mut().skip(CHANNELS) {
                            *s = T::from_sample(0.0f32);
                        }
                    }
                }
            }
        },
        |err| tracing::warn!("output stream error: {err}"),
        None,
    )?;
    Ok(stream)
}
