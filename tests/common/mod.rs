#![allow(dead_code)]

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Write a 16-bit PCM WAV; `sample(frame, channel)` supplies each value.
pub fn write_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    frames: usize,
    sample: impl Fn(usize, usize) -> i16,
) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for f in 0..frames {
        for ch in 0..channels as usize {
            writer.write_sample(sample(f, ch)).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Constant-level stereo file.
pub fn constant_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    frames: usize,
    value: i16,
) -> PathBuf {
    write_wav(dir, name, sample_rate, 2, frames, |_, _| value)
}

/// Stereo ramp: left counts up, right is its negation.
pub fn ramp_value(frame: usize, channel: usize) -> i16 {
    let v = (frame % 30_000) as i16;
    if channel == 0 { v } else { -v }
}

pub fn pcm_to_f32(v: i16) -> f32 {
    v as f32 / 32_768.0
}
