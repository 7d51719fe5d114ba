// src/decoder/resample.rs

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    calculate_cutoff,
};
use serde::{Deserialize, Serialize};

use crate::config::CHANNELS;
use crate::decoder::dsp;
use crate::error::Result;

/// How chunks are converted from the source rate to the output rate.
///
/// `Linear` interpolates each chunk independently, sizing chunks so the
/// running output total is always `round(frames_in * ratio)`. `Sinc` runs a
/// band-limited rubato resampler that carries state across chunks; it costs
/// more CPU per refill and its chunk lengths vary by a few frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    #[default]
    Linear,
    Sinc,
}

pub enum ChunkResampler {
    Passthrough,
    Linear {
        ratio: f64,
        fed: u64,
        emitted: u64,
    },
    Sinc {
        inner: Box<SincFixedIn<f32>>,
        stage: Vec<Vec<f32>>,
        ratio: f64,
        /// Leading output frames still to drop to cancel the filter delay.
        delay: usize,
        fed: u64,
        emitted: u64,
    },
}

impl ChunkResampler {
    pub fn new(src_rate: u32, dst_rate: u32, quality: ResampleQuality) -> Result<Self> {
        if src_rate == dst_rate {
            return Ok(Self::Passthrough);
        }
        let ratio = dst_rate as f64 / src_rate as f64;
        Ok(match quality {
            ResampleQuality::Linear => Self::Linear {
                ratio,
                fed: 0,
                emitted: 0,
            },
            ResampleQuality::Sinc => {
                let inner = build_sinc(ratio)?;
                let delay = inner.output_delay();
                Self::Sinc {
                    inner: Box::new(inner),
                    stage: vec![Vec::with_capacity(SINC_CHUNK * 2); CHANNELS],
                    ratio,
                    delay,
                    fed: 0,
                    emitted: 0,
                }
            }
        })
    }

    /// Resample one chunk of interleaved stereo. `last` flushes any frames
    /// the resampler is still holding back.
    pub fn process(&mut self, input: &[f32], last: bool) -> Vec<f32> {
        match self {
            Self::Passthrough => input.to_vec(),
            Self::Linear { ratio, fed, emitted } => {
                // Round the running total, not each chunk, so the error never builds up.
                *fed += (input.len() / CHANNELS) as u64;
                let expected = (*fed as f64 * *ratio).round() as u64;
                let target = expected.saturating_sub(*emitted) as usize;
                let out = linear_resample(input, CHANNELS, target);
                *emitted += (out.len() / CHANNELS) as u64;
                out
            }
            Self::Sinc { inner, stage, ratio, delay, fed, emitted } => {
                *fed += (input.len() / CHANNELS) as u64;
                let mut out = Vec::with_capacity(input.len() * 2);
                dsp::deinterleave_into(input, stage);
                while let Some(block) = try_process_exact(inner, stage) {
                    dsp::interleave_into(&block, &mut out);
                }
                if last {
                    flush(inner, stage, &mut out);
                }

                if *delay > 0 {
                    let skip = (*delay).min(out.len() / CHANNELS);
                    out.drain(..skip * CHANNELS);
                    *delay -= skip;
                }
                if last {
                    // Zero padding in the flush overshoots; cut back to the exact length.
                    let expected = (*fed as f64 * *ratio).round() as u64;
                    let allowed = expected.saturating_sub(*emitted) as usize;
                    out.truncate(allowed * CHANNELS);
                }
                *emitted += (out.len() / CHANNELS) as u64;
                out
            }
        }
    }
}

const SINC_CHUNK: usize = 1024;

fn build_sinc(ratio: f64) -> Result<SincFixedIn<f32>> {
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    Ok(SincFixedIn::<f32>::new(ratio, 2.0, params, SINC_CHUNK, CHANNELS)?)
}

fn try_process_exact(
    resampler: &mut SincFixedIn<f32>,
    stage: &mut [Vec<f32>],
) -> Option<Vec<Vec<f32>>> {
    let need = resampler.input_frames_next();
    if dsp::planar_len(stage) < need {
        return None;
    }
    let block = dsp::take_from_planar(stage, need);
    resampler.process(&block, None).ok()
}

fn flush(resampler: &mut SincFixedIn<f32>, stage: &mut [Vec<f32>], out: &mut Vec<f32>) {
    let have = dsp::planar_len(stage);
    if have > 0 {
        let tail = dsp::take_from_planar(stage, have);
        if let Ok(block) = resampler.process_partial(Some(tail.as_slice()), None) {
            dsp::interleave_into(&block, out);
        }
    }
    if let Ok(block) = resampler.process_partial::<Vec<f32>>(None, None) {
        dsp::interleave_into(&block, out);
    }
}

/// Per-channel linear interpolation onto `target_frames` frames. The first
/// and last input frames map exactly onto the first and last output frames.
pub fn linear_resample(input: &[f32], channels: usize, target_frames: usize) -> Vec<f32> {
    let frames = input.len() / channels;
    if frames == 0 || target_frames == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(target_frames * channels);
    if frames == 1 || target_frames == 1 {
        for _ in 0..target_frames {
            out.extend_from_slice(&input[..channels]);
        }
        return out;
    }

    let span = (frames - 1) as f64;
    let steps = (target_frames - 1) as f64;
    for i in 0..target_frames {
        let x = i as f64 * span / steps;
        let i0 = (x.floor() as usize).min(frames - 1);
        let i1 = (i0 + 1).min(frames - 1);
        let t = (x - i0 as f64) as f32;
        for ch in 0..channels {
            let a = input[i0 * channels + ch];
            let b = input[i1 * channels + ch];
            out.push(a + (b - a) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_hits_endpoints_and_midpoints() {
        // 3 stereo frames, left ramps 0..1, right ramps 1..0.
        let input = [0.0, 1.0, 0.5, 0.5, 1.0, 0.0];
        let out = linear_resample(&input, 2, 5);
        assert_eq!(out.len(), 10);
        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[9], 0.0);
    }

    #[test]
    fn linear_downsample_keeps_length() {
        let input: Vec<f32> = (0..200).map(|i| i as f32).collect();
        let out = linear_resample(&input, 2, 50);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[98], 198.0);
    }

    #[test]
    fn linear_chunk_length_follows_ratio() {
        let mut r = ChunkResampler::new(22_050, 44_100, ResampleQuality::Linear).unwrap();
        let out = r.process(&vec![0.25; 1000 * 2], false);
        assert_eq!(out.len(), 2000 * 2);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn linear_chunks_sum_to_the_rounded_total() {
        // 5904 * 0.91875 = 5424.3 per chunk; rounding each chunk alone loses frames.
        let mut r = ChunkResampler::new(48_000, 44_100, ResampleQuality::Linear).unwrap();
        let mut total = 0;
        for _ in 0..81 {
            total += r.process(&vec![0.1f32; 5904 * 2], false).len() / 2;
        }
        total += r.process(&vec![0.1f32; 1776 * 2], true).len() / 2;
        assert_eq!(total, 441_000);
    }

    #[test]
    fn equal_rates_pass_through() {
        let mut r = ChunkResampler::new(48_000, 48_000, ResampleQuality::Sinc).unwrap();
        assert!(matches!(r, ChunkResampler::Passthrough));
        assert_eq!(r.process(&[0.1, 0.2], true), vec![0.1, 0.2]);
    }

    #[test]
    fn sinc_flush_trims_to_exact_length() {
        let mut r = ChunkResampler::new(48_000, 44_100, ResampleQuality::Sinc).unwrap();
        let mut total = r.process(&vec![0.0f32; 2400 * 2], false).len();
        total += r.process(&vec![0.0f32; 2400 * 2], true).len();
        assert_eq!(total, 4410 * 2);
    }
}
