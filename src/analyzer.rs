// src/analyzer.rs

use std::f32::consts::PI;

use rustfft::{FftPlanner, num_complex::Complex};

/// Shortest FFT input; shorter buffers are zero-padded up to this.
pub const MIN_FFT_SIZE: usize = 512;
const MIN_FREQ: f32 = 20.0;
const MAX_FREQ: f32 = 20_000.0;

/// Typical program RMS sits around 0.1-0.3; scale so it fills the meter.
const RMS_GAIN: f32 = 3.0;

const PEAK_ATTACK: f32 = 0.7;
const PEAK_DECAY: f32 = 0.05;
const BAND_ATTACK: f32 = 0.5;
const BAND_DECAY: f32 = 0.15;

/// Loudness, peak and log-spaced band levels for visualization.
///
/// Each value is smoothed across calls: RMS with a single coefficient, peak
/// and bands with a fast attack and a slow decay. Only the UI loop calls
/// this; nothing here is real-time safe.
pub struct SpectrumAnalyzer {
    smoothing: f32,
    last_rms: f32,
    last_peak: f32,
    last_bands: Option<Vec<f32>>,
    planner: FftPlanner<f32>,
    mono: Vec<f32>,
    fft_buf: Vec<Complex<f32>>,
    window: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 1.0),
            last_rms: 0.0,
            last_peak: 0.0,
            last_bands: None,
            planner: FftPlanner::new(),
            mono: Vec::new(),
            fft_buf: Vec::new(),
            window: Vec::new(),
        }
    }

    /// Smoothed, normalized RMS of `buffer` (interleaved, `channels` wide).
    pub fn rms(&mut self, buffer: &[f32], channels: usize) -> f32 {
        downmix_into(buffer, channels, &mut self.mono);
        if self.mono.is_empty() {
            return 0.0;
        }
        let mean_sq = self.mono.iter().map(|s| s * s).sum::<f32>() / self.mono.len() as f32;
        let level = (mean_sq.sqrt() * RMS_GAIN).min(1.0);

        self.last_rms = self.last_rms * self.smoothing + level * (1.0 - self.smoothing);
        self.last_rms
    }

    pub fn peak(&mut self, buffer: &[f32], channels: usize) -> f32 {
        downmix_into(buffer, channels, &mut self.mono);
        if self.mono.is_empty() {
            return 0.0;
        }
        let peak = self.mono.iter().fold(0.0f32, |m, s| m.max(s.abs()));

        self.last_peak = if peak > self.last_peak {
            approach(self.last_peak, peak, PEAK_ATTACK)
        } else {
            approach(self.last_peak, peak, PEAK_DECAY)
        };
        self.last_peak
    }

    /// `band_count` smoothed band levels in [0, 1], log-spaced from 20 Hz to
    /// `min(20 kHz, sample_rate / 2)`. The result always has `band_count`
    /// entries; an empty buffer yields zeros.
    pub fn bands(
        &mut self,
        buffer: &[f32],
        channels: usize,
        band_count: usize,
        sample_rate: u32,
    ) -> Vec<f32> {
        downmix_into(buffer, channels, &mut self.mono);
        if self.mono.is_empty() || band_count == 0 {
            return vec![0.0; band_count];
        }
        let n = self.mono.len().max(MIN_FFT_SIZE);
        self.mono.resize(n, 0.0);

        let magnitudes = self.magnitudes(n);
        let bin_hz = sample_rate as f32 / n as f32;
        let mut levels = band_levels(&magnitudes, band_count, bin_hz, sample_rate);

        let max = levels.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in levels.iter_mut() {
                *v /= max;
            }
        }

        match self.last_bands.as_mut() {
            Some(prev) if prev.len() == band_count => {
                for (p, &new) in prev.iter_mut().zip(&levels) {
                    let weight = if new > *p { BAND_ATTACK } else { BAND_DECAY };
                    *p = approach(*p, new, weight);
                }
                prev.clone()
            }
            // First call, or the band count changed: seed from this frame.
            _ => {
                self.last_bands = Some(levels.clone());
                levels
            }
        }
    }

    /// Windowed magnitude spectrum of `self.mono[..n]`, bins 0..=n/2.
    fn magnitudes(&mut self, n: usize) -> Vec<f32> {
        if self.window.len() != n {
            self.window = hann(n);
        }
        self.fft_buf.clear();
        self.fft_buf.extend(
            self.mono[..n]
                .iter()
                .zip(&self.window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0)),
        );

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut self.fft_buf);

        self.fft_buf[..=n / 2].iter().map(|c| c.norm()).collect()
    }

    pub fn reset(&mut self) {
        self.last_rms = 0.0;
        self.last_peak = 0.0;
        self.last_bands = None;
    }

    pub fn last_rms(&self) -> f32 {
        self.last_rms
    }

    pub fn last_peak(&self) -> f32 {
        self.last_peak
    }

    pub fn last_bands(&self) -> Option<&[f32]> {
        self.last_bands.as_deref()
    }
}

/// Move `prev` toward `target` by `weight`.
fn approach(prev: f32, target: f32, weight: f32) -> f32 {
    prev * (1.0 - weight) + target * weight
}

fn downmix_into(buffer: &[f32], channels: usize, mono: &mut Vec<f32>) {
    mono.clear();
    let channels = channels.max(1);
    mono.extend(
        buffer
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Symmetric Hann window (endpoints at zero).
fn hann(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}

fn band_levels(magnitudes: &[f32], band_count: usize, bin_hz: f32, sample_rate: u32) -> Vec<f32> {
    let max_freq = MAX_FREQ.min(sample_rate as f32 / 2.0);
    let lo = MIN_FREQ.log10();
    let hi = max_freq.log10();
    let edge = |i: usize| 10f32.powf(lo + (hi - lo) * i as f32 / band_count as f32);

    (0..band_count)
        .map(|i| {
            let low = (edge(i) / bin_hz) as usize;
            let high = ((edge(i + 1) / bin_hz) as usize).max(low + 1);
            if high <= magnitudes.len() {
                magnitudes[low..high].iter().sum::<f32>() / (high - low) as f32
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44_100;

    fn sine_stereo(freq: f32, frames: usize, amp: f32) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = amp * (2.0 * PI * freq * i as f32 / SR as f32).sin();
                [s, s]
            })
            .collect()
    }

    #[test]
    fn silence_has_zero_rms_every_time() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let silence = vec![0.0f32; 4096 * 2];
        for _ in 0..5 {
            assert_eq!(a.rms(&silence, 2), 0.0);
        }
    }

    #[test]
    fn empty_input_leaves_state_alone() {
        let mut a = SpectrumAnalyzer::new(0.8);
        a.rms(&[0.2; 64], 2);
        let before = a.last_rms();
        assert_eq!(a.rms(&[], 2), 0.0);
        assert_eq!(a.peak(&[], 2), 0.0);
        assert_eq!(a.last_rms(), before);
        assert_eq!(a.bands(&[], 2, 16, SR), vec![0.0; 16]);
    }

    #[test]
    fn rms_is_scaled_clamped_and_smoothed() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let first = a.rms(&[0.1; 512], 2);
        assert!((first - 0.06).abs() < 1e-6);

        let mut loud = SpectrumAnalyzer::new(0.0);
        assert_eq!(loud.rms(&[0.9; 512], 2), 1.0);
    }

    #[test]
    fn peak_attacks_fast_and_decays_slowly() {
        let mut a = SpectrumAnalyzer::new(0.8);
        assert!((a.peak(&[0.5; 64], 2) - 0.35).abs() < 1e-6);
        assert!((a.peak(&[0.5; 64], 2) - 0.455).abs() < 1e-6);
        assert!((a.peak(&[0.0; 64], 2) - 0.43225).abs() < 1e-6);
    }

    #[test]
    fn bands_have_fixed_length_and_range() {
        let mut a = SpectrumAnalyzer::new(0.8);
        for frames in [1, 100, 512, 4096] {
            for band_count in [1, 8, 16, 32] {
                let buf = sine_stereo(440.0, frames, 0.7);
                let bands = a.bands(&buf, 2, band_count, SR);
                assert_eq!(bands.len(), band_count);
                assert!(bands.iter().all(|&b| (0.0..=1.0).contains(&b)), "{bands:?}");
            }
        }
    }

    #[test]
    fn sine_lands_in_its_band() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let bands = a.bands(&sine_stereo(1000.0, 4096, 0.5), 2, 16, SR);
        let loudest = bands
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(i, _)| i)
            .unwrap();
        // Edges are 20 * 1000^(i/16) Hz; 1 kHz falls in band 9.
        assert_eq!(loudest, 9);
        assert_eq!(bands[9], 1.0);
    }

    #[test]
    fn smoothing_converges_without_overshoot() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let buf = [0.2f32; 1024];
        // Unsmoothed instantaneous values.
        let target_rms = SpectrumAnalyzer::new(0.0).rms(&buf, 2);
        let target_peak = 0.2;
        let mut prev_rms = a.rms(&buf, 2);
        let mut prev_peak = a.peak(&buf, 2);
        for _ in 0..50 {
            let rms = a.rms(&buf, 2);
            let peak = a.peak(&buf, 2);
            assert!((target_rms - rms).abs() <= (target_rms - prev_rms).abs() + 1e-6);
            assert!(rms <= target_rms + 1e-6);
            assert!((target_peak - peak).abs() <= (target_peak - prev_peak).abs() + 1e-6);
            assert!(peak <= target_peak + 1e-6);
            prev_rms = rms;
            prev_peak = peak;
        }
    }

    #[test]
    fn bands_decay_toward_new_input() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let low = sine_stereo(100.0, 2048, 0.5);
        let high = sine_stereo(5000.0, 2048, 0.5);
        let seeded = a.bands(&low, 2, 16, SR);
        let target = {
            let mut fresh = SpectrumAnalyzer::new(0.8);
            fresh.bands(&high, 2, 16, SR)
        };

        let mut prev = seeded;
        for _ in 0..20 {
            let next = a.bands(&high, 2, 16, SR);
            for i in 0..16 {
                assert!((target[i] - next[i]).abs() <= (target[i] - prev[i]).abs() + 1e-6);
            }
            prev = next;
        }
    }

    #[test]
    fn reset_clears_smoothed_state() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let buf = sine_stereo(440.0, 1024, 0.8);
        a.rms(&buf, 2);
        a.peak(&buf, 2);
        a.bands(&buf, 2, 16, SR);
        a.reset();
        assert_eq!(a.last_rms(), 0.0);
        assert_eq!(a.last_peak(), 0.0);
        assert!(a.last_bands().is_none());
    }

    #[test]
    fn changing_band_count_reseeds() {
        let mut a = SpectrumAnalyzer::new(0.8);
        let buf = sine_stereo(440.0, 1024, 0.8);
        a.bands(&buf, 2, 16, SR);
        let wide = a.bands(&buf, 2, 32, SR);
        assert_eq!(wide.len(), 32);
        assert_eq!(a.last_bands().map(|b| b.len()), Some(32));
    }

    #[test]
    fn hann_matches_symmetric_definition() {
        let w = hann(5);
        assert_eq!(w[0], 0.0);
        assert!((w[2] - 1.0).abs() < 1e-6);
        assert!((w[1] - 0.5).abs() < 1e-6);
    }
}
