// src/config.rs

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decoder::resample::ResampleQuality;
use crate::error::ConfigError;
use crate::viz::VisualizerKind;

/// Output is always interleaved stereo f32.
pub const CHANNELS: usize = 2;

pub const SAMPLE_RATE: u32 = 44_100;
/// Frames per device callback. Large on purpose, stability over latency.
pub const BLOCK_SIZE: u32 = 4096;
pub const DEFAULT_VOLUME: f32 = 0.8;
pub const VOLUME_STEP: f32 = 0.05;
pub const CHUNK_SECONDS: f64 = 10.0;
pub const BAND_COUNT: usize = 16;
pub const RMS_SMOOTHING: f32 = 0.8;
pub const VIZ_FPS: u32 = 15;
pub const RING_SECONDS: f64 = 2.0;
pub const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: u32,
    pub default_volume: f32,
    pub volume_step: f32,
    pub chunk_seconds: f64,
    pub band_count: usize,
    pub rms_smoothing: f32,
    pub viz_fps: u32,
    /// Length of the producer ring between the decode thread and the callback.
    pub ring_seconds: f64,
    /// Bound of the legacy buffered-source queue.
    pub queue_depth: usize,
    pub resample_quality: ResampleQuality,
    pub visualizer: VisualizerKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            block_size: BLOCK_SIZE,
            default_volume: DEFAULT_VOLUME,
            volume_step: VOLUME_STEP,
            chunk_seconds: CHUNK_SECONDS,
            band_count: BAND_COUNT,
            rms_smoothing: RMS_SMOOTHING,
            viz_fps: VIZ_FPS,
            ring_seconds: RING_SECONDS,
            queue_depth: QUEUE_DEPTH,
            resample_quality: ResampleQuality::default(),
            visualizer: VisualizerKind::default(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config. Missing fields fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid { field, reason: reason.into() }
        }

        if self.sample_rate < 8_000 {
            return Err(invalid("sample_rate", format!("{} Hz is below 8000", self.sample_rate)));
        }
        if self.block_size == 0 {
            return Err(invalid("block_size", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(invalid("default_volume", "must be within [0, 1]"));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(invalid("volume_step", "must be within (0, 1]"));
        }
        if !(self.chunk_seconds > 0.0 && self.chunk_seconds.is_finite()) {
            return Err(invalid("chunk_seconds", "must be a positive number"));
        }
        if self.band_count == 0 {
            return Err(invalid("band_count", "must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.rms_smoothing) {
            return Err(invalid("rms_smoothing", "must be within [0, 1)"));
        }
        if self.viz_fps == 0 {
            return Err(invalid("viz_fps", "must be non-zero"));
        }
        if !(self.ring_seconds > 0.0 && self.ring_seconds.is_finite()) {
            return Err(invalid("ring_seconds", "must be a positive number"));
        }
        if self.queue_depth == 0 {
            return Err(invalid("queue_depth", "must be non-zero"));
        }
        Ok(())
    }

    /// Capacity of the producer ring, in interleaved samples.
    pub fn ring_capacity(&self) -> usize {
        let frames = (self.sample_rate as f64 * self.ring_seconds).round() as usize;
        frames.max(self.block_size as usize * 2) * CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.band_count, 16);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "band_count": 32, "visualizer": "wave" }"#).unwrap();
        assert_eq!(config.band_count, 32);
        assert_eq!(config.visualizer, VisualizerKind::Wave);
        assert_eq!(config.block_size, BLOCK_SIZE);
        assert_eq!(config.resample_quality, ResampleQuality::Linear);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = EngineConfig::from_json_str(r#"{ "rms_smoothing": 1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "rms_smoothing", .. }));

        let err = EngineConfig::from_json_str(r#"{ "band_count": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "band_count", .. }));

        let err = EngineConfig::from_json_str(r#"{ "chunk_seconds": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "chunk_seconds", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = EngineConfig::from_json_str("{ band_count: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn ring_holds_at_least_two_blocks() {
        let config = EngineConfig { ring_seconds: 0.001, ..EngineConfig::default() };
        assert_eq!(config.ring_capacity(), BLOCK_SIZE as usize * 2 * CHANNELS);
    }
}
