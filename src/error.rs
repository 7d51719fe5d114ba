// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised outside the real-time path. Nothing in here ever crosses
/// into the output callback: faults there degrade to silence.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format: {0}")]
    Probe(#[source] symphonia::core::errors::Error),

    #[error("no decodable audio track in {}", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("audio track in {} has no sample rate", .0.display())]
    MissingSampleRate(PathBuf),

    #[error("cannot create decoder: {0}")]
    Codec(#[source] symphonia::core::errors::Error),

    #[error("cannot create resampler: {0}")]
    Resampler(#[from] rubato::ResamplerConstructionError),

    #[error("no output device available")]
    NoOutputDevice,

    #[error("output device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("cannot build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("cannot start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported device sample format: {0:?}")]
    SampleFormat(cpal::SampleFormat),

    #[error("cannot spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
