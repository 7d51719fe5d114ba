// src/lib.rs

pub mod analyzer;
pub mod audio;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mixer;
mod player;
pub mod snapshot;
pub mod source;
pub mod track;
pub mod viz;

pub use analyzer::SpectrumAnalyzer;
pub use config::EngineConfig;
pub use decoder::{ResampleQuality, StreamCursor, StreamingSource};
pub use error::{ConfigError, EngineError};
pub use mixer::Mixer;
pub use player::{Analysis, Player};
pub use source::{BufferQueue, BufferedSource, FrameSource};
pub use track::Track;
pub use viz::{Visualizer, VisualizerKind};
