// src/viz/mod.rs

//! Text visualizers fed from the analyzer.
//!
//! Each visualizer takes `(rms, bands)` once per UI frame and renders plain
//! lines of block characters; colouring and layout belong to the caller.

mod bars;
mod minimal;
mod wave;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use bars::{BarsVisualizer, CompactBarsVisualizer};
pub use minimal::{MinimalVisualizer, NoVisualizer};
pub use wave::{SimpleWaveVisualizer, WaveVisualizer};

/// Eighth-height blocks, empty to full.
pub(crate) const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
pub(crate) const FULL_BLOCK: char = '█';

pub trait Visualizer {
    fn update(&mut self, rms: f32, bands: &[f32]);

    /// Render into at most `height` lines of `width` columns.
    fn render(&self, width: usize, height: usize) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualizerKind {
    #[default]
    Bars,
    BarsCompact,
    Wave,
    WaveSimple,
    Minimal,
    None,
}

impl VisualizerKind {
    pub const ALL: [VisualizerKind; 6] = [
        VisualizerKind::Bars,
        VisualizerKind::BarsCompact,
        VisualizerKind::Wave,
        VisualizerKind::WaveSimple,
        VisualizerKind::Minimal,
        VisualizerKind::None,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VisualizerKind::Bars => "bars",
            VisualizerKind::BarsCompact => "bars-compact",
            VisualizerKind::Wave => "wave",
            VisualizerKind::WaveSimple => "wave-simple",
            VisualizerKind::Minimal => "minimal",
            VisualizerKind::None => "none",
        }
    }

    /// Build the visualizer; `bars` sets the column count for the bar kinds.
    pub fn create(self, bars: usize) -> Box<dyn Visualizer> {
        match self {
            VisualizerKind::Bars => Box::new(BarsVisualizer::new(bars)),
            VisualizerKind::BarsCompact => Box::new(CompactBarsVisualizer::new(bars * 2)),
            VisualizerKind::Wave => Box::new(WaveVisualizer::new()),
            VisualizerKind::WaveSimple => Box::new(SimpleWaveVisualizer::new()),
            VisualizerKind::Minimal => Box::new(MinimalVisualizer::new()),
            VisualizerKind::None => Box::new(NoVisualizer),
        }
    }
}

impl fmt::Display for VisualizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown visualizer `{0}`")]
pub struct UnknownVisualizer(pub String);

impl FromStr for VisualizerKind {
    type Err = UnknownVisualizer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| UnknownVisualizer(s.to_string()))
    }
}

/// Linearly resample `levels` onto `n` evenly spaced points.
pub(crate) fn resample_levels(levels: &[f32], n: usize) -> Vec<f32> {
    match (levels.len(), n) {
        (_, 0) => Vec::new(),
        (0, _) => vec![0.0; n],
        (1, _) => vec![levels[0]; n],
        (len, _) if len == n => levels.to_vec(),
        (_, 1) => vec![levels[0]],
        (len, _) => {
            let step = (len - 1) as f32 / (n - 1) as f32;
            (0..n)
                .map(|i| {
                    let x = i as f32 * step;
                    let i0 = (x.floor() as usize).min(len - 1);
                    let i1 = (i0 + 1).min(len - 1);
                    let t = x - i0 as f32;
                    levels[i0] + (levels[i1] - levels[i0]) * t
                })
                .collect()
        }
    }
}

/// Index into `BLOCKS` for a 0..1 fraction.
pub(crate) fn block_for(fraction: f32) -> char {
    let idx = (fraction * (BLOCKS.len() - 1) as f32) as isize;
    BLOCKS[idx.clamp(0, BLOCKS.len() as isize - 1) as usize]
}
