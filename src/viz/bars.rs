// src/viz/bars.rs

use super::{BLOCKS, FULL_BLOCK, Visualizer, block_for, resample_levels};

const GAP: usize = 1;

/// Vertical frequency bars, one column group per band.
pub struct BarsVisualizer {
    bars: usize,
    bands: Vec<f32>,
}

impl BarsVisualizer {
    pub fn new(bars: usize) -> Self {
        Self {
            bars: bars.max(1),
            bands: Vec::new(),
        }
    }
}

impl Visualizer for BarsVisualizer {
    fn update(&mut self, _rms: f32, bands: &[f32]) {
        self.bands.clear();
        self.bands.extend_from_slice(bands);
    }

    fn render(&self, width: usize, height: usize) -> Vec<String> {
        if height == 0 {
            return Vec::new();
        }
        if self.bands.is_empty() || width == 0 {
            return vec![" ".repeat(width)];
        }

        // Drop bars rather than overflow a narrow terminal.
        let bars = self.bars.min(width.div_ceil(GAP + 1));
        let bar_width = ((width + GAP - bars * GAP) / bars).max(1);
        let levels = resample_levels(&self.bands, bars);
        let step = 1.0 / height as f32;

        (0..height)
            .map(|row| {
                let threshold = 1.0 - row as f32 * step;
                let mut line = String::with_capacity(bars * (bar_width + GAP) * 3);
                for (i, &level) in levels.iter().enumerate() {
                    let cell = if level >= threshold {
                        FULL_BLOCK
                    } else if level >= threshold - step {
                        // Partial top of the bar.
                        let fill = (level - threshold + step) * height as f32;
                        let idx = (fill * (BLOCKS.len() - 1) as f32) as usize;
                        BLOCKS[idx.min(BLOCKS.len() - 1)]
                    } else {
                        ' '
                    };
                    line.extend(std::iter::repeat_n(cell, bar_width));
                    if i + 1 < levels.len() {
                        line.extend(std::iter::repeat_n(' ', GAP));
                    }
                }
                line
            })
            .collect()
    }
}

/// One line of eighth-blocks, one character per band.
pub struct CompactBarsVisualizer {
    bars: usize,
    bands: Vec<f32>,
}

impl CompactBarsVisualizer {
    pub fn new(bars: usize) -> Self {
        Self {
            bars: bars.max(1),
            bands: Vec::new(),
        }
    }
}

impl Visualizer for CompactBarsVisualizer {
    fn update(&mut self, _rms: f32, bands: &[f32]) {
        self.bands.clear();
        self.bands.extend_from_slice(bands);
    }

    fn render(&self, width: usize, _height: usize) -> Vec<String> {
        let n = self.bars.min(width);
        if self.bands.is_empty() {
            return vec![" ".repeat(n)];
        }
        let line = resample_levels(&self.bands, n)
            .into_iter()
            .map(block_for)
            .collect();
        vec![line]
    }
}
