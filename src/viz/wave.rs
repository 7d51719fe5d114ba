// src/viz/wave.rs

use std::collections::VecDeque;

use super::{BLOCKS, FULL_BLOCK, Visualizer, block_for};

/// Columns of RMS history kept; wider terminals show leading silence.
const HISTORY: usize = 512;
const PHASE_STEP: f32 = 0.1;
const COLUMN_PHASE: f32 = 0.15;
/// Height of the soft edge above each column, as a fraction of full scale.
const EDGE: f32 = 0.15;

fn history() -> VecDeque<f32> {
    VecDeque::from(vec![0.0; HISTORY])
}

/// Newest `width` entries, left-padded with silence.
fn tail(history: &VecDeque<f32>, width: usize) -> impl Iterator<Item = f32> + '_ {
    let pad = width.saturating_sub(history.len());
    let skip = history.len().saturating_sub(width);
    std::iter::repeat_n(0.0, pad).chain(history.iter().skip(skip).copied())
}

fn push(history: &mut VecDeque<f32>, rms: f32) {
    if history.len() == HISTORY {
        history.pop_front();
    }
    history.push_back(rms);
}

/// Scrolling multi-row wave: RMS history modulated by a travelling sine.
pub struct WaveVisualizer {
    history: VecDeque<f32>,
    phase: f32,
}

impl WaveVisualizer {
    pub fn new() -> Self {
        Self {
            history: history(),
            phase: 0.0,
        }
    }
}

impl Default for WaveVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for WaveVisualizer {
    fn update(&mut self, rms: f32, _bands: &[f32]) {
        push(&mut self.history, rms);
        self.phase += PHASE_STEP;
    }

    fn render(&self, width: usize, height: usize) -> Vec<String> {
        let levels: Vec<f32> = tail(&self.history, width)
            .enumerate()
            .map(|(col, amp)| {
                let phase = self.phase + col as f32 * COLUMN_PHASE;
                amp * (0.3 + 0.7 * (0.5 + 0.5 * phase.sin()))
            })
            .collect();

        (0..height)
            .map(|row| {
                let threshold = if height > 1 {
                    1.0 - row as f32 / (height - 1) as f32
                } else {
                    0.5
                };
                levels
                    .iter()
                    .map(|&level| {
                        if level >= threshold {
                            FULL_BLOCK
                        } else if level >= threshold - EDGE {
                            let partial = (level - (threshold - EDGE)) / EDGE;
                            let idx = (partial * (BLOCKS.len() - 1) as f32) as usize;
                            BLOCKS[idx.min(BLOCKS.len() - 1)]
                        } else {
                            ' '
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Single-line RMS history.
pub struct SimpleWaveVisualizer {
    history: VecDeque<f32>,
}

impl SimpleWaveVisualizer {
    pub fn new() -> Self {
        Self { history: history() }
    }
}

impl Default for SimpleWaveVisualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizer for SimpleWaveVisualizer {
    fn update(&mut self, rms: f32, _bands: &[f32]) {
        push(&mut self.history, rms);
    }

    fn render(&self, width: usize, _height: usize) -> Vec<String> {
        vec![tail(&self.history, width).map(block_for).collect()]
    }
}
