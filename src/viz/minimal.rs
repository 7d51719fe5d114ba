// src/viz/minimal.rs

use super::Visualizer;

const SHADES: [char; 4] = ['░', '▒', '▓', '█'];

/// Symmetric single-line level meter driven by RMS.
#[derive(Default)]
pub struct MinimalVisualizer {
    rms: f32,
}

impl MinimalVisualizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Visualizer for MinimalVisualizer {
    fn update(&mut self, rms: f32, _bands: &[f32]) {
        self.rms = rms;
    }

    fn render(&self, width: usize, _height: usize) -> Vec<String> {
        let half = width / 2;
        let level = (self.rms.clamp(0.0, 1.0) * half as f32) as usize;

        // Left half, filling from the centre outward.
        let left: Vec<char> = (0..half)
            .map(|i| {
                let from_centre = half - i - 1;
                if from_centre < level {
                    let intensity = (level - from_centre) as f32 / level.max(1) as f32;
                    let idx = (intensity * (SHADES.len() - 1) as f32) as usize;
                    SHADES[idx.min(SHADES.len() - 1)]
                } else {
                    SHADES[0]
                }
            })
            .collect();

        let line = left.iter().chain(left.iter().rev()).collect();
        vec![line]
    }
}

/// Renders nothing.
pub struct NoVisualizer;

impl Visualizer for NoVisualizer {
    fn update(&mut self, _rms: f32, _bands: &[f32]) {}

    fn render(&self, _width: usize, _height: usize) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_meter_is_all_light_shade() {
        let viz = MinimalVisualizer::new();
        assert_eq!(viz.render(8, 1), vec!["░░░░░░░░"]);
    }

    #[test]
    fn full_meter_is_mirrored() {
        let mut viz = MinimalVisualizer::new();
        viz.update(1.0, &[]);
        let line = &viz.render(8, 1)[0];
        assert_eq!(line, "░▒▓██▓▒░");
    }

    #[test]
    fn odd_width_drops_the_middle_column() {
        let mut viz = MinimalVisualizer::new();
        viz.update(0.5, &[]);
        assert_eq!(viz.render(9, 1)[0].chars().count(), 8);
    }

    #[test]
    fn none_renders_nothing() {
        let mut viz = NoVisualizer;
        viz.update(1.0, &[1.0]);
        assert!(viz.render(80, 10).is_empty());
    }
}
