// src/player.rs

use std::path::Path;
use std::time::Duration;

use crate::analyzer::SpectrumAnalyzer;
use crate::config::{CHANNELS, EngineConfig};
use crate::decoder::StreamingSource;
use crate::error::Result;
use crate::mixer::Mixer;
use crate::track::Track;

/// One UI frame's worth of analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub rms: f32,
    pub peak: f32,
    pub bands: Vec<f32>,
}

/// Transport plus analysis: what a UI loop drives.
///
/// Owns the mixer (and through it the device stream) and the analyzer. All
/// methods are called from the control thread; only the mixer's render path
/// runs on the audio thread.
pub struct Player {
    mixer: Mixer,
    analyzer: SpectrumAnalyzer,
    config: EngineConfig,
    scratch: Vec<f32>,
    current: Option<Track>,
}

impl Player {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            mixer: Mixer::new(&config),
            analyzer: SpectrumAnalyzer::new(config.rms_smoothing),
            scratch: Vec::with_capacity(config.block_size as usize * CHANNELS),
            current: None,
            config,
        }
    }

    // --- Transport ---

    pub fn start(&mut self) -> Result<()> {
        self.mixer.start()
    }

    pub fn stop(&mut self) {
        self.mixer.stop();
        self.current = None;
    }

    pub fn pause(&self) {
        self.mixer.pause();
    }

    pub fn resume(&self) {
        self.mixer.resume();
    }

    /// Returns true if now playing.
    pub fn toggle_pause(&self) -> bool {
        self.mixer.toggle_pause()
    }

    pub fn is_playing(&self) -> bool {
        self.mixer.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.mixer.is_paused()
    }

    // --- Sources ---

    /// Open `path` for streaming playback, replacing whatever was playing.
    /// On failure the current source keeps playing.
    pub fn set_streaming_source(&mut self, path: &Path) -> Result<()> {
        let source = StreamingSource::open(path, &self.config)?;
        self.mixer.set_source(Some(Box::new(source)));
        self.analyzer.reset();
        self.current = None;
        Ok(())
    }

    pub fn play_track(&mut self, track: &Track) -> Result<()> {
        self.set_streaming_source(&track.path)?;
        tracing::info!(name = %track.name, id = %track.id, "now playing");
        self.current = Some(track.clone());
        Ok(())
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Play an in-memory buffer (`channels` interleaved) from its start.
    pub fn set_audio(&mut self, samples: &[f32], channels: usize) {
        self.mixer.set_audio(samples, channels);
        self.current = None;
    }

    /// Queue a buffer behind the in-memory source. False if it was dropped.
    pub fn queue_audio(&self, samples: &[f32], channels: usize) -> bool {
        self.mixer.queue_audio(samples, channels)
    }

    // --- Volume ---

    pub fn volume(&self) -> f32 {
        self.mixer.volume()
    }

    pub fn set_volume(&self, level: f32) {
        self.mixer.set_volume(level);
    }

    pub fn volume_up(&self) -> f32 {
        self.mixer.volume_up()
    }

    pub fn volume_down(&self) -> f32 {
        self.mixer.volume_down()
    }

    // --- Position ---

    pub fn position(&self) -> Duration {
        self.mixer.position()
    }

    pub fn duration(&self) -> Duration {
        self.mixer.duration()
    }

    pub fn progress(&self) -> f64 {
        self.mixer.progress()
    }

    pub fn is_stream_finished(&self) -> bool {
        self.mixer.is_stream_finished()
    }

    // --- Analysis ---

    /// Smoothed RMS and band levels of the last rendered block. Before the
    /// first block this is silence.
    pub fn get_analysis(&mut self) -> (f32, Vec<f32>) {
        if !self.mixer.snapshot_into(&mut self.scratch) {
            return (0.0, vec![0.0; self.config.band_count]);
        }
        let rms = self.analyzer.rms(&self.scratch, CHANNELS);
        self.analyzer.peak(&self.scratch, CHANNELS);
        let bands = self.analyzer.bands(
            &self.scratch,
            CHANNELS,
            self.config.band_count,
            self.config.sample_rate,
        );
        (rms, bands)
    }

    /// Smoothed peak as of the last `get_analysis`.
    pub fn peak(&self) -> f32 {
        self.analyzer.last_peak()
    }

    pub fn analysis(&mut self) -> Analysis {
        let (rms, bands) = self.get_analysis();
        Analysis {
            rms,
            peak: self.peak(),
            bands,
        }
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_before_any_block_is_silence() {
        let mut p = Player::new(EngineConfig::default());
        let (rms, bands) = p.get_analysis();
        assert_eq!(rms, 0.0);
        assert_eq!(bands, vec![0.0; 16]);
        assert_eq!(p.peak(), 0.0);
    }

    #[test]
    fn analysis_follows_rendered_audio() {
        let mut p = Player::new(EngineConfig::default());
        p.set_volume(1.0);
        p.set_audio(&[0.3; 4096 * 2], 2);
        let mut out = vec![0.0f32; 1024 * 2];
        p.mixer().render(&mut out);

        let a = p.analysis();
        assert!(a.rms > 0.0);
        assert!(a.peak > 0.0);
        assert_eq!(a.bands.len(), 16);
        assert!(a.bands.iter().all(|&b| (0.0..=1.0).contains(&b)));
    }

    #[test]
    fn failed_open_keeps_the_current_source() {
        let mut p = Player::new(EngineConfig::default());
        p.set_audio(&[0.1; 64], 2);
        let err = p.set_streaming_source(Path::new("/definitely/not/here.wav"));
        assert!(err.is_err());
        let mut out = vec![0.0f32; 8];
        p.mixer().render(&mut out);
        assert!(out.iter().all(|&s| s != 0.0));
    }
}
