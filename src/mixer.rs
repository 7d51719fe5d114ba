// src/mixer.rs

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cpal::Stream;
use cpal::traits::StreamTrait;

use crate::audio;
use crate::config::{CHANNELS, EngineConfig};
use crate::error::Result;
use crate::source::{BufferQueue, BufferedSource, FrameSource};
use crate::snapshot::SnapshotBuffer;

type ActiveSource = Option<Box<dyn FrameSource>>;

/// State shared between the control side and the output callback.
struct PlaybackState {
    /// Guards the active source only; flags and volume are atomics.
    source: Mutex<ActiveSource>,
    paused: AtomicBool,
    playing: AtomicBool,
    volume: AtomicU32,
    last: SnapshotBuffer,
}

impl PlaybackState {
    fn lock_source(&self) -> MutexGuard<'_, ActiveSource> {
        self.source.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn render(&self, out: &mut [f32]) {
        if self.paused.load(Ordering::Acquire) {
            out.fill(0.0);
            return;
        }

        {
            let mut source = self.lock_source();
            match source.as_mut() {
                Some(src) => src.pull(out),
                None => out.fill(0.0),
            }
        }

        let volume = f32::from_bits(self.volume.load(Ordering::Relaxed));
        if volume != 1.0 {
            for s in out.iter_mut() {
                *s *= volume;
            }
        }
        self.last.publish(out);
    }
}

/// Cloneable handle the output callback renders through.
#[derive(Clone)]
pub struct RenderHandle(Arc<PlaybackState>);

impl RenderHandle {
    /// Fill `out` (interleaved stereo) with the next block. Never blocks on
    /// I/O, never fails; anything missing is silence.
    pub fn render(&self, out: &mut [f32]) {
        self.0.render(out);
    }
}

/// Playback mixer: one active source, volume, transport, and the device
/// stream that drives it.
pub struct Mixer {
    state: Arc<PlaybackState>,
    stream: Option<Stream>,
    /// Follow-up queue of the current buffered source, if that is what is playing.
    queue: Option<BufferQueue>,
    config: EngineConfig,
}

impl Mixer {
    pub fn new(config: &EngineConfig) -> Self {
        let block_samples = config.block_size as usize * CHANNELS;
        Self {
            state: Arc::new(PlaybackState {
                source: Mutex::new(None),
                paused: AtomicBool::new(false),
                playing: AtomicBool::new(false),
                volume: AtomicU32::new(config.default_volume.clamp(0.0, 1.0).to_bits()),
                last: SnapshotBuffer::with_capacity(block_samples),
            }),
            stream: None,
            queue: None,
            config: config.clone(),
        }
    }

    pub fn render_handle(&self) -> RenderHandle {
        RenderHandle(self.state.clone())
    }

    /// Render one block as the device callback would.
    pub fn render(&self, out: &mut [f32]) {
        self.state.render(out);
    }

    /// Swap in `source` (or none). The previous source is closed after the
    /// lock is released, so the callback never waits on its teardown.
    pub fn set_source(&mut self, source: Option<Box<dyn FrameSource>>) {
        let old = std::mem::replace(&mut *self.state.lock_source(), source);
        self.queue = None;
        retire(old);
    }

    /// Replace the active source with an in-memory buffer. Mono input is
    /// played on both sides.
    pub fn set_audio(&mut self, samples: &[f32], channels: usize) {
        let (source, queue) = BufferedSource::new(
            samples,
            channels,
            self.config.sample_rate,
            self.config.queue_depth,
        );
        let old = std::mem::replace(&mut *self.state.lock_source(), Some(Box::new(source)));
        self.queue = Some(queue);
        retire(old);
    }

    /// Append a buffer to the in-memory source's queue. Returns false when
    /// it was dropped: no buffered source is active or the queue is full.
    pub fn queue_audio(&self, samples: &[f32], channels: usize) -> bool {
        match &self.queue {
            Some(queue) => queue.push(samples, channels),
            None => false,
        }
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.state.volume.load(Ordering::Relaxed))
    }

    pub fn set_volume(&self, level: f32) {
        let v = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.state.volume.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn volume_up(&self) -> f32 {
        self.set_volume(self.volume() + self.config.volume_step);
        self.volume()
    }

    pub fn volume_down(&self) -> f32 {
        self.set_volume(self.volume() - self.config.volume_step);
        self.volume()
    }

    /// Open the output device and begin rendering. No-op if already started.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.state.paused.store(false, Ordering::Release);

        let output = audio::setup_output_device(&self.config)?;
        let block_frames = self.config.block_size as usize;
        let stream = audio::open_stream(&output, self.render_handle(), block_frames)?;
        stream.play()?;

        self.stream = Some(stream);
        self.state.playing.store(true, Ordering::Release);
        tracing::info!("playback started");
        Ok(())
    }

    /// Close the device stream and retire the active source.
    pub fn stop(&mut self) {
        self.state.playing.store(false, Ordering::Release);
        if self.stream.take().is_some() {
            tracing::info!("playback stopped");
        }
        self.set_source(None);
        self.state.last.clear();
    }

    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::Release);
    }

    /// Flip pause; returns true if now playing.
    pub fn toggle_pause(&self) -> bool {
        // Previous value was paused means we are now playing.
        self.state.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::Acquire) && !self.is_paused()
    }

    /// Copy the last rendered block into `out`; false if none is available.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) -> bool {
        self.state.last.read_into(out)
    }

    pub fn has_source(&self) -> bool {
        self.state.lock_source().is_some()
    }

    pub fn is_stream_finished(&self) -> bool {
        self.state
            .lock_source()
            .as_ref()
            .is_some_and(|s| s.is_finished())
    }

    pub fn position(&self) -> Duration {
        self.state
            .lock_source()
            .as_ref()
            .map_or(Duration::ZERO, |s| s.position())
    }

    pub fn duration(&self) -> Duration {
        self.state
            .lock_source()
            .as_ref()
            .map_or(Duration::ZERO, |s| s.duration())
    }

    pub fn progress(&self) -> f64 {
        self.state
            .lock_source()
            .as_ref()
            .map_or(0.0, |s| s.progress())
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.stream = None;
        let old = self.state.lock_source().take();
        retire(old);
    }
}

fn retire(old: ActiveSource) {
    if let Some(mut src) = old {
        src.close();
    }
}
