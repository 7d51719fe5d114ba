// src/source.rs

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::config::CHANNELS;
use crate::decoder::dsp;

/// A pull-stream of interleaved stereo frames at the output rate.
///
/// `pull` is called from the output callback: implementations must fill the
/// whole slice (silence past the end) and must not block on I/O.
pub trait FrameSource: Send {
    fn pull(&mut self, out: &mut [f32]);

    /// Frames handed out so far.
    fn position_frames(&self) -> u64;

    fn total_frames(&self) -> u64;

    fn sample_rate(&self) -> u32;

    fn is_finished(&self) -> bool {
        false
    }

    /// Release files and threads. Must be idempotent; never called from the
    /// output callback.
    fn close(&mut self) {}

    fn position(&self) -> Duration {
        frames_to_duration(self.position_frames(), self.sample_rate())
    }

    fn duration(&self) -> Duration {
        frames_to_duration(self.total_frames(), self.sample_rate())
    }

    fn progress(&self) -> f64 {
        let total = self.total_frames();
        if total == 0 {
            return 0.0;
        }
        (self.position_frames() as f64 / total as f64).clamp(0.0, 1.0)
    }
}

pub(crate) fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

/// Whole-buffer source kept for callers that decode tracks up front.
///
/// When the current buffer runs dry the next queued buffer is spliced in
/// within the same callback. Consumed buffers are freed on the callback
/// thread, which is why streaming sources are preferred.
pub struct BufferedSource {
    current: Vec<f32>,
    cursor: usize,
    queue: Receiver<Vec<f32>>,
    sample_rate: u32,
}

/// Producer side of a `BufferedSource` queue.
#[derive(Clone)]
pub struct BufferQueue {
    tx: Sender<Vec<f32>>,
}

impl BufferedSource {
    /// Build a source over `samples` (interleaved, `channels` wide) with a
    /// follow-up queue bounded to `depth` buffers.
    pub fn new(
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
        depth: usize,
    ) -> (Self, BufferQueue) {
        let (tx, rx) = bounded(depth);
        let source = Self {
            current: stereo(samples, channels),
            cursor: 0,
            queue: rx,
            sample_rate,
        };
        (source, BufferQueue { tx })
    }
}

impl BufferQueue {
    /// Queue a buffer for seamless follow-up. Returns false when the data
    /// was dropped because the queue is full or its source is gone.
    pub fn push(&self, samples: &[f32], channels: usize) -> bool {
        match self.tx.try_send(stereo(samples, channels)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("buffered queue full, dropping buffer");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

fn stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len() / channels.max(1) * CHANNELS);
    dsp::to_stereo_into(samples, channels, &mut out);
    out
}

impl FrameSource for BufferedSource {
    fn pull(&mut self, out: &mut [f32]) {
        let mut written = 0;
        while written < out.len() {
            let start = self.cursor * CHANNELS;
            let available = self.current.len().saturating_sub(start);
            if available == 0 {
                match self.queue.try_recv() {
                    Ok(next) => {
                        self.current = next;
                        self.cursor = 0;
                        continue;
                    }
                    Err(_) => break,
                }
            }
            let n = available.min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.current[start..start + n]);
            written += n;
            self.cursor += n / CHANNELS;
        }
        out[written..].fill(0.0);
    }

    fn position_frames(&self) -> u64 {
        self.cursor as u64
    }

    fn total_frames(&self) -> u64 {
        (self.current.len() / CHANNELS) as u64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
