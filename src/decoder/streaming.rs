// src/decoder/streaming.rs

use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::config::{CHANNELS, EngineConfig};
use crate::decoder::cursor::StreamCursor;
use crate::error::{EngineError, Result};
use crate::source::FrameSource;

struct ProducerFlags {
    stop: AtomicBool,
    /// Set once every real frame of the file has been pushed.
    done: AtomicBool,
}

/// Streaming source whose file I/O and resampling run on a dedicated
/// producer thread. The output callback only drains pre-decoded frames
/// from a bounded SPSC ring; an empty ring is played as silence.
pub struct StreamingSource {
    path: PathBuf,
    consumer: HeapCons<f32>,
    flags: Arc<ProducerFlags>,
    producer_thread: Option<JoinHandle<()>>,
    total_frames: u64,
    sample_rate: u32,
    consumed: u64,
}

impl StreamingSource {
    /// Open `path` and start its producer thread. Open failures surface here,
    /// before anything touches the output callback.
    pub fn open(path: &Path, config: &EngineConfig) -> Result<Self> {
        let cursor = StreamCursor::open_with(
            path,
            config.sample_rate,
            config.chunk_seconds,
            config.resample_quality,
        )?;
        let total_frames = cursor.total_frames();

        let rb = HeapRb::<f32>::new(config.ring_capacity());
        let (producer, consumer) = rb.split();
        let flags = Arc::new(ProducerFlags {
            stop: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });

        let block_frames = config.block_size as usize;
        let thread_flags = flags.clone();
        let producer_thread = thread::Builder::new()
            .name("stream-producer".to_string())
            .spawn(move || run_producer(cursor, producer, &thread_flags, block_frames))
            .map_err(EngineError::Spawn)?;

        tracing::info!(path = %path.display(), total_frames, "streaming source opened");

        Ok(Self {
            path: path.to_path_buf(),
            consumer,
            flags,
            producer_thread: Some(producer_thread),
            total_frames,
            sample_rate: config.sample_rate,
            consumed: 0,
        })
    }

    /// Frames decoded and waiting in the ring.
    pub fn buffered_frames(&self) -> usize {
        self.consumer.occupied_len() / CHANNELS
    }
}

fn run_producer(
    mut cursor: StreamCursor,
    mut producer: HeapProd<f32>,
    flags: &ProducerFlags,
    block_frames: usize,
) {
    tracing::debug!(path = %cursor.path().display(), "producer started");
    let mut block = vec![0.0f32; block_frames * CHANNELS];
    let mut filled = 0usize;
    let mut offset = 0usize;

    while !flags.stop.load(Ordering::Acquire) {
        if offset == filled {
            let real = cursor.read_into(&mut block);
            if real == 0 {
                flags.done.store(true, Ordering::Release);
                break;
            }
            filled = real * CHANNELS;
            offset = 0;
        }

        // Whole frames only, so the consumer never sees a split pair.
        let room = producer.vacant_len() / CHANNELS * CHANNELS;
        let n = room.min(filled - offset);
        if n > 0 {
            offset += producer.push_slice(&block[offset..offset + n]);
        } else {
            thread::park_timeout(Duration::from_millis(2));
        }
    }

    cursor.close();
    tracing::debug!(path = %cursor.path().display(), "producer exited");
}

impl FrameSource for StreamingSource {
    fn pull(&mut self, out: &mut [f32]) {
        let n = self.consumer.pop_slice(out);
        out[n..].fill(0.0);
        self.consumed += (n / CHANNELS) as u64;
    }

    fn position_frames(&self) -> u64 {
        self.consumed.min(FrameSource::total_frames(self))
    }

    fn total_frames(&self) -> u64 {
        // Containers without a frame count: the total is what has played.
        if self.total_frames == 0 {
            self.consumed
        } else {
            self.total_frames
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_finished(&self) -> bool {
        self.flags.done.load(Ordering::Acquire) && self.consumer.is_empty()
    }

    fn close(&mut self) {
        let Some(handle) = self.producer_thread.take() else {
            return;
        };
        self.flags.stop.store(true, Ordering::Release);
        handle.thread().unpark();
        if handle.join().is_err() {
            tracing::error!(path = %self.path.display(), "producer thread panicked");
        }
        tracing::debug!(path = %self.path.display(), "streaming source closed");
    }
}

impl Drop for StreamingSource {
    fn drop(&mut self) {
        self.close();
    }
}
