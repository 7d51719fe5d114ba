// src/decoder/cursor.rs

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::config::CHANNELS;
use crate::decoder::dsp;
use crate::decoder::resample::{ChunkResampler, ResampleQuality};
use crate::error::{EngineError, Result};
use crate::source::FrameSource;

/// Open container + codec for one file, yielding stereo packets.
struct PacketReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl PacketReader {
    /// Decode the next packet of our track and append it to `out` as
    /// interleaved stereo. Returns false once the stream has ended.
    fn decode_next(&mut self, out: &mut Vec<f32>) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return false;
                }
                Err(SymphoniaError::ResetRequired) => return false,
                Err(e) => {
                    tracing::warn!("packet read error, ending stream: {e}");
                    return false;
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count();
                    let needed = decoded.capacity() * channels;
                    if self.sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                        self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    let Some(buf) = self.sample_buf.as_mut() else {
                        continue;
                    };
                    buf.copy_interleaved_ref(decoded);
                    dsp::to_stereo_into(buf.samples(), channels, out);
                    return true;
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("skipping corrupt packet: {e}");
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => continue,
                Err(e) => {
                    tracing::warn!("decoder error, ending stream: {e}");
                    return false;
                }
            }
        }
    }
}

/// Chunked decoder over one audio file.
///
/// Holds at most one resampled chunk (plus a packet's worth of leftover
/// source frames) in memory and hands out exactly the requested number of
/// stereo frames per `read`, zero-padded once the file runs out. Positions
/// are in output-rate frames.
pub struct StreamCursor {
    path: PathBuf,
    reader: Option<PacketReader>,
    source_rate: u32,
    target_rate: u32,
    resample_ratio: f64,
    total_frames: u64,
    /// False when the container does not report a frame count; the total
    /// then grows with the position.
    length_known: bool,
    position: u64,
    chunk_frames: usize,
    source_chunk_frames: usize,
    chunk: Option<Vec<f32>>,
    chunk_offset: usize,
    /// Decoded source-rate stereo not yet consumed by a chunk.
    pending: Vec<f32>,
    source_done: bool,
    resampler: ChunkResampler,
}

impl StreamCursor {
    pub fn open(path: &Path, target_rate: u32, chunk_seconds: f64) -> Result<Self> {
        Self::open_with(path, target_rate, chunk_seconds, ResampleQuality::Linear)
    }

    pub fn open_with(
        path: &Path,
        target_rate: u32,
        chunk_seconds: f64,
        quality: ResampleQuality,
    ) -> Result<Self> {
        let file = File::open(path).map_err(|source| EngineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        let probed = get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(EngineError::Probe)?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::NoAudioTrack(path.to_path_buf()))?;
        let track_id = track.id;
        let source_rate = track
            .codec_params
            .sample_rate
            .filter(|&r| r > 0)
            .ok_or_else(|| EngineError::MissingSampleRate(path.to_path_buf()))?;
        let source_frames = track.codec_params.n_frames;

        let decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(EngineError::Codec)?;

        let resample_ratio = target_rate as f64 / source_rate as f64;
        let total_frames = source_frames
            .map(|n| (n as f64 * resample_ratio).round() as u64)
            .unwrap_or(0);
        let chunk_frames = ((target_rate as f64 * chunk_seconds).round() as usize).max(1);
        let source_chunk_frames = ((chunk_frames as f64 / resample_ratio).round() as usize).max(1);

        tracing::debug!(
            path = %path.display(),
            source_rate,
            target_rate,
            total_frames,
            "opened stream cursor"
        );

        let mut cursor = Self {
            path: path.to_path_buf(),
            reader: Some(PacketReader {
                format,
                decoder,
                track_id,
                sample_buf: None,
            }),
            source_rate,
            target_rate,
            resample_ratio,
            total_frames,
            length_known: source_frames.is_some(),
            position: 0,
            chunk_frames,
            source_chunk_frames,
            chunk: None,
            chunk_offset: 0,
            pending: Vec::new(),
            source_done: false,
            resampler: ChunkResampler::new(source_rate, target_rate, quality)?,
        };
        cursor.load_next_chunk();
        Ok(cursor)
    }

    /// Decode and resample the next chunk. Leaves `chunk` empty once the
    /// file yields nothing more.
    fn load_next_chunk(&mut self) {
        self.chunk = None;
        self.chunk_offset = 0;
        self.fill_chunk();

        if self.chunk.is_none() && self.source_done && self.position < self.total_frames {
            // The header over-reported the length; what was delivered is the length.
            tracing::debug!(
                path = %self.path.display(),
                reported = self.total_frames,
                delivered = self.position,
                "stream ended early"
            );
            self.total_frames = self.position;
        }
    }

    fn fill_chunk(&mut self) {

        loop {
            let Some(reader) = self.reader.as_mut() else {
                return;
            };
            while !self.source_done && self.pending.len() / CHANNELS < self.source_chunk_frames {
                if !reader.decode_next(&mut self.pending) {
                    self.source_done = true;
                }
            }

            let take = (self.pending.len() / CHANNELS).min(self.source_chunk_frames);
            let last = self.source_done && take * CHANNELS == self.pending.len();
            if take == 0 && !last {
                return;
            }
            let resampled = self.resampler.process(&self.pending[..take * CHANNELS], last);
            self.pending.drain(..take * CHANNELS);

            if !resampled.is_empty() {
                self.chunk = Some(resampled);
                return;
            }
            if last {
                return;
            }
        }
    }

    /// Read exactly `frames` stereo frames (interleaved, `2 * frames` values).
    pub fn read(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * CHANNELS];
        self.read_into(&mut out);
        out
    }

    /// Fill `out` with interleaved stereo, zero-padding past the end.
    /// Returns the number of real (non-padded) frames written.
    pub fn read_into(&mut self, out: &mut [f32]) -> usize {
        let wanted = out.len() / CHANNELS;
        let mut written = 0;

        while written < wanted {
            let Some(chunk) = self.chunk.as_ref() else {
                break;
            };
            let chunk_len = chunk.len() / CHANNELS;
            let n = (chunk_len - self.chunk_offset).min(wanted - written);
            let src = &chunk[self.chunk_offset * CHANNELS..(self.chunk_offset + n) * CHANNELS];
            out[written * CHANNELS..(written + n) * CHANNELS].copy_from_slice(src);

            self.chunk_offset += n;
            written += n;
            self.advance(n as u64);
            if self.chunk_offset >= chunk_len {
                self.load_next_chunk();
            }
        }

        out[written * CHANNELS..].fill(0.0);
        written
    }

    fn advance(&mut self, frames: u64) {
        self.position += frames;
        if !self.length_known {
            self.total_frames = self.total_frames.max(self.position);
        }
        self.position = self.position.min(self.total_frames);
    }

    /// Current position in output-rate frames.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.total_frames as f64 / self.target_rate as f64
    }

    pub fn progress(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.position as f64 / self.total_frames as f64
    }

    pub fn is_finished(&self) -> bool {
        self.chunk.is_none() && self.position + 1 >= self.total_frames
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn resample_ratio(&self) -> f64 {
        self.resample_ratio
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the file handle and buffers. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!(path = %self.path.display(), "closed stream cursor");
        }
        self.chunk = None;
        self.pending = Vec::new();
        self.source_done = true;
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl FrameSource for StreamCursor {
    fn pull(&mut self, out: &mut [f32]) {
        self.read_into(out);
    }

    fn position_frames(&self) -> u64 {
        self.position
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn sample_rate(&self) -> u32 {
        self.target_rate
    }

    fn is_finished(&self) -> bool {
        StreamCursor::is_finished(self)
    }

    fn close(&mut self) {
        StreamCursor::close(self);
    }
}
