//! Producer-thread streaming source.

mod common;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use driftwave::{EngineConfig, EngineError, FrameSource, StreamingSource};
use tempfile::tempdir;

use common::{constant_wav, pcm_to_f32, ramp_value, write_wav};

const SR: u32 = 44_100;

/// Drain the source without ever pulling past what is buffered, so the
/// collected samples contain no underrun padding.
fn drain(src: &mut StreamingSource) -> Vec<f32> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut got = Vec::new();
    while !src.is_finished() {
        assert!(Instant::now() < deadline, "producer stalled");
        let ready = src.buffered_frames().min(1024);
        if ready == 0 {
            thread::sleep(Duration::from_millis(1));
            continue;
        }
        let mut block = vec![0.0f32; ready * 2];
        src.pull(&mut block);
        got.extend_from_slice(&block);
    }
    got
}

#[test]
fn delivers_every_frame_in_order() {
    let dir = tempdir().unwrap();
    let frames = 30_000;
    let path = write_wav(dir.path(), "ramp.wav", SR, 2, frames, ramp_value);
    let config = EngineConfig {
        chunk_seconds: 0.1,
        block_size: 512,
        ..EngineConfig::default()
    };
    let mut src = StreamingSource::open(&path, &config).unwrap();
    assert_eq!(src.total_frames(), frames as u64);

    let got = drain(&mut src);
    assert_eq!(got.len(), frames * 2);
    for f in (0..frames).step_by(97) {
        assert!((got[f * 2] - pcm_to_f32(ramp_value(f, 0))).abs() < 1e-6);
        assert!((got[f * 2 + 1] - pcm_to_f32(ramp_value(f, 1))).abs() < 1e-6);
    }
    assert_eq!(src.position_frames(), frames as u64);
    assert_eq!(src.progress(), 1.0);
}

#[test]
fn ring_smaller_than_the_file_still_plays_through() {
    let dir = tempdir().unwrap();
    let path = constant_wav(dir.path(), "long.wav", SR, 3 * SR as usize, 3_000);
    let config = EngineConfig {
        ring_seconds: 0.05,
        block_size: 256,
        ..EngineConfig::default()
    };
    let mut src = StreamingSource::open(&path, &config).unwrap();
    let got = drain(&mut src);
    assert_eq!(got.len(), 3 * SR as usize * 2);
    assert!(got.iter().all(|&s| s != 0.0));
}

#[test]
fn underrun_is_silence_not_an_error() {
    let dir = tempdir().unwrap();
    let path = constant_wav(dir.path(), "tiny.wav", SR, 10, 3_000);
    let mut src = StreamingSource::open(&path, &EngineConfig::default()).unwrap();
    let mut out = vec![1.0f32; 4096 * 2];
    // Whatever was buffered plays, the rest of the block is zero.
    src.pull(&mut out);
    assert!(out[20..].iter().all(|&s| s == 0.0));
    assert!(src.position_frames() <= 10);
}

#[test]
fn close_stops_the_producer_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = constant_wav(dir.path(), "c.wav", SR, 5 * SR as usize, 1_000);
    let mut src = StreamingSource::open(&path, &EngineConfig::default()).unwrap();
    src.close();
    src.close();
    let mut out = vec![0.0f32; 64];
    src.pull(&mut out);
    drop(src);
}

#[test]
fn open_failure_surfaces_before_playback() {
    let err = StreamingSource::open(Path::new("/no/such.flac"), &EngineConfig::default()).err();
    assert!(matches!(err, Some(EngineError::Open { .. })));
}
