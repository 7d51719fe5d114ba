// src/decoder/dsp.rs

use crate::config::CHANNELS;

/// Append interleaved stereo frames to per-channel staging vectors.
pub fn deinterleave_into(interleaved: &[f32], planar: &mut [Vec<f32>]) {
    let channels = planar.len();
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            planar[ch].push(s);
        }
    }
}

pub fn planar_len(planar: &[Vec<f32>]) -> usize {
    planar.iter().map(|v| v.len()).min().unwrap_or(0)
}

/// Split the first `frames` frames off every channel.
pub fn take_from_planar(planar: &mut [Vec<f32>], frames: usize) -> Vec<Vec<f32>> {
    planar
        .iter_mut()
        .map(|ch| {
            let n = frames.min(ch.len());
            let tail = ch.split_off(n);
            std::mem::replace(ch, tail)
        })
        .collect()
}

/// Interleave planar channels, appending to `out`.
pub fn interleave_into(planar: &[Vec<f32>], out: &mut Vec<f32>) {
    let frames = planar_len(planar);
    out.reserve(frames * planar.len());
    for f in 0..frames {
        for ch in planar {
            out.push(ch[f]);
        }
    }
}

/// Convert `in_ch` interleaved channels to stereo, appending to `out`.
///
/// Mono is duplicated to both sides. Wider layouts are folded by averaging
/// the even-indexed channels into the left and odd-indexed into the right.
pub fn to_stereo_into(input: &[f32], in_ch: usize, out: &mut Vec<f32>) {
    if in_ch == 0 {
        return;
    }
    let frames = input.len() / in_ch;
    out.reserve(frames * CHANNELS);

    match in_ch {
        1 => {
            for &m in &input[..frames] {
                out.push(m);
                out.push(m);
            }
        }
        2 => out.extend_from_slice(&input[..frames * 2]),
        _ => {
            let left_n = in_ch.div_ceil(2) as f32;
            let right_n = (in_ch / 2) as f32;
            for frame in input.chunks_exact(in_ch) {
                let (mut l, mut r) = (0.0f32, 0.0f32);
                for (ic, &s) in frame.iter().enumerate() {
                    if ic % 2 == 0 {
                        l += s;
                    } else {
                        r += s;
                    }
                }
                out.push(l / left_n);
                out.push(r / right_n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let mut out = Vec::new();
        to_stereo_into(&[0.1, -0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, -0.2, -0.2, 0.3, 0.3]);
    }

    #[test]
    fn stereo_passes_through_whole_frames() {
        let mut out = Vec::new();
        to_stereo_into(&[0.1, 0.2, 0.3, 0.4, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn quad_folds_to_stereo() {
        let mut out = Vec::new();
        to_stereo_into(&[1.0, 0.0, 0.0, 1.0], 4, &mut out);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn planar_roundtrip_keeps_frame_order() {
        let mut planar = vec![Vec::new(), Vec::new()];
        deinterleave_into(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &mut planar);
        assert_eq!(planar_len(&planar), 3);

        let head = take_from_planar(&mut planar, 2);
        assert_eq!(head, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert_eq!(planar, vec![vec![5.0], vec![6.0]]);

        let mut out = Vec::new();
        interleave_into(&head, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
