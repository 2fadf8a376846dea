// src/stitching/panorama.rs
//
// Composites the recorded frames into one long image.
//
// Each frame is pasted at its integrated position from the motion fit.
// Where frames overlap the later frame wins; the seams are invisible
// when the fit is good because overlapping pixels show the same scene.
// Right-to-left passes paste directly. Left-to-right passes paste
// mirrored frames at mirrored offsets, which keeps the same seamless
// overlap geometry and makes every panorama read left-to-right.

use super::motion_fit::MotionFit;
use super::Rejection;
use crate::sequence::Sequence;
use crate::types::Direction;
use crate::view::{OwnedImage, Rgba};

/// Assembles the panorama for a fitted sequence.
pub fn composite(seq: &Sequence, fit: &MotionFit) -> Result<OwnedImage<Rgba>, Rejection> {
    let (frame_w, frame_h) = seq.frame_dims().ok_or(Rejection::FitFailed {
        reason: "no frames to composite",
    })?;

    let flip = fit.direction == Direction::LeftToRight;
    let sign = if flip { -1.0 } else { 1.0 };

    // per-frame paste offsets, shifted to start at zero
    let rel: Vec<f64> = fit
        .positions
        .iter()
        .map(|&x| (x - fit.positions[0]) * sign)
        .collect();
    let min_rel = rel.iter().cloned().fold(f64::INFINITY, f64::min);
    let offsets: Vec<usize> = rel.iter().map(|r| (r - min_rel).round() as usize).collect();

    let span = offsets.iter().max().copied().unwrap_or(0);
    let width = (fit.length_px.ceil() as usize + frame_w).max(span + frame_w);
    let mut data = vec![0u8; width * frame_h * 4];

    let mut written_min = width;
    let mut written_max = 0usize;
    for (sample, &off) in seq.samples().iter().zip(offsets.iter()) {
        let fv = sample.frame.view();
        for y in 0..frame_h {
            let src = fv.row(y);
            let dst_start = (y * width + off) * 4;
            let dst = &mut data[dst_start..dst_start + frame_w * 4];
            if flip {
                for x in 0..frame_w {
                    let s = (frame_w - 1 - x) * 4;
                    dst[x * 4..x * 4 + 4].copy_from_slice(&src[s..s + 4]);
                }
            } else {
                dst.copy_from_slice(src);
            }
        }
        written_min = written_min.min(off);
        written_max = written_max.max(off + frame_w);
    }

    // crop to the written bounding box
    let out_w = written_max - written_min;
    let mut out = Vec::with_capacity(out_w * frame_h * 4);
    for y in 0..frame_h {
        let start = (y * width + written_min) * 4;
        out.extend_from_slice(&data[start..start + out_w * 4]);
    }
    OwnedImage::new(out, out_w, frame_h).map_err(|_| Rejection::FitFailed {
        reason: "panorama buffer construction",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitching::motion_fit::fit_motion;
    use crate::testutil::{rgba_pattern_at, shifted_rgba};

    const W: usize = 60;
    const H: usize = 12;

    fn sequence_of_shifts(dx: i32, n: usize) -> Sequence {
        // frame i shows the scene displaced by i * dx; positive dx
        // means content slides left, a right-to-left pass
        let mut seq = Sequence::new();
        for i in 0..n {
            let frame = shifted_rgba(W, H, dx as i64 * i as i64);
            seq.record(dx, i as f64 * 40.0, &frame.view()).unwrap();
        }
        seq
    }

    #[test]
    fn test_panorama_reconstructs_scene() {
        let dx = 10;
        let n = 5;
        let seq = sequence_of_shifts(dx, n);
        let samples: Vec<(f64, i32)> = seq
            .samples()
            .iter()
            .map(|s| (s.timestamp_ms, s.dx))
            .collect();
        let fit = fit_motion(&samples).unwrap();
        let pano = composite(&seq, &fit).unwrap();

        assert_eq!(pano.height(), H);
        assert_eq!(pano.width(), (n - 1) * dx as usize + W);

        // frame 0 covers panorama columns [0, W); its pixel at x shows
        // scene content at x. Frame i at offset i*dx shows scene
        // content x + i*dx at panorama column x + i*dx: the panorama is
        // the scene itself over the extended range.
        let pv = pano.view();
        for &(x, y) in &[(0usize, 0usize), (13, 5), (W - 1, H - 1), (70, 3), (99, 11)] {
            let expected = rgba_pattern_at(x as i64, y as i64);
            assert_eq!(
                pv.pixel(x, y),
                &expected[..],
                "panorama mismatch at ({}, {})",
                x,
                y
            );
        }
    }

    #[test]
    fn test_decelerating_pass_reconstructs_scene() {
        // per-frame steps shrink while the train slows down; frame i
        // shows the scene displaced by the steps accumulated before it
        // and records the step out of it
        let steps: [i32; 6] = [20, 18, 16, 14, 12, 10];
        let mut seq = Sequence::new();
        let mut shift = 0i64;
        for (i, &d) in steps.iter().enumerate() {
            let frame = shifted_rgba(W, H, shift);
            seq.record(d, i as f64 * 40.0, &frame.view()).unwrap();
            shift += d as i64;
        }

        let samples: Vec<(f64, i32)> = seq
            .samples()
            .iter()
            .map(|s| (s.timestamp_ms, s.dx))
            .collect();
        let fit = fit_motion(&samples).unwrap();
        let pano = composite(&seq, &fit).unwrap();

        // total travel is the sum of all steps but the last: 80 px
        let span: usize = steps[..steps.len() - 1].iter().map(|&d| d as usize).sum();
        assert_eq!(pano.width(), span + W);
        assert_eq!(pano.height(), H);

        // each frame must land at the displacement accumulated before
        // it, so the panorama is again the scene itself, including the
        // columns only the later, slower frames cover
        let pv = pano.view();
        for &(x, y) in &[
            (0usize, 0usize),
            (25, 4),
            (W - 1, H - 1),
            (70, 2),
            (95, 7),
            (span + W - 1, H - 1),
        ] {
            let expected = rgba_pattern_at(x as i64, y as i64);
            assert_eq!(
                pv.pixel(x, y),
                &expected[..],
                "panorama mismatch at ({}, {})",
                x,
                y
            );
        }
    }

    #[test]
    fn test_left_to_right_pass_is_mirrored() {
        let dx = -10;
        let n = 4;
        let seq = sequence_of_shifts(dx, n);
        let samples: Vec<(f64, i32)> = seq
            .samples()
            .iter()
            .map(|s| (s.timestamp_ms, s.dx))
            .collect();
        let fit = fit_motion(&samples).unwrap();
        assert_eq!(fit.direction, Direction::LeftToRight);
        let pano = composite(&seq, &fit).unwrap();

        assert_eq!(pano.width(), (n - 1) * 10 + W);
        assert_eq!(pano.height(), H);

        // every frame pastes the mirror image of the scene, so panorama
        // column c shows scene content at W - 1 - c, for any writer
        let pv = pano.view();
        for &(c, y) in &[(0usize, 0usize), (W / 2, H / 2), (W - 1, H - 1), (75, 3), (89, 11)] {
            let expected = rgba_pattern_at(W as i64 - 1 - c as i64, y as i64);
            assert_eq!(
                pv.pixel(c, y),
                &expected[..],
                "mirrored panorama mismatch at ({}, {})",
                c,
                y
            );
        }
    }

    #[test]
    fn test_single_frame_panorama() {
        let seq = sequence_of_shifts(12, 1);
        let samples: Vec<(f64, i32)> = seq
            .samples()
            .iter()
            .map(|s| (s.timestamp_ms, s.dx))
            .collect();
        let fit = fit_motion(&samples).unwrap();
        let pano = composite(&seq, &fit).unwrap();
        assert_eq!(pano.dims(), (W, H));
    }
}
