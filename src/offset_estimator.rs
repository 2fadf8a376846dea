// src/offset_estimator.rs
//
// Frame-to-frame horizontal displacement from template matching.
//
// A centred slice of the current frame is searched for inside a wider
// centred strip of the previous frame. The strip is three times the
// maximum plausible per-frame displacement, so the full motion range
// stays addressable while the search cost stays bounded. The centre
// crop also keeps vignetting and static edge content out of the match.

use crate::error::{Error, Result};
use crate::template_match;
use crate::view::{Gray, ImageView, Rect};

/// Signed horizontal displacement between two successive frames.
///
/// Positive `dx` means the scene content moved leftwards, i.e. the
/// subject travels right-to-left through the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetEstimate {
    pub dx: i32,
    /// Match confidence in [0, 1].
    pub score: f64,
}

/// Estimates the displacement of `curr` relative to `prev`.
///
/// Both views must have identical dimensions (`SizeMismatch`
/// otherwise). `max_dx` must leave room for the search strip:
/// `3 * max_dx` within the frame width and the 3/4-height window within
/// the frame height (`InvalidConfig` otherwise).
pub fn estimate_offset(
    prev: &ImageView<'_, Gray>,
    curr: &ImageView<'_, Gray>,
    max_dx: usize,
) -> Result<OffsetEstimate> {
    if prev.dims() != curr.dims() {
        return Err(Error::SizeMismatch {
            left_w: prev.width(),
            left_h: prev.height(),
            right_w: curr.width(),
            right_h: curr.height(),
        });
    }
    let (frame_w, frame_h) = prev.dims();

    let sub_w = max_dx * 3;
    let h = frame_h * 3 / 4 + 1;
    if max_dx == 0 || sub_w > frame_w || h > frame_h {
        return Err(Error::InvalidConfig(format!(
            "search window {}x{} does not fit frame {}x{}",
            sub_w, h, frame_w, frame_h
        )));
    }

    let top = (frame_h - h) / 2;
    let sub_x = (frame_w - sub_w) / 2;
    let slice_x = (frame_w - max_dx) / 2;

    // strip of the previous frame wide enough for any plausible motion
    let sub = prev.sub_view(Rect::new(sub_x, top, sub_w, h))?;
    // narrow slice of the current frame to locate inside it
    let slice = curr.sub_view(Rect::new(slice_x, top, max_dx, h))?;

    // where the slice lands if nothing moved
    let x_zero = (slice_x - sub_x) as i64;

    let m = template_match::search(&sub, &slice)?;
    Ok(OffsetEstimate {
        dx: (m.x as i64 - x_zero) as i32,
        score: m.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::shifted_gray;

    #[test]
    fn test_still_frames() {
        let a = shifted_gray(200, 32, 0);
        let b = shifted_gray(200, 32, 0);
        let e = estimate_offset(&a.view(), &b.view(), 40).unwrap();
        assert_eq!(e.dx, 0);
        assert!(e.score > 0.999, "score = {}", e.score);
    }

    #[test]
    fn test_content_moving_left_is_positive() {
        // content of the current frame sits `d` pixels further left
        // than in the previous frame
        let d = 17i64;
        let prev = shifted_gray(200, 32, 0);
        let curr = shifted_gray(200, 32, d);
        let e = estimate_offset(&prev.view(), &curr.view(), 40).unwrap();
        assert_eq!(e.dx, d as i32);
        assert!(e.score > 0.999);
    }

    #[test]
    fn test_content_moving_right_is_negative() {
        let prev = shifted_gray(200, 32, 0);
        let curr = shifted_gray(200, 32, -23);
        let e = estimate_offset(&prev.view(), &curr.view(), 40).unwrap();
        assert_eq!(e.dx, -23);
        assert!(e.score > 0.999);
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let a = shifted_gray(200, 32, 0);
        let b = shifted_gray(192, 32, 0);
        assert!(matches!(
            estimate_offset(&a.view(), &b.view(), 40),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_window_must_fit_frame() {
        let a = shifted_gray(100, 32, 0);
        let b = shifted_gray(100, 32, 0);
        // 3 * 40 = 120 > 100
        assert!(matches!(
            estimate_offset(&a.view(), &b.view(), 40),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            estimate_offset(&a.view(), &b.view(), 0),
            Err(Error::InvalidConfig(_))
        ));
    }
}
