// src/sequence.rs
//
// Append-only record of one candidate train pass.

use crate::error::{Error, Result};
use crate::view::{ImageView, OwnedImage, Rgba};

/// Hard cap on recorded frames per pass, to bound memory.
pub const MAX_SEQ_LEN: usize = 800;

/// One recorded frame with the displacement that located it.
#[derive(Debug, Clone)]
pub struct Sample {
    pub dx: i32,
    pub timestamp_ms: f64,
    pub frame: OwnedImage<Rgba>,
}

/// Ordered (dx, timestamp, frame) triples for one pass.
///
/// Frames are deep-copied on record, so the sequence owns its buffers
/// exclusively. Timestamps are non-decreasing and all frames share one
/// size; `record` rejects anything else.
#[derive(Debug, Default)]
pub struct Sequence {
    samples: Vec<Sample>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `frame` and appends it with its displacement.
    pub fn record(&mut self, dx: i32, timestamp_ms: f64, frame: &ImageView<'_, Rgba>) -> Result<()> {
        if let Some(last) = self.samples.last() {
            if frame.dims() != last.frame.dims() {
                let (lw, lh) = last.frame.dims();
                return Err(Error::SizeMismatch {
                    left_w: lw,
                    left_h: lh,
                    right_w: frame.width(),
                    right_h: frame.height(),
                });
            }
            if timestamp_ms < last.timestamp_ms {
                return Err(Error::NonMonotonicTimestamp {
                    prev_ms: last.timestamp_ms,
                    next_ms: timestamp_ms,
                });
            }
        }
        self.samples.push(Sample {
            dx,
            timestamp_ms,
            frame: frame.to_owned_image(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops all samples and releases the frame buffers.
    pub fn reset(&mut self) {
        self.samples = Vec::new();
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Dimensions shared by every recorded frame.
    pub fn frame_dims(&self) -> Option<(usize, usize)> {
        self.samples.first().map(|s| s.frame.dims())
    }

    pub fn t_start_ms(&self) -> Option<f64> {
        self.samples.first().map(|s| s.timestamp_ms)
    }

    pub fn t_end_ms(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::noise_rgba;

    #[test]
    fn test_record_and_reset() {
        let frame = noise_rgba(32, 16);
        let mut seq = Sequence::new();
        assert!(seq.is_empty());

        seq.record(5, 100.0, &frame.view()).unwrap();
        seq.record(6, 133.0, &frame.view()).unwrap();
        seq.record(6, 133.0, &frame.view()).unwrap(); // equal timestamps allowed
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.frame_dims(), Some((32, 16)));
        assert_eq!(seq.t_start_ms(), Some(100.0));
        assert_eq!(seq.t_end_ms(), Some(133.0));

        seq.reset();
        assert_eq!(seq.len(), 0);
        assert_eq!(seq.frame_dims(), None);
    }

    #[test]
    fn test_frames_are_deep_copies() {
        let frame = noise_rgba(8, 8);
        let mut seq = Sequence::new();
        seq.record(1, 0.0, &frame.view()).unwrap();
        let stored = &seq.samples()[0].frame;
        assert_eq!(stored.as_raw(), frame.as_raw());
        assert_ne!(stored.as_raw().as_ptr(), frame.as_raw().as_ptr());
    }

    #[test]
    fn test_rejects_size_change() {
        let a = noise_rgba(32, 16);
        let b = noise_rgba(32, 18);
        let mut seq = Sequence::new();
        seq.record(1, 0.0, &a.view()).unwrap();
        assert!(matches!(
            seq.record(2, 10.0, &b.view()),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_backwards_timestamp() {
        let frame = noise_rgba(32, 16);
        let mut seq = Sequence::new();
        seq.record(1, 50.0, &frame.view()).unwrap();
        assert!(matches!(
            seq.record(2, 49.9, &frame.view()),
            Err(Error::NonMonotonicTimestamp { .. })
        ));
    }
}
