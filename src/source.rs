// src/source.rs
//
// Capability the frame producer implements. The core never opens a
// camera or decodes video; whatever does hands frames in over this
// trait, in monotonic timestamp order, dropping frames under
// backpressure as it sees fit.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use tracing::warn;

use crate::auto_stitcher::AutoStitcher;
use crate::types::TrainEvent;
use crate::view::{OwnedImage, Rgba};

/// One frame and its timestamp in milliseconds.
pub type SourceFrame = (OwnedImage<Rgba>, f64);

pub trait FrameSource {
    /// The next frame, `None` at the end of the stream, or an error
    /// when the producer failed.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>>;
}

/// In-memory source, mostly useful for tests and replays.
#[derive(Debug, Default)]
pub struct BufferedSource {
    frames: VecDeque<SourceFrame>,
}

impl BufferedSource {
    pub fn new(frames: Vec<SourceFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for BufferedSource {
    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        Ok(self.frames.pop_front())
    }
}

/// Pumps a source to exhaustion through the stitcher and finalizes.
///
/// Collected events are returned; an installed train sink observes
/// them as well. A source error still flushes the sequence gathered so
/// far before the error is propagated.
pub fn run_source<S: FrameSource>(
    source: &mut S,
    stitcher: &mut AutoStitcher,
) -> Result<Vec<TrainEvent>> {
    let mut events = Vec::new();
    loop {
        match source.next_frame() {
            Ok(Some((frame, timestamp_ms))) => {
                if let Some(ev) = stitcher.frame(&frame.view(), timestamp_ms)? {
                    events.push(ev);
                }
            }
            Ok(None) => {
                if let Some(ev) = stitcher.finalize()? {
                    events.push(ev);
                }
                return Ok(events);
            }
            Err(e) => {
                warn!("frame source failed, flushing {} buffered frames", stitcher.sequence_len());
                stitcher.finalize()?;
                return Err(e).context("frame source failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testutil::shifted_rgba;

    #[test]
    fn test_run_source_end_to_end() {
        let config = Config {
            pixels_per_m: 140.0,
            min_speed_kph: 10.0,
            max_speed_kph: 30.0,
            video_fps: 30.0,
            min_length_m: 10.0,
        };
        let frames: Vec<SourceFrame> = (0..100)
            .map(|i| (shifted_rgba(120, 16, 20 * i as i64), i as f64 * 33.3))
            .collect();
        let mut source = BufferedSource::new(frames);
        let mut stitcher = AutoStitcher::new(config).unwrap();

        let events = run_source(&mut source, &mut stitcher).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].length_m > 10.0);
    }

    #[test]
    fn test_source_error_propagates() {
        struct FailingSource(usize);
        impl FrameSource for FailingSource {
            fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
                if self.0 == 0 {
                    anyhow::bail!("capture device vanished");
                }
                self.0 -= 1;
                Ok(Some((shifted_rgba(120, 16, 0), 0.0)))
            }
        }
        let mut source = FailingSource(3);
        let config = Config {
            max_speed_kph: 30.0,
            ..Config::default()
        };
        let mut stitcher = AutoStitcher::new(config).unwrap();
        let err = run_source(&mut source, &mut stitcher).unwrap_err();
        assert!(err.to_string().contains("frame source failed"));
    }
}
