// src/auto_stitcher.rs
//
// State machine driving the whole pipeline on the live frame stream.
//
// Each incoming frame is reduced to grayscale and matched against the
// previous frame. In Idle the machine waits for confident, plausible
// motion; while Tracking it records frames until the low-pass filtered
// displacement says the subject has left the view, then hands the
// sequence to the stitcher. The frame stored with each displacement is
// always the previous colour frame, the one the displacement was
// measured against.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::{FitResultLabel, FrameDisposition, MetricsSink, NoopMetrics};
use crate::offset_estimator::estimate_offset;
use crate::sequence::{Sequence, MAX_SEQ_LEN};
use crate::stitching::fit_and_stitch;
use crate::types::TrainEvent;
use crate::view::{luminance_stats, Gray, ImageView, OwnedImage, Rgba};

/// Confidence needed to assert "nothing is moving".
pub const GOOD_SCORE_NO_MOVE: f64 = 0.99;

/// Confidence needed to start tracking on a moving frame.
pub const GOOD_SCORE_MOVE: f64 = 0.95;

/// Low-pass coefficient for the motion-presence signal.
const DX_LOW_PASS_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitcherState {
    /// Waiting for motion to start.
    Idle,
    /// Accumulating a sequence.
    Tracking,
}

impl StitcherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StitcherState::Idle => "IDLE",
            StitcherState::Tracking => "TRACKING",
        }
    }
}

struct PrevFrame {
    color: OwnedImage<Rgba>,
    gray: OwnedImage<Gray>,
}

type TrainSink = Box<dyn FnMut(&TrainEvent) + Send>;

pub struct AutoStitcher {
    config: Config,
    min_dx: i32,
    max_dx: usize,

    state: StitcherState,
    prev: Option<PrevFrame>,
    frame_count: u64,

    seq: Sequence,
    dx_abs_low_pass: f64,

    metrics: Arc<dyn MetricsSink>,
    on_train: Option<TrainSink>,
}

impl AutoStitcher {
    /// Pure construction; validates the configuration, does no I/O.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let min_dx = config.min_px_per_frame();
        let max_dx = config.max_px_per_frame() as usize;
        Ok(Self {
            config,
            min_dx,
            max_dx,
            state: StitcherState::Idle,
            prev: None,
            frame_count: 0,
            seq: Sequence::new(),
            dx_abs_low_pass: 0.0,
            metrics: Arc::new(NoopMetrics),
            on_train: None,
        })
    }

    /// Installs a metrics receiver. Defaults to a no-op sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Installs a callback invoked for every assembled train, in
    /// addition to the events returned from `frame` and `finalize`.
    pub fn with_train_sink(mut self, sink: impl FnMut(&TrainEvent) + Send + 'static) -> Self {
        self.on_train = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> StitcherState {
        self.state
    }

    pub fn sequence_len(&self) -> usize {
        self.seq.len()
    }

    pub fn dx_low_pass(&self) -> f64 {
        self.dx_abs_low_pass
    }

    /// Ingests one frame. Copies it; the caller keeps ownership of the
    /// buffer. Returns a train event when this frame ended a sequence
    /// that stitched successfully.
    pub fn frame(
        &mut self,
        frame: &ImageView<'_, Rgba>,
        timestamp_ms: f64,
    ) -> Result<Option<TrainEvent>> {
        let color = frame.to_owned_image();
        let gray = frame.to_gray();

        let (avg, avg_dev) = luminance_stats(&gray.view());
        self.metrics.record_brightness(avg, avg_dev);

        let Some(prev) = self.prev.take() else {
            self.prev = Some(PrevFrame { color, gray });
            self.frame_count += 1;
            return Ok(None);
        };

        let est = estimate_offset(&prev.gray.view(), &gray.view(), self.max_dx)?;
        let (dx, score) = (est.dx, est.score);
        debug!(
            "frame {}: dx {} score {:.4} [{}]",
            self.frame_count,
            dx,
            score,
            self.state.as_str()
        );

        let event = match self.state {
            StitcherState::Tracking => self.step_tracking(dx, timestamp_ms, &prev)?,
            StitcherState::Idle => {
                self.step_idle(dx, score, timestamp_ms, &prev)?;
                None
            }
        };

        self.prev = Some(PrevFrame { color, gray });
        self.frame_count += 1;
        Ok(event)
    }

    fn step_idle(
        &mut self,
        dx: i32,
        score: f64,
        timestamp_ms: f64,
        prev: &PrevFrame,
    ) -> Result<()> {
        let dx_abs = dx.abs();
        if score >= GOOD_SCORE_NO_MOVE && dx_abs < self.min_dx {
            debug!("not moving");
            self.metrics
                .record_frame_disposition(FrameDisposition::NotMoving);
            return Ok(());
        }

        if score >= GOOD_SCORE_MOVE && dx_abs >= self.min_dx && dx_abs <= self.max_dx as i32 {
            info!("start of new sequence (dx {}, score {:.3})", dx, score);
            self.seq.record(dx, timestamp_ms, &prev.color.view())?;
            self.dx_abs_low_pass = dx_abs as f64;
            self.state = StitcherState::Tracking;
            self.metrics
                .record_frame_disposition(FrameDisposition::Started);
            self.metrics.record_sequence_length(self.seq.len());
            return Ok(());
        }

        debug!("inconclusive frame (dx {}, score {:.3})", dx, score);
        self.metrics
            .record_frame_disposition(FrameDisposition::Inconclusive);
        Ok(())
    }

    fn step_tracking(
        &mut self,
        dx: i32,
        timestamp_ms: f64,
        prev: &PrevFrame,
    ) -> Result<Option<TrainEvent>> {
        self.dx_abs_low_pass =
            self.dx_abs_low_pass * (1.0 - DX_LOW_PASS_ALPHA) + dx.abs() as f64 * DX_LOW_PASS_ALPHA;

        // bail out before we use too much memory
        if self.seq.len() >= MAX_SEQ_LEN {
            self.metrics
                .record_frame_disposition(FrameDisposition::DroppedOverCap);
            return Ok(self.flush());
        }

        // the subject has left the view once the smoothed displacement
        // drops below the slowest plausible per-frame motion
        if self.dx_abs_low_pass < self.min_dx as f64 {
            self.metrics
                .record_frame_disposition(FrameDisposition::Stopped);
            return Ok(self.flush());
        }

        self.seq.record(dx, timestamp_ms, &prev.color.view())?;
        self.metrics
            .record_frame_disposition(FrameDisposition::Recorded);
        self.metrics.record_sequence_length(self.seq.len());
        Ok(None)
    }

    /// Stitches whatever has accumulated and resets. No-op on an empty
    /// sequence.
    pub fn finalize(&mut self) -> Result<Option<TrainEvent>> {
        if self.seq.is_empty() {
            info!("nothing to assemble");
            return Ok(None);
        }
        Ok(self.flush())
    }

    fn flush(&mut self) -> Option<TrainEvent> {
        info!("end of sequence after {} frames", self.seq.len());
        let result = fit_and_stitch(&self.seq, &self.config);

        self.seq.reset();
        self.dx_abs_low_pass = 0.0;
        self.state = StitcherState::Idle;
        self.metrics.record_sequence_length(0);

        match result {
            Ok(event) => {
                self.metrics.record_fit_result(FitResultLabel::Ok);
                if let Some(sink) = self.on_train.as_mut() {
                    sink(&event);
                }
                Some(event)
            }
            Err(rejection) => {
                warn!("sequence rejected: {}", rejection);
                self.metrics.record_fit_result(rejection.label());
                None
            }
        }
    }
}
