// src/metrics.rs
//
// Observability for the stitching pipeline. The core records against
// an injected sink so hosts can bridge to whatever metrics backend
// they run; nothing here is process-global.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// How one incoming frame was used by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    NotMoving,
    Inconclusive,
    Started,
    Recorded,
    DroppedOverCap,
    Stopped,
}

impl FrameDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameDisposition::NotMoving => "not_moving",
            FrameDisposition::Inconclusive => "inconclusive",
            FrameDisposition::Started => "started",
            FrameDisposition::Recorded => "recorded",
            FrameDisposition::DroppedOverCap => "dropped_over_cap",
            FrameDisposition::Stopped => "stopped",
        }
    }
}

/// Outcome of one fit-and-stitch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitResultLabel {
    Ok,
    TooShort,
    InconsistentDirection,
    FitFailed,
}

impl FitResultLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitResultLabel::Ok => "ok",
            FitResultLabel::TooShort => "too_short",
            FitResultLabel::InconsistentDirection => "inconsistent_direction",
            FitResultLabel::FitFailed => "fit_failed",
        }
    }
}

/// Receiver for the counters and gauges the core surfaces.
pub trait MetricsSink: Send + Sync {
    fn record_frame_disposition(&self, disposition: FrameDisposition);
    fn record_sequence_length(&self, len: usize);
    fn record_fit_result(&self, result: FitResultLabel);
    /// Mean luminance and mean absolute deviation of the latest frame,
    /// both in [0, 1].
    fn record_brightness(&self, avg: f64, avg_dev: f64);
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_frame_disposition(&self, _disposition: FrameDisposition) {}
    fn record_sequence_length(&self, _len: usize) {}
    fn record_fit_result(&self, _result: FitResultLabel) {}
    fn record_brightness(&self, _avg: f64, _avg_dev: f64) {}
}

/// In-process sink backed by atomics. Share it via `Arc` and scrape
/// [`AtomicMetrics::summary`] from wherever the host exports metrics.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_not_moving: AtomicU64,
    frames_inconclusive: AtomicU64,
    sequences_started: AtomicU64,
    frames_recorded: AtomicU64,
    frames_dropped_over_cap: AtomicU64,
    sequences_stopped: AtomicU64,
    sequence_length: AtomicU64,
    fit_ok: AtomicU64,
    fit_too_short: AtomicU64,
    fit_inconsistent_direction: AtomicU64,
    fit_failed: AtomicU64,
    brightness_avg_bits: AtomicU64,
    brightness_avg_dev_bits: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_not_moving: self.frames_not_moving.load(Ordering::Relaxed),
            frames_inconclusive: self.frames_inconclusive.load(Ordering::Relaxed),
            sequences_started: self.sequences_started.load(Ordering::Relaxed),
            frames_recorded: self.frames_recorded.load(Ordering::Relaxed),
            frames_dropped_over_cap: self.frames_dropped_over_cap.load(Ordering::Relaxed),
            sequences_stopped: self.sequences_stopped.load(Ordering::Relaxed),
            sequence_length: self.sequence_length.load(Ordering::Relaxed),
            fit_ok: self.fit_ok.load(Ordering::Relaxed),
            fit_too_short: self.fit_too_short.load(Ordering::Relaxed),
            fit_inconsistent_direction: self.fit_inconsistent_direction.load(Ordering::Relaxed),
            fit_failed: self.fit_failed.load(Ordering::Relaxed),
            brightness_avg: f64::from_bits(self.brightness_avg_bits.load(Ordering::Relaxed)),
            brightness_avg_dev: f64::from_bits(
                self.brightness_avg_dev_bits.load(Ordering::Relaxed),
            ),
        }
    }
}

impl MetricsSink for AtomicMetrics {
    fn record_frame_disposition(&self, disposition: FrameDisposition) {
        let counter = match disposition {
            FrameDisposition::NotMoving => &self.frames_not_moving,
            FrameDisposition::Inconclusive => &self.frames_inconclusive,
            FrameDisposition::Started => &self.sequences_started,
            FrameDisposition::Recorded => &self.frames_recorded,
            FrameDisposition::DroppedOverCap => &self.frames_dropped_over_cap,
            FrameDisposition::Stopped => &self.sequences_stopped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_sequence_length(&self, len: usize) {
        self.sequence_length.store(len as u64, Ordering::Relaxed);
    }

    fn record_fit_result(&self, result: FitResultLabel) {
        let counter = match result {
            FitResultLabel::Ok => &self.fit_ok,
            FitResultLabel::TooShort => &self.fit_too_short,
            FitResultLabel::InconsistentDirection => &self.fit_inconsistent_direction,
            FitResultLabel::FitFailed => &self.fit_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_brightness(&self, avg: f64, avg_dev: f64) {
        self.brightness_avg_bits.store(avg.to_bits(), Ordering::Relaxed);
        self.brightness_avg_dev_bits
            .store(avg_dev.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub frames_not_moving: u64,
    pub frames_inconclusive: u64,
    pub sequences_started: u64,
    pub frames_recorded: u64,
    pub frames_dropped_over_cap: u64,
    pub sequences_stopped: u64,
    pub sequence_length: u64,
    pub fit_ok: u64,
    pub fit_too_short: u64,
    pub fit_inconsistent_direction: u64,
    pub fit_failed: u64,
    pub brightness_avg: f64,
    pub brightness_avg_dev: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_metrics_counts() {
        let m = AtomicMetrics::new();
        m.record_frame_disposition(FrameDisposition::Recorded);
        m.record_frame_disposition(FrameDisposition::Recorded);
        m.record_frame_disposition(FrameDisposition::NotMoving);
        m.record_fit_result(FitResultLabel::TooShort);
        m.record_sequence_length(42);
        m.record_brightness(0.5, 0.125);

        let s = m.summary();
        assert_eq!(s.frames_recorded, 2);
        assert_eq!(s.frames_not_moving, 1);
        assert_eq!(s.fit_too_short, 1);
        assert_eq!(s.fit_ok, 0);
        assert_eq!(s.sequence_length, 42);
        assert_eq!(s.brightness_avg, 0.5);
        assert_eq!(s.brightness_avg_dev, 0.125);
    }

    #[test]
    fn test_summary_serializes() {
        let m = AtomicMetrics::new();
        m.record_frame_disposition(FrameDisposition::Started);
        let yaml = serde_yaml::to_string(&m.summary()).unwrap();
        assert!(yaml.contains("sequences_started: 1"));
    }

    #[test]
    fn test_label_names() {
        assert_eq!(FrameDisposition::DroppedOverCap.as_str(), "dropped_over_cap");
        assert_eq!(FitResultLabel::InconsistentDirection.as_str(), "inconsistent_direction");
    }
}
