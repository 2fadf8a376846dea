// src/stitching/mod.rs
//
// Turns one recorded sequence into a train panorama: fit a smooth
// speed curve to the per-frame displacements, then composite the
// frames at their integrated positions.

pub mod motion_fit;
pub mod panorama;

use thiserror::Error;
use tracing::info;

pub use motion_fit::{fit_motion, MotionFit};
pub use panorama::composite;

use crate::config::Config;
use crate::metrics::FitResultLabel;
use crate::sequence::Sequence;
use crate::types::TrainEvent;

/// Why a candidate pass was discarded. These are expected outcomes of
/// normal operation, not errors; the caller counts them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("pass too short: {length_m:.2}m < {min_length_m:.2}m minimum")]
    TooShort { length_m: f64, min_length_m: f64 },

    #[error("no dominant direction: {agreeing} of {nonzero} non-zero samples agree")]
    InconsistentDirection { agreeing: usize, nonzero: usize },

    #[error("motion fit failed: {reason}")]
    FitFailed { reason: &'static str },
}

impl Rejection {
    pub fn label(&self) -> FitResultLabel {
        match self {
            Rejection::TooShort { .. } => FitResultLabel::TooShort,
            Rejection::InconsistentDirection { .. } => FitResultLabel::InconsistentDirection,
            Rejection::FitFailed { .. } => FitResultLabel::FitFailed,
        }
    }
}

/// Fits the motion model and assembles the panorama for one sequence.
pub fn fit_and_stitch(seq: &Sequence, config: &Config) -> Result<TrainEvent, Rejection> {
    let samples: Vec<(f64, i32)> = seq
        .samples()
        .iter()
        .map(|s| (s.timestamp_ms, s.dx))
        .collect();
    let fit = fit_motion(&samples)?;

    let length_m = fit.length_px / config.pixels_per_m;
    if length_m < config.min_length_m {
        return Err(Rejection::TooShort {
            length_m,
            min_length_m: config.min_length_m,
        });
    }

    let pano = composite(seq, &fit)?;

    let t_start_ms = seq.t_start_ms().unwrap_or(0.0);
    let t_end_ms = seq.t_end_ms().unwrap_or(t_start_ms);
    let span_s = (t_end_ms - t_start_ms) / 1000.0;
    let speed_mps = if span_s > 0.0 {
        length_m / span_s
    } else {
        fit.mean_abs_speed_px * config.video_fps / config.pixels_per_m
    };

    let event = TrainEvent {
        panorama: pano,
        direction: fit.direction,
        length_px: fit.length_px,
        length_m,
        speed_px_per_frame: fit.mean_abs_speed_px,
        speed_mps,
        t_start_ms,
        t_end_ms,
        frame_count: seq.len(),
    };

    info!(
        "🚆 train assembled: {:.1}m long, {:.1}km/h, {} ({} frames)",
        event.length_m,
        event.speed_kph(),
        event.direction,
        event.frame_count
    );
    Ok(event)
}
