// src/types.rs

use serde::{Deserialize, Serialize};

use crate::view::{OwnedImage, Rgba};

// ============================================================================
// Direction of travel
// ============================================================================

/// Direction a train travels through the image, in image coordinates.
///
/// A train moving right-to-left pushes scene content leftwards between
/// successive frames, which the offset estimator reports as positive
/// displacement. The sign exposed by [`Direction::as_i32`] is the
/// conventional one for reporting: negative means right-to-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// Direction implied by the median per-frame displacement, or `None`
    /// when the median is exactly zero.
    pub fn from_median_dx(median_dx: f64) -> Option<Self> {
        if median_dx > 0.0 {
            Some(Direction::RightToLeft)
        } else if median_dx < 0.0 {
            Some(Direction::LeftToRight)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::LeftToRight => "left_to_right",
            Direction::RightToLeft => "right_to_left",
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Direction::LeftToRight => 1,
            Direction::RightToLeft => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Train event
// ============================================================================

/// A completed train pass: the stitched panorama plus its measurements.
#[derive(Debug, Clone)]
pub struct TrainEvent {
    /// Stitched panorama, cropped to written pixels. Height equals the
    /// source frame height.
    pub panorama: OwnedImage<Rgba>,
    pub direction: Direction,
    /// Train length along the track, in panorama pixels.
    pub length_px: f64,
    /// Train length in metres, from the pixels-per-metre calibration.
    pub length_m: f64,
    /// Mean absolute fitted speed in pixels per frame.
    pub speed_px_per_frame: f64,
    /// Mean speed in metres per second, from timestamps.
    pub speed_mps: f64,
    /// Timestamp of the first recorded frame, milliseconds.
    pub t_start_ms: f64,
    /// Timestamp of the last recorded frame, milliseconds.
    pub t_end_ms: f64,
    /// Number of frames that went into the panorama.
    pub frame_count: usize,
}

impl TrainEvent {
    pub fn speed_kph(&self) -> f64 {
        self.speed_mps * 3.6
    }

    /// Serializable summary without the pixel data.
    pub fn summary(&self) -> TrainSummary {
        TrainSummary {
            direction: self.direction,
            direction_sign: self.direction.as_i32(),
            length_m: self.length_m,
            speed_mps: self.speed_mps,
            speed_kph: self.speed_kph(),
            t_start_ms: self.t_start_ms,
            t_end_ms: self.t_end_ms,
            frame_count: self.frame_count,
            panorama_w: self.panorama.width(),
            panorama_h: self.panorama.height(),
        }
    }
}

/// What a host typically logs or ships over the wire for one train.
#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub direction: Direction,
    pub direction_sign: i32,
    pub length_m: f64,
    pub speed_mps: f64,
    pub speed_kph: f64,
    pub t_start_ms: f64,
    pub t_end_ms: f64,
    pub frame_count: usize,
    pub panorama_w: usize,
    pub panorama_h: usize,
}
