// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::Error;

/// Calibration and gating parameters for one camera installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pixels per metre in the plane of the track.
    pub pixels_per_m: f64,
    /// Slowest plausible train, km/h. Motion below this is noise.
    pub min_speed_kph: f64,
    /// Fastest plausible train, km/h. Bounds the per-frame search range.
    pub max_speed_kph: f64,
    /// Frames per second of the video source.
    pub video_fps: f64,
    /// Minimum subject length in metres to accept a pass.
    pub min_length_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pixels_per_m: 140.0,
            min_speed_kph: 10.0,
            max_speed_kph: 80.0,
            video_fps: 30.0,
            min_length_m: 10.0,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path))?;
        let config: Config = serde_yaml::from_str(&contents).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    /// Slowest plausible per-frame displacement, pixels. Biased one
    /// pixel down so borderline motion still starts a sequence.
    pub fn min_px_per_frame(&self) -> i32 {
        (self.min_speed_kph / 3.6 * self.pixels_per_m / self.video_fps) as i32 - 1
    }

    /// Fastest plausible per-frame displacement, pixels. Biased one
    /// pixel up.
    pub fn max_px_per_frame(&self) -> i32 {
        (self.max_speed_kph / 3.6 * self.pixels_per_m / self.video_fps) as i32 + 1
    }

    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.pixels_per_m <= 0.0 {
            return Err(Error::InvalidConfig("pixels_per_m must be positive".into()));
        }
        if self.video_fps <= 0.0 {
            return Err(Error::InvalidConfig("video_fps must be positive".into()));
        }
        if self.min_speed_kph <= 0.0 || self.max_speed_kph <= self.min_speed_kph {
            return Err(Error::InvalidConfig(
                "speed gates must satisfy 0 < min < max".into(),
            ));
        }
        if self.min_length_m < 0.0 {
            return Err(Error::InvalidConfig("min_length_m must not be negative".into()));
        }
        if self.min_px_per_frame() < 1 {
            return Err(Error::InvalidConfig(format!(
                "min speed resolves to {} px/frame; needs to be at least 1",
                self.min_px_per_frame()
            )));
        }
        Ok(())
    }
}
