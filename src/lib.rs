//! # train-panorama
//!
//! Watches a fixed camera pointed at a track segment and assembles one
//! long panoramic image of every train that passes, along with its
//! estimated length, speed and direction.
//!
//! The pipeline is synchronous and single-threaded: the host feeds
//! timestamped RGBA frames into an [`AutoStitcher`], which measures the
//! frame-to-frame displacement by template matching, decides when a
//! pass begins and ends, fits a smooth speed curve to the noisy
//! per-frame displacements, and composites the recorded frames into a
//! panorama. Template matching itself fans out over candidate offsets
//! internally.
//!
//! ## Example
//!
//! ```rust,ignore
//! use train_panorama::{AutoStitcher, Config, ImageView, Rgba};
//!
//! let mut stitcher = AutoStitcher::new(Config::load("config.yaml")?)?;
//! for (buffer, timestamp_ms) in camera {
//!     let frame = ImageView::<Rgba>::new(&buffer, width, height, stride)?;
//!     if let Some(train) = stitcher.frame(&frame, timestamp_ms)? {
//!         println!("{:?}", train.summary());
//!     }
//! }
//! stitcher.finalize()?;
//! ```

pub mod auto_stitcher;
pub mod config;
pub mod error;
pub mod metrics;
pub mod offset_estimator;
pub mod sequence;
pub mod source;
pub mod stitching;
pub mod template_match;
pub mod types;
pub mod view;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use auto_stitcher::{AutoStitcher, StitcherState, GOOD_SCORE_MOVE, GOOD_SCORE_NO_MOVE};
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::{AtomicMetrics, FitResultLabel, FrameDisposition, MetricsSink, NoopMetrics};
pub use offset_estimator::{estimate_offset, OffsetEstimate};
pub use sequence::{Sequence, MAX_SEQ_LEN};
pub use source::{run_source, BufferedSource, FrameSource};
pub use stitching::{fit_and_stitch, Rejection};
pub use template_match::{score_at, search, search_scalar, Match};
pub use types::{Direction, TrainEvent, TrainSummary};
pub use view::{Gray, ImageView, OwnedImage, Pixel, Rect, Rgba};
