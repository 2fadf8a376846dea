// src/error.rs

use thiserror::Error;

/// Contract violations at the public boundaries of the core.
///
/// These signal programmer error in the caller, never a transient
/// condition. Nothing in this crate retries after one of these; the
/// host decides whether to abort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("rectangle {x},{y} {w}x{h} not contained in {image_w}x{image_h} view")]
    OutOfBounds {
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        image_w: usize,
        image_h: usize,
    },

    #[error("invalid pixel buffer layout: {0}")]
    InvalidLayout(String),

    #[error("patch {patch_w}x{patch_h} larger than search image {image_w}x{image_h}")]
    PatchTooLarge {
        patch_w: usize,
        patch_h: usize,
        image_w: usize,
        image_h: usize,
    },

    #[error("patch has zero area")]
    EmptyPatch,

    #[error("offset ({x}, {y}) outside valid range [0, {max_x}] x [0, {max_y}]")]
    OffsetOutOfRange { x: i64, y: i64, max_x: i64, max_y: i64 },

    #[error("image size mismatch: {left_w}x{left_h} vs {right_w}x{right_h}")]
    SizeMismatch {
        left_w: usize,
        left_h: usize,
        right_w: usize,
        right_h: usize,
    },

    #[error("timestamp went backwards: {prev_ms}ms -> {next_ms}ms")]
    NonMonotonicTimestamp { prev_ms: f64, next_ms: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
