// src/testutil.rs
//
// Deterministic synthetic images for the test suite. A hash of the
// pixel coordinate stands in for scene texture, so frames can be
// "shifted" by any amount without wrap-around artifacts.

use crate::view::{Gray, OwnedImage, Rgba};

/// Deterministic byte for a scene coordinate and channel.
pub(crate) fn hash_byte(x: i64, y: i64, channel: i64) -> u8 {
    let mut h = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ (channel as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    (h & 0xFF) as u8
}

/// RGBA value of the synthetic scene at a coordinate.
pub(crate) fn rgba_pattern_at(x: i64, y: i64) -> [u8; 4] {
    [
        hash_byte(x, y, 0),
        hash_byte(x, y, 1),
        hash_byte(x, y, 2),
        255,
    ]
}

/// Grayscale noise image, scene coordinates equal image coordinates.
pub(crate) fn noise_gray(w: usize, h: usize) -> OwnedImage<Gray> {
    shifted_gray(w, h, 0)
}

/// RGBA noise image, scene coordinates equal image coordinates.
pub(crate) fn noise_rgba(w: usize, h: usize) -> OwnedImage<Rgba> {
    shifted_rgba(w, h, 0)
}

/// Grayscale frame showing the scene displaced `shift` pixels to the
/// left: pixel x renders scene coordinate x + shift.
pub(crate) fn shifted_gray(w: usize, h: usize, shift: i64) -> OwnedImage<Gray> {
    let mut data = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            data.push(hash_byte(x as i64 + shift, y as i64, 0));
        }
    }
    OwnedImage::new(data, w, h).unwrap()
}

/// RGBA frame showing the scene displaced `shift` pixels to the left.
pub(crate) fn shifted_rgba(w: usize, h: usize, shift: i64) -> OwnedImage<Rgba> {
    let mut data = Vec::with_capacity(w * h * 4);
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&rgba_pattern_at(x as i64 + shift, y as i64));
        }
    }
    OwnedImage::new(data, w, h).unwrap()
}
