// src/view.rs
//
// Stride-aware views over raw pixel buffers.
//
// The capture layer hands the core 8-bit RGBA frames with an arbitrary
// row stride. An ImageView borrows such a buffer without copying;
// an OwnedImage holds a packed deep copy. Two pixel layouts are
// carried: single-channel luminance and four-channel RGBA.

use std::marker::PhantomData;

use image::{GrayImage, RgbaImage};

use crate::error::{Error, Result};

/// Marker for the pixel layout of a view or owned image.
pub trait Pixel: Copy + Sync + 'static {
    const CHANNELS: usize;
}

/// Single-channel 8-bit luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gray;

/// Four-channel 8-bit RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba;

impl Pixel for Gray {
    const CHANNELS: usize = 1;
}

impl Pixel for Rgba {
    const CHANNELS: usize = 4;
}

/// Rectangle in pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }
}

// ============================================================================
// Borrowed view
// ============================================================================

/// Non-owning rectangular window into a pixel buffer.
///
/// The caller guarantees the backing buffer outlives the view; the
/// borrow checker enforces it. All operations treat the pixels as
/// read-only.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, P: Pixel> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    _pixel: PhantomData<P>,
}

impl<'a, P: Pixel> ImageView<'a, P> {
    /// Wraps a raw buffer. `data` must start at the first pixel;
    /// `stride` is in bytes and may exceed `width * channels` for
    /// padded rows.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> Result<Self> {
        let row_bytes = width * P::CHANNELS;
        if stride < row_bytes {
            return Err(Error::InvalidLayout(format!(
                "stride {} smaller than row of {} bytes",
                stride, row_bytes
            )));
        }
        let needed = if height == 0 {
            0
        } else {
            (height - 1) * stride + row_bytes
        };
        if data.len() < needed {
            return Err(Error::InvalidLayout(format!(
                "buffer of {} bytes too small for {}x{} with stride {}",
                data.len(),
                width,
                height,
                stride
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            _pixel: PhantomData,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn channels(&self) -> usize {
        P::CHANNELS
    }

    /// Pixel bytes of row `y`, exactly `width * channels` long.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * P::CHANNELS]
    }

    /// The `channels` bytes of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &'a [u8] {
        let start = y * self.stride + x * P::CHANNELS;
        &self.data[start..start + P::CHANNELS]
    }

    /// A view of `rect` within this view. The new view shares the
    /// backing buffer and keeps the parent stride.
    pub fn sub_view(&self, rect: Rect) -> Result<ImageView<'a, P>> {
        if rect.x + rect.w > self.width || rect.y + rect.h > self.height {
            return Err(Error::OutOfBounds {
                x: rect.x,
                y: rect.y,
                w: rect.w,
                h: rect.h,
                image_w: self.width,
                image_h: self.height,
            });
        }
        // a zero-area rect at the far edge may index past the buffer
        let offset = (rect.y * self.stride + rect.x * P::CHANNELS).min(self.data.len());
        Ok(ImageView {
            data: &self.data[offset..],
            width: rect.w,
            height: rect.h,
            stride: self.stride,
            _pixel: PhantomData,
        })
    }

    /// Deep copy into a packed buffer with the origin reset to (0, 0).
    pub fn to_owned_image(&self) -> OwnedImage<P> {
        let row_bytes = self.width * P::CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * self.height);
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
            _pixel: PhantomData,
        }
    }
}

impl<'a> ImageView<'a, Rgba> {
    /// Converts to luminance with the conventional weights
    /// Y = 0.299 R + 0.587 G + 0.114 B, rounded to nearest. Alpha is
    /// ignored.
    pub fn to_gray(&self) -> OwnedImage<Gray> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for px in self.row(y).chunks_exact(4) {
                let lum = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32 + 500)
                    / 1000;
                data.push(lum as u8);
            }
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
            _pixel: PhantomData,
        }
    }

    /// Borrows an `image::RgbaImage` without copying.
    pub fn of_image(img: &'a RgbaImage) -> Self {
        let w = img.width() as usize;
        let h = img.height() as usize;
        Self {
            data: img.as_raw(),
            width: w,
            height: h,
            stride: w * 4,
            _pixel: PhantomData,
        }
    }
}

impl<'a> ImageView<'a, Gray> {
    /// Borrows an `image::GrayImage` without copying.
    pub fn of_image(img: &'a GrayImage) -> Self {
        let w = img.width() as usize;
        let h = img.height() as usize;
        Self {
            data: img.as_raw(),
            width: w,
            height: h,
            stride: w,
            _pixel: PhantomData,
        }
    }
}

// ============================================================================
// Owned image
// ============================================================================

/// Packed, exclusively owned pixel buffer.
#[derive(Debug, Clone)]
pub struct OwnedImage<P: Pixel> {
    data: Vec<u8>,
    width: usize,
    height: usize,
    _pixel: PhantomData<P>,
}

impl<P: Pixel> OwnedImage<P> {
    /// Takes ownership of a packed buffer. `data` must be exactly
    /// `width * height * channels` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        let expected = width * height * P::CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidLayout(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            _pixel: PhantomData,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn view(&self) -> ImageView<'_, P> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * P::CHANNELS,
            _pixel: PhantomData,
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl OwnedImage<Rgba> {
    pub fn from_image(img: &RgbaImage) -> Self {
        ImageView::<Rgba>::of_image(img).to_owned_image()
    }

    pub fn into_image(self) -> RgbaImage {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.data)
            .expect("packed buffer matches dimensions")
    }
}

impl OwnedImage<Gray> {
    pub fn from_image(img: &GrayImage) -> Self {
        ImageView::<Gray>::of_image(img).to_owned_image()
    }

    pub fn into_image(self) -> GrayImage {
        GrayImage::from_raw(self.width as u32, self.height as u32, self.data)
            .expect("packed buffer matches dimensions")
    }
}

/// Mean luminance and mean absolute deviation of a grayscale view,
/// both normalized to [0, 1]. Observability only.
pub fn luminance_stats(img: &ImageView<'_, Gray>) -> (f64, f64) {
    let n = (img.width() * img.height()) as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mut sum = 0.0f64;
    for y in 0..img.height() {
        sum += img.row(y).iter().map(|&p| p as f64).sum::<f64>();
    }
    let mean = sum / n;
    let mut dev = 0.0f64;
    for y in 0..img.height() {
        dev += img.row(y).iter().map(|&p| (p as f64 - mean).abs()).sum::<f64>();
    }
    (mean / 255.0, dev / n / 255.0)
}
