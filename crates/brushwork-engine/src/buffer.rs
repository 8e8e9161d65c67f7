//! In-memory raster buffers shared by every pipeline stage.
//!
//! [`PixelBuffer`] is a flat `width * height * 3` array of `f32` color
//! samples in row-major RGB order. A buffer is tagged with the
//! [`SampleScale`] its samples are expressed in: byte scale (`0..=255`)
//! at the ingress/egress boundary, unit scale (`0.0..=1.0`) between
//! pipeline stages.
//!
//! [`Mask`] is the single-channel companion used for edge, grid, and
//! dot masks; it is broadcast across the three color channels when
//! applied to a buffer.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, EngineError};

/// Number of color channels in a [`PixelBuffer`].
pub const CHANNELS: usize = 3;

/// Value range a [`PixelBuffer`]'s samples are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleScale {
    /// Integer-valued samples in `0..=255` (decoded or encodable pixels).
    #[default]
    Byte,
    /// Normalized samples, nominally `0.0..=1.0`.
    ///
    /// Intermediate stages may leave this range transiently; pipelines
    /// clip at their boundary.
    Unit,
}

/// An RGB raster image as a flat sample array plus dimensions.
///
/// Invariant: `data.len() == width * height * CHANNELS`. Enforced by
/// every constructor; the fields are private so it cannot be broken
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    scale: SampleScale,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Wrap an existing sample vector.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if either dimension is
    /// zero, `data.len()` does not equal `width * height * 3`, or any
    /// sample is NaN or infinite.
    pub fn new(
        width: u32,
        height: u32,
        scale: SampleScale,
        data: Vec<f32>,
    ) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::PipelineFailure(format!(
                "buffer dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = sample_count(width, height);
        if data.len() != expected {
            return Err(EngineError::PipelineFailure(format!(
                "buffer of {width}x{height} needs {expected} samples, got {}",
                data.len()
            )));
        }
        let buf = Self {
            width,
            height,
            scale,
            data,
        };
        buf.ensure_finite()?;
        Ok(buf)
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if either dimension is
    /// zero or `f` produces a non-finite sample.
    pub fn from_fn(
        width: u32,
        height: u32,
        scale: SampleScale,
        mut f: impl FnMut(u32, u32) -> [f32; CHANNELS],
    ) -> Result<Self, EngineError> {
        let mut data = Vec::with_capacity(sample_count(width, height));
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, scale, data)
    }

    /// A buffer where every pixel has the same color.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if either dimension is zero.
    pub fn filled(
        width: u32,
        height: u32,
        scale: SampleScale,
        color: [f32; CHANNELS],
    ) -> Result<Self, EngineError> {
        Self::from_fn(width, height, scale, |_, _| color)
    }

    /// Copy an 8-bit RGB image into a byte-scale buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if the image is empty.
    pub fn from_rgb_image(image: &RgbImage) -> Result<Self, EngineError> {
        let data = image.as_raw().iter().map(|&v| f32::from(v)).collect();
        Self::new(image.width(), image.height(), SampleScale::Byte, data)
    }

    /// Convert a byte-scale buffer into an 8-bit RGB image.
    ///
    /// Samples are rounded and clamped to `0..=255`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if the buffer is not
    /// byte-scale.
    pub fn to_rgb_image(&self) -> Result<RgbImage, EngineError> {
        if self.scale != SampleScale::Byte {
            return Err(EngineError::PipelineFailure(
                "only byte-scale buffers convert to 8-bit images".to_string(),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw: Vec<u8> = self
            .data
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        RgbImage::from_raw(self.width, self.height, raw).ok_or_else(|| {
            EngineError::PipelineFailure("sample count does not match dimensions".to_string())
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// The value range the samples are expressed in.
    #[must_use]
    pub const fn scale(&self) -> SampleScale {
        self.scale
    }

    /// All samples in row-major RGB order.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Consume the buffer and return its sample vector.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.data
    }

    /// Color of the pixel at `(x, y)`.
    ///
    /// Returns `None` when the coordinate lies outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; CHANNELS]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Iterate over pixels as `[r, g, b]` slices in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Apply `f` to every sample, producing a new buffer of the same
    /// shape and scale.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        self.map_samples(self.scale, f)
    }

    /// Apply `f(x, y, [r, g, b])` to every pixel, producing a new buffer
    /// of the same shape and scale.
    #[must_use]
    pub fn map_pixels(&self, mut f: impl FnMut(u32, u32, [f32; CHANNELS]) -> [f32; CHANNELS]) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for (i, px) in self.data.chunks_exact(CHANNELS).enumerate() {
            let (x, y) = self.coords(i);
            data.extend_from_slice(&f(x, y, [px[0], px[1], px[2]]));
        }
        self.with_data(self.scale, data)
    }

    /// Combine two equally-sized buffers sample by sample.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if the dimensions differ.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Result<Self, EngineError> {
        self.ensure_same_shape(other.dimensions())?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(self.with_data(self.scale, data))
    }

    /// Multiply every pixel by `weight(mask)` at the same position,
    /// broadcast across channels.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] if the mask's dimensions
    /// differ from the buffer's.
    pub fn scale_by_mask(&self, mask: &Mask, weight: impl Fn(f32) -> f32) -> Result<Self, EngineError> {
        self.ensure_same_shape(mask.dimensions())?;
        let mut data = Vec::with_capacity(self.data.len());
        for (px, &m) in self.data.chunks_exact(CHANNELS).zip(mask.values()) {
            let w = weight(m);
            data.extend(px.iter().map(|v| v * w));
        }
        Ok(self.with_data(self.scale, data))
    }

    /// Clamp every sample to `0.0..=1.0`.
    #[must_use]
    pub fn clip_unit(&self) -> Self {
        self.map(|v| v.clamp(0.0, 1.0))
    }

    /// Rescale a byte-scale buffer to unit scale. Unit-scale buffers are
    /// returned as-is.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self.scale {
            SampleScale::Unit => self.clone(),
            SampleScale::Byte => self.map_samples(SampleScale::Unit, |v| v / 255.0),
        }
    }

    /// Rescale a unit-scale buffer to byte scale, rounding to the nearest
    /// integer and clipping to `0..=255`. Byte-scale buffers are rounded
    /// and clipped in place of rescaling.
    #[must_use]
    pub fn denormalized(&self) -> Self {
        let factor = match self.scale {
            SampleScale::Unit => 255.0,
            SampleScale::Byte => 1.0,
        };
        self.map_samples(SampleScale::Byte, |v| (v * factor).round().clamp(0.0, 255.0))
    }

    /// Fail if any sample is NaN or infinite.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PipelineFailure`] naming the first offending
    /// pixel.
    pub fn ensure_finite(&self) -> Result<(), EngineError> {
        match self.data.iter().position(|v| !v.is_finite()) {
            None => Ok(()),
            Some(i) => {
                let (x, y) = self.coords(i / CHANNELS);
                Err(EngineError::PipelineFailure(format!(
                    "non-finite sample {} at ({x}, {y})",
                    self.data[i]
                )))
            }
        }
    }

    /// Fail unless `dims` match this buffer's dimensions.
    pub(crate) fn ensure_same_shape(&self, dims: Dimensions) -> Result<(), EngineError> {
        if dims == self.dimensions() {
            Ok(())
        } else {
            Err(EngineError::PipelineFailure(format!(
                "shape mismatch: {}x{} vs {}x{}",
                self.width, self.height, dims.width, dims.height
            )))
        }
    }

    /// Build a sibling buffer with the same dimensions.
    ///
    /// Callers guarantee `data` has the right length.
    pub(crate) const fn with_data(&self, scale: SampleScale, data: Vec<f32>) -> Self {
        Self {
            width: self.width,
            height: self.height,
            scale,
            data,
        }
    }

    /// Build a buffer of new dimensions from a correctly-sized sample vector.
    pub(crate) const fn from_parts(
        width: u32,
        height: u32,
        scale: SampleScale,
        data: Vec<f32>,
    ) -> Self {
        Self {
            width,
            height,
            scale,
            data,
        }
    }

    /// Flat index of the red sample of pixel `(x, y)`.
    pub(crate) const fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn coords(&self, pixel_index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((pixel_index % w) as u32, (pixel_index / w) as u32)
    }

    fn map_samples(&self, scale: SampleScale, f: impl Fn(f32) -> f32) -> Self {
        self.with_data(scale, self.data.iter().map(|&v| f(v)).collect())
    }
}

/// A single-channel `f32` mask with the same layout as a [`PixelBuffer`].
///
/// Binary masks hold exactly `0.0` or `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Mask {
    /// Build a mask by evaluating `f(x, y)` for every position.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Mask value at `(x, y)`, or `None` outside the mask.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// All values in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of positions where the mask is non-zero.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0.0).count()
    }
}

const fn sample_count(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
