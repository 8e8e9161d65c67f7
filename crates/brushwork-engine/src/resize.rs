//! Point-sampled resizing of unit-scale buffers.
//!
//! Both resamplers map output pixel `d` to source coordinate
//! `d * (in_size / out_size)` (corner-aligned, no half-pixel offset),
//! which is what gives the style pipelines their characteristic soft
//! blur and blocky pixelation. Neither clamps sample values, so
//! buffers that have transiently left `0.0..=1.0` resize faithfully.
//!
//! `image::imageops::resize` is not used here: its kernels average
//! over the filter support when shrinking and clamp `f32` samples to
//! `0.0..=1.0`.

use crate::buffer::{CHANNELS, PixelBuffer};

/// Source-space step per output pixel.
#[allow(clippy::cast_precision_loss)]
fn scale(in_size: u32, out_size: u32) -> f32 {
    in_size as f32 / out_size as f32
}

/// Divide a dimension by `factor`, never going below one pixel.
///
/// A `factor` of zero is treated as one.
#[must_use]
pub const fn shrink(size: u32, factor: u32) -> u32 {
    let factor = if factor == 0 { 1 } else { factor };
    let shrunk = size / factor;
    if shrunk == 0 { 1 } else { shrunk }
}

/// Resize with bilinear interpolation to `width` x `height`.
///
/// Zero target dimensions are raised to one pixel.
#[must_use = "returns the resized buffer"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn resize_bilinear(buf: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    let (width, height) = (width.max(1), height.max(1));
    let (in_w, in_h) = (buf.width(), buf.height());
    let (sx, sy) = (scale(in_w, width), scale(in_h, height));
    let src = buf.samples();

    let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
    for y in 0..height {
        let fy = y as f32 * sy;
        let y0 = (fy.floor() as u32).min(in_h - 1);
        let y1 = (y0 + 1).min(in_h - 1);
        let dy = fy - y0 as f32;
        for x in 0..width {
            let fx = x as f32 * sx;
            let x0 = (fx.floor() as u32).min(in_w - 1);
            let x1 = (x0 + 1).min(in_w - 1);
            let dx = fx - x0 as f32;

            let (tl, tr) = (buf.offset(x0, y0), buf.offset(x1, y0));
            let (bl, br) = (buf.offset(x0, y1), buf.offset(x1, y1));
            for c in 0..CHANNELS {
                let top = (src[tr + c] - src[tl + c]).mul_add(dx, src[tl + c]);
                let bottom = (src[br + c] - src[bl + c]).mul_add(dx, src[bl + c]);
                data.push((bottom - top).mul_add(dy, top));
            }
        }
    }
    PixelBuffer::from_parts(width, height, buf.scale(), data)
}

/// Resize with nearest-neighbor sampling to `width` x `height`.
///
/// Zero target dimensions are raised to one pixel.
#[must_use = "returns the resized buffer"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn resize_nearest(buf: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    let (width, height) = (width.max(1), height.max(1));
    let (in_w, in_h) = (buf.width(), buf.height());
    let (sx, sy) = (scale(in_w, width), scale(in_h, height));
    let src = buf.samples();

    let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
    for y in 0..height {
        let src_y = ((y as f32 * sy).floor() as u32).min(in_h - 1);
        for x in 0..width {
            let src_x = ((x as f32 * sx).floor() as u32).min(in_w - 1);
            let i = buf.offset(src_x, src_y);
            data.extend_from_slice(&src[i..i + CHANNELS]);
        }
    }
    PixelBuffer::from_parts(width, height, buf.scale(), data)
}
