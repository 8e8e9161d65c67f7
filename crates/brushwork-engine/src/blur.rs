//! Smoothing primitives: resize-based blur and average pooling.
//!
//! [`downsample_upsample_blur`] softens an image without a convolution
//! kernel by shrinking it and stretching it back with bilinear
//! interpolation. [`pool_average`] flattens neighborhoods into patches
//! of near-uniform color, the "brushstroke" look of the oil-painting
//! style.

use crate::buffer::{CHANNELS, PixelBuffer};
use crate::resize::{resize_bilinear, shrink};

/// Blur by shrinking both dimensions by `factor` and resizing back.
///
/// Output dimensions equal input dimensions. A `factor` of zero or one
/// leaves the image unchanged.
#[must_use = "returns the blurred buffer"]
pub fn downsample_upsample_blur(buf: &PixelBuffer, factor: u32) -> PixelBuffer {
    let (w, h) = (buf.width(), buf.height());
    let small = resize_bilinear(buf, shrink(w, factor), shrink(h, factor));
    resize_bilinear(&small, w, h)
}

/// Average-pool with stride 1 and same-size output.
///
/// Each output pixel is the mean of the `kernel_size` x `kernel_size`
/// window around it. For even kernels the window extends one pixel
/// further right/down than left/up. Positions falling outside the image
/// are excluded from the mean rather than treated as zero, so borders
/// do not darken.
///
/// A `kernel_size` of zero or one returns the image unchanged.
#[must_use = "returns the pooled buffer"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
pub fn pool_average(buf: &PixelBuffer, kernel_size: u32) -> PixelBuffer {
    if kernel_size <= 1 {
        return buf.clone();
    }
    let (w, h) = (i64::from(buf.width()), i64::from(buf.height()));
    let k = i64::from(kernel_size);
    let before = (k - 1) / 2;
    let src = buf.samples();

    let mut data = Vec::with_capacity(src.len());
    for y in 0..h {
        let (y_lo, y_hi) = ((y - before).max(0), (y - before + k).min(h));
        for x in 0..w {
            let (x_lo, x_hi) = ((x - before).max(0), (x - before + k).min(w));
            let mut sum = [0.0_f32; CHANNELS];
            for sy in y_lo..y_hi {
                for sx in x_lo..x_hi {
                    let i = buf.offset(sx as u32, sy as u32);
                    for (c, acc) in sum.iter_mut().enumerate() {
                        *acc += src[i + c];
                    }
                }
            }
            let count = ((y_hi - y_lo) * (x_hi - x_lo)) as f32;
            data.extend(sum.iter().map(|s| s / count));
        }
    }
    buf.with_data(buf.scale(), data)
}
