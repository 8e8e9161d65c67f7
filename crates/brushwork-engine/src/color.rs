//! Per-pixel color operations: luminance, palette quantization, and
//! saturation adjustment.

use crate::buffer::{Mask, PixelBuffer};

/// Rec. 601 luminance weights for R, G, B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Luminance of one RGB sample triple: `0.299*R + 0.587*G + 0.114*B`.
#[must_use]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    LUMA_WEIGHTS[2].mul_add(rgb[2], LUMA_WEIGHTS[1].mul_add(rgb[1], LUMA_WEIGHTS[0] * rgb[0]))
}

/// Single-channel luminance map of a buffer.
#[must_use]
pub fn luminance_map(buf: &PixelBuffer) -> Mask {
    let samples = buf.samples();
    Mask::from_fn(buf.width(), buf.height(), |x, y| {
        let i = buf.offset(x, y);
        luminance([samples[i], samples[i + 1], samples[i + 2]])
    })
}

/// Reduce each channel to `levels` discrete steps:
/// `round(value * levels) / levels`.
///
/// Idempotent for any `levels >= 1`. A `levels` of zero is treated
/// as one.
#[must_use = "returns the quantized buffer"]
#[allow(clippy::cast_precision_loss)]
pub fn quantize(buf: &PixelBuffer, levels: u32) -> PixelBuffer {
    let levels = levels.max(1) as f32;
    buf.map(|v| (v * levels).round() / levels)
}

/// Scale each pixel's distance from its own gray level by `amount`:
/// `gray + (pixel - gray) * amount`, with `gray` the pixel's luminance.
///
/// `amount > 1` boosts saturation, `amount < 1` desaturates, `0`
/// produces grayscale. Results are not clipped.
#[must_use = "returns the adjusted buffer"]
pub fn adjust_saturation(buf: &PixelBuffer, amount: f32) -> PixelBuffer {
    buf.map_pixels(|_, _, px| {
        let gray = luminance(px);
        px.map(|v| (v - gray).mul_add(amount, gray))
    })
}
