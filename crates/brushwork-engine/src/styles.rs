//! The six style pipelines.
//!
//! Each pipeline is a pure function from a unit-scale buffer to a new
//! unit-scale buffer, composed from the primitives in [`crate::blur`],
//! [`crate::color`], [`crate::edge`], [`crate::mask`], [`crate::noise`]
//! and [`crate::resize`]. Intermediate stages may leave `0.0..=1.0`;
//! every pipeline clips once, as its final step.
//!
//! Dispatch is an exhaustive match on [`StyleId`], so there is no
//! fall-through case: an identifier that does not parse into a
//! `StyleId` never reaches this module.

use rand::Rng;

use crate::blur::{downsample_upsample_blur, pool_average};
use crate::buffer::{PixelBuffer, SampleScale};
use crate::catalog::StyleId;
use crate::color::{adjust_saturation, luminance, quantize};
use crate::edge::sobel_edge_mask;
use crate::mask::{dot_mask, tile_mask};
use crate::noise::{add_gaussian_noise, add_uniform_noise, brightness_jitter, wave_displace};
use crate::resize::{resize_bilinear, resize_nearest, shrink};
use crate::types::EngineError;

/// Watercolor: blur factor.
pub const WATERCOLOR_BLUR_FACTOR: u32 = 4;
/// Watercolor: palette levels per channel.
pub const WATERCOLOR_LEVELS: u32 = 8;
/// Watercolor: saturation multiplier.
pub const WATERCOLOR_SATURATION: f32 = 1.3;
/// Watercolor: paper-texture noise amplitude (uniform, symmetric).
pub const WATERCOLOR_NOISE: f32 = 0.03;

/// Udnie: Sobel threshold for the dark edge lines.
pub const UDNIE_EDGE_THRESHOLD: f32 = 0.2;
/// Udnie: posterization levels per channel.
pub const UDNIE_LEVELS: u32 = 5;

/// Mosaic: tile edge length in pixels.
pub const MOSAIC_TILE_SIZE: u32 = 12;
/// Mosaic: how much grid lines are darkened (0 = not at all, 1 = black).
pub const MOSAIC_GROUT_DARKEN: f32 = 0.5;

/// Pointillism: dot cell size in pixels.
pub const POINTILLISM_DOT_SIZE: u32 = 8;
/// Pointillism: brightness jitter range.
pub const POINTILLISM_JITTER: (f32, f32) = (0.9, 1.1);
/// Pointillism: canvas color shown between dots.
pub const POINTILLISM_CANVAS: [f32; 3] = [0.96, 0.96, 0.94];

/// Starry night: ripple wavelength in pixels.
pub const STARRY_WAVELENGTH: f32 = 15.0;
/// Starry night: ripple amplitude.
pub const STARRY_AMPLITUDE: f32 = 0.1;

/// Oil painting: average-pool kernel size.
pub const OIL_POOL_SIZE: u32 = 4;
/// Oil painting: saturation multiplier.
pub const OIL_SATURATION: f32 = 1.5;
/// Oil painting: blur factor of the unsharp mask.
pub const OIL_SHARPEN_BLUR_FACTOR: u32 = 2;
/// Oil painting: unsharp mask strength.
pub const OIL_SHARPEN_AMOUNT: f32 = 0.5;
/// Oil painting: canvas-texture noise standard deviation.
pub const OIL_NOISE_STDDEV: f32 = 0.05;

/// Run the pipeline for `style` on a unit-scale buffer.
///
/// The result is unit-scale and clipped to `0.0..=1.0`.
///
/// # Errors
///
/// Returns [`EngineError::PipelineFailure`] if `input` is not
/// unit-scale, or if an internal stage meets mismatched buffer shapes.
pub fn render<R: Rng + ?Sized>(
    style: StyleId,
    input: &PixelBuffer,
    rng: &mut R,
) -> Result<PixelBuffer, EngineError> {
    if input.scale() != SampleScale::Unit {
        return Err(EngineError::PipelineFailure(
            "style pipelines expect a unit-scale buffer".to_string(),
        ));
    }
    let styled = match style {
        StyleId::Watercolor => watercolor(input, rng)?,
        StyleId::Udnie => udnie(input)?,
        StyleId::Mosaic => mosaic(input)?,
        StyleId::Pointillism => pointillism(input, rng)?,
        StyleId::StarryNight => starry_night(input),
        StyleId::OilPainting => oil_painting(input, rng)?,
    };
    Ok(styled.clip_unit())
}

/// blur -> quantize -> saturate -> paper noise.
fn watercolor<R: Rng + ?Sized>(input: &PixelBuffer, rng: &mut R) -> Result<PixelBuffer, EngineError> {
    let blurred = downsample_upsample_blur(input, WATERCOLOR_BLUR_FACTOR);
    let quantized = quantize(&blurred, WATERCOLOR_LEVELS);
    let saturated = adjust_saturation(&quantized, WATERCOLOR_SATURATION);
    add_uniform_noise(&saturated, -WATERCOLOR_NOISE, WATERCOLOR_NOISE, rng)
}

/// Posterize, smear horizontally, and draw dark lines on strong edges.
fn udnie(input: &PixelBuffer) -> Result<PixelBuffer, EngineError> {
    let edges = sobel_edge_mask(input, UDNIE_EDGE_THRESHOLD);
    let posterized = quantize(input, UDNIE_LEVELS);
    let (w, h) = (input.width(), input.height());
    let angular = resize_bilinear(&posterized, shrink(w, 2), h);
    let restored = resize_bilinear(&angular, w, h);
    restored.scale_by_mask(&edges, |e| 1.0 - e)
}

/// Pixelate into tiles and darken the grout lines between them.
fn mosaic(input: &PixelBuffer) -> Result<PixelBuffer, EngineError> {
    let (w, h) = (input.width(), input.height());
    let small = resize_bilinear(
        input,
        shrink(w, MOSAIC_TILE_SIZE),
        shrink(h, MOSAIC_TILE_SIZE),
    );
    let pixelated = resize_nearest(&small, w, h);
    let grid = tile_mask(w, h, MOSAIC_TILE_SIZE);
    pixelated.scale_by_mask(&grid, |g| MOSAIC_GROUT_DARKEN.mul_add(-g, 1.0))
}

/// Soft color field sampled into jittered dots on an off-white canvas.
fn pointillism<R: Rng + ?Sized>(input: &PixelBuffer, rng: &mut R) -> Result<PixelBuffer, EngineError> {
    let (w, h) = (input.width(), input.height());
    let small = resize_bilinear(
        input,
        shrink(w, POINTILLISM_DOT_SIZE),
        shrink(h, POINTILLISM_DOT_SIZE),
    );
    let colors = resize_bilinear(&small, w, h);
    let (lo, hi) = POINTILLISM_JITTER;
    let jittered = brightness_jitter(&colors, lo, hi, rng)?;
    let dots = dot_mask(w, h, POINTILLISM_DOT_SIZE);
    Ok(jittered.map_pixels(|x, y, px| {
        let d = dots.get(x, y).unwrap_or(0.0);
        std::array::from_fn(|c| POINTILLISM_CANVAS[c].mul_add(1.0 - d, px[c] * d))
    }))
}

/// Blue/yellow recolor weighted by luminance, plus a diagonal ripple.
fn starry_night(input: &PixelBuffer) -> PixelBuffer {
    let mixed = input.map_pixels(|_, _, [r, g, b]| {
        let lum = luminance([r, g, b]);
        let blue = [r * 0.2, g * 0.5, (b * 1.5).clamp(0.0, 1.0)];
        let yellow = [lum, lum, lum * 0.2];
        std::array::from_fn(|c| yellow[c].mul_add(lum, blue[c] * (1.0 - lum)))
    });
    wave_displace(&mixed, STARRY_WAVELENGTH, STARRY_AMPLITUDE)
}

/// Flatten into strokes, boost color, sharpen stroke edges, add canvas grain.
fn oil_painting<R: Rng + ?Sized>(input: &PixelBuffer, rng: &mut R) -> Result<PixelBuffer, EngineError> {
    let pooled = pool_average(input, OIL_POOL_SIZE);
    let contrast = adjust_saturation(&pooled, OIL_SATURATION);
    let blurred = downsample_upsample_blur(&contrast, OIL_SHARPEN_BLUR_FACTOR);
    let sharpened = contrast.zip_with(&blurred, |c, b| (c - b).mul_add(OIL_SHARPEN_AMOUNT, c))?;
    add_gaussian_noise(&sharpened, 0.0, OIL_NOISE_STDDEV, rng)
}
