//! Procedural binary masks: tile grid lines and pointillist dots.
//!
//! Both masks depend only on pixel coordinates, never on image content.

use crate::buffer::Mask;

/// Grid-line mask: `1.0` on every row and column whose index is a
/// multiple of `tile_size`, `0.0` elsewhere.
///
/// Row 0 and column 0 are always grid lines. A `tile_size` of zero is
/// treated as one (every pixel is a grid line).
#[must_use = "returns the grid mask"]
pub fn tile_mask(width: u32, height: u32, tile_size: u32) -> Mask {
    let tile = tile_size.max(1);
    Mask::from_fn(width, height, |x, y| {
        if x % tile == 0 || y % tile == 0 { 1.0 } else { 0.0 }
    })
}

/// Dot mask: `1.0` where the squared distance from a pixel to the center
/// of its `dot_size`-aligned cell is below `dot_size`, `0.0` elsewhere.
///
/// Cell centers sit at `cell_origin + dot_size / 2`. A `dot_size` of
/// zero is treated as one.
#[must_use = "returns the dot mask"]
#[allow(clippy::cast_precision_loss)]
pub fn dot_mask(width: u32, height: u32, dot_size: u32) -> Mask {
    let dot = dot_size.max(1);
    let half = dot as f32 / 2.0;
    let limit = dot as f32;
    Mask::from_fn(width, height, |x, y| {
        let cx = (x / dot * dot) as f32 + half;
        let cy = (y / dot * dot) as f32 + half;
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        if dx.mul_add(dx, dy * dy) < limit { 1.0 } else { 0.0 }
    })
}
