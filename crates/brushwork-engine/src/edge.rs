//! Horizontal Sobel edge mask.
//!
//! Converts a buffer to luminance, correlates it with the 3x3
//! horizontal Sobel kernel, and binarizes the absolute response. Pixels
//! outside the image count as zero, so strong responses can appear along
//! the left and right borders of bright images.

use crate::buffer::{Mask, PixelBuffer};
use crate::color::luminance_map;

/// Horizontal Sobel kernel, row-major, `[dy][dx]`.
pub const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];

/// Binary mask that is `1.0` where `|Gx| > threshold`, `0.0` elsewhere.
///
/// `Gx` is the horizontal Sobel response of the buffer's luminance.
#[must_use = "returns the edge mask"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sobel_edge_mask(buf: &PixelBuffer, threshold: f32) -> Mask {
    let luma = luminance_map(buf);
    let (w, h) = (i64::from(buf.width()), i64::from(buf.height()));
    let sample = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0.0
        } else {
            luma.get(x as u32, y as u32).unwrap_or(0.0)
        }
    };

    Mask::from_fn(buf.width(), buf.height(), |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let mut gx = 0.0_f32;
        for (ky, row) in (-1_i64..=1).zip(SOBEL_X.iter()) {
            for (kx, weight) in (-1_i64..=1).zip(row.iter()) {
                gx = weight.mul_add(sample(x + kx, y + ky), gx);
            }
        }
        if gx.abs() > threshold { 1.0 } else { 0.0 }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::buffer::SampleScale;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn vertical_edge() -> PixelBuffer {
        PixelBuffer::from_fn(20, 20, SampleScale::Unit, |x, _| {
            if x < 10 { [0.0; 3] } else { [1.0; 3] }
        })
        .unwrap()
    }

    #[test]
    fn uniform_black_has_no_edges() {
        let buf = PixelBuffer::filled(8, 8, SampleScale::Unit, [0.0; 3]).unwrap();
        assert_eq!(sobel_edge_mask(&buf, 0.2).count_set(), 0);
    }

    #[test]
    fn detects_vertical_boundary() {
        let mask = sobel_edge_mask(&vertical_edge(), 0.2);
        // Columns 9 and 10 straddle the boundary.
        assert_eq!(mask.get(9, 10), Some(1.0));
        assert_eq!(mask.get(10, 10), Some(1.0));
        // Far from the boundary and the borders there is no response.
        assert_eq!(mask.get(4, 10), Some(0.0));
        assert_eq!(mask.get(15, 10), Some(0.0));
    }

    #[test]
    fn ignores_horizontal_boundary_in_interior() {
        let buf = PixelBuffer::from_fn(20, 20, SampleScale::Unit, |_, y| {
            if y < 10 { [0.0; 3] } else { [1.0; 3] }
        })
        .unwrap();
        let mask = sobel_edge_mask(&buf, 0.2);
        assert_eq!(mask.get(10, 9), Some(0.0));
        assert_eq!(mask.get(10, 10), Some(0.0));
    }

    #[test]
    fn zero_padding_marks_bright_borders() {
        let buf = PixelBuffer::filled(6, 6, SampleScale::Unit, [1.0; 3]).unwrap();
        let mask = sobel_edge_mask(&buf, 0.2);
        assert_eq!(mask.get(0, 3), Some(1.0));
        assert_eq!(mask.get(5, 3), Some(1.0));
        assert_eq!(mask.get(3, 3), Some(0.0));
    }

    #[test]
    fn threshold_above_peak_response_finds_nothing() {
        // Peak response at the boundary is 4.0 (1 + 2 + 1).
        assert!(sobel_edge_mask(&vertical_edge(), 3.9).count_set() > 0);
        assert_eq!(sobel_edge_mask(&vertical_edge(), 4.1).count_set(), 0);
    }

    #[test]
    fn mask_matches_buffer_dimensions() {
        let buf = PixelBuffer::filled(7, 3, SampleScale::Unit, [0.5; 3]).unwrap();
        assert_eq!(sobel_edge_mask(&buf, 0.2).dimensions(), buf.dimensions());
    }
}
