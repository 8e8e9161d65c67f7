//! The file boundary: turning uploaded bytes into a [`PixelBuffer`] and
//! a styled buffer back into PNG bytes.
//!
//! The engine never touches files. These helpers are what an upload or
//! download collaborator uses on either side of it.

use std::fmt;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::buffer::{PixelBuffer, SampleScale};
use crate::catalog::StyleId;

/// Errors at the raster boundary.
///
/// Serializes as its variant with a message string, since
/// `image::ImageError` does not implement serde traits.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The uploaded data was empty.
    #[error("image data is empty")]
    EmptyInput,

    /// The uploaded data exceeds the size ceiling.
    #[error("image is {size} bytes; the limit is {limit} bytes")]
    TooLarge {
        /// Size of the rejected upload in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        limit: usize,
    },

    /// The data is not JPEG, PNG, or WebP.
    #[error("unsupported image format: {0} (expected JPEG, PNG, or WebP)")]
    UnsupportedFormat(String),

    /// The data claims a supported format but could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// PNG encoding failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Only byte-scale buffers can be written out.
    #[error("only byte-scale buffers can be encoded")]
    NotByteScale,
}

#[derive(Serialize)]
enum RasterErrorProxy {
    EmptyInput,
    TooLarge { size: usize, limit: usize },
    UnsupportedFormat(String),
    ImageDecode(String),
    Encode(String),
    NotByteScale,
}

impl Serialize for RasterError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::EmptyInput => RasterErrorProxy::EmptyInput,
            Self::TooLarge { size, limit } => RasterErrorProxy::TooLarge {
                size: *size,
                limit: *limit,
            },
            Self::UnsupportedFormat(s) => RasterErrorProxy::UnsupportedFormat(s.clone()),
            Self::ImageDecode(e) => RasterErrorProxy::ImageDecode(e.to_string()),
            Self::Encode(e) => RasterErrorProxy::Encode(e.to_string()),
            Self::NotByteScale => RasterErrorProxy::NotByteScale,
        };
        proxy.serialize(serializer)
    }
}

/// Resampling filter used when shrinking oversized uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResampleFilter {
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Limits applied to uploads before they reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted upload, in bytes.
    pub max_bytes: usize,
    /// Longest allowed side after ingest; larger images are shrunk with
    /// their aspect ratio preserved.
    pub max_dimension: u32,
    /// Filter used for that shrinking.
    #[serde(default)]
    pub filter: ResampleFilter,
}

impl IngestConfig {
    /// Default upload ceiling: 10 MiB.
    pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;
    /// Default longest side: 1024 px.
    pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_bytes: Self::DEFAULT_MAX_BYTES,
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            filter: ResampleFilter::default(),
        }
    }
}

/// Validate, decode, and downscale an uploaded image.
///
/// The format is sniffed from the content, not trusted from a file
/// name. The result is an 8-bit RGB byte-scale buffer; alpha is
/// dropped.
///
/// # Errors
///
/// - [`RasterError::EmptyInput`] if `bytes` is empty.
/// - [`RasterError::TooLarge`] if `bytes` exceeds `config.max_bytes`.
/// - [`RasterError::UnsupportedFormat`] unless the data is JPEG, PNG,
///   or WebP.
/// - [`RasterError::ImageDecode`] if the data is corrupt.
pub fn ingest(bytes: &[u8], config: &IngestConfig) -> Result<PixelBuffer, RasterError> {
    if bytes.is_empty() {
        return Err(RasterError::EmptyInput);
    }
    if bytes.len() > config.max_bytes {
        return Err(RasterError::TooLarge {
            size: bytes.len(),
            limit: config.max_bytes,
        });
    }

    let format = image::guess_format(bytes)
        .map_err(|_| RasterError::UnsupportedFormat("unrecognized data".to_string()))?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) {
        return Err(RasterError::UnsupportedFormat(format!("{format:?}")));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());
    let fitted = fit_within(decoded, config.max_dimension, config.filter);
    tracing::debug!(
        ?format,
        width,
        height,
        fitted_width = fitted.width(),
        fitted_height = fitted.height(),
        "image ingested",
    );

    PixelBuffer::from_rgb_image(&fitted.to_rgb8()).map_err(|_| RasterError::EmptyInput)
}

/// Shrink so the longest side is at most `max_dimension`, keeping the
/// aspect ratio. Smaller images pass through untouched.
fn fit_within(image: DynamicImage, max_dimension: u32, filter: ResampleFilter) -> DynamicImage {
    let max_dimension = max_dimension.max(1);
    if image.width().max(image.height()) <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, filter.to_image_filter())
}

/// Encode a byte-scale buffer as PNG.
///
/// # Errors
///
/// - [`RasterError::NotByteScale`] for a unit-scale buffer.
/// - [`RasterError::Encode`] if the PNG encoder fails.
pub fn encode_png(buf: &PixelBuffer) -> Result<Vec<u8>, RasterError> {
    if buf.scale() != SampleScale::Byte {
        return Err(RasterError::NotByteScale);
    }
    let rgb = buf.to_rgb_image().map_err(|_| RasterError::NotByteScale)?;
    let mut out = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut out);
    image::ImageEncoder::write_image(
        encoder,
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )
    .map_err(RasterError::Encode)?;
    Ok(out)
}

/// Suggested file name for a styled download, e.g.
/// `styled_starry-night.png`.
///
/// Built from the style's wire identifier, lowercased, with whitespace
/// runs replaced by underscores.
#[must_use]
pub fn download_name(style: StyleId) -> String {
    let id = style.as_str().to_lowercase();
    let slug = id.split_whitespace().collect::<Vec<_>>().join("_");
    format!("styled_{slug}.png")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_rgba(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        });
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_rgba(width, height, ImageFormat::Png)
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = ingest(&[], &IngestConfig::default());
        assert!(matches!(result, Err(RasterError::EmptyInput)));
    }

    #[test]
    fn oversized_upload_is_rejected_before_decoding() {
        let config = IngestConfig {
            max_bytes: 16,
            ..IngestConfig::default()
        };
        let bytes = png(8, 8);
        let result = ingest(&bytes, &config);
        assert!(matches!(
            result,
            Err(RasterError::TooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        let result = ingest(b"definitely not an image", &IngestConfig::default());
        assert!(matches!(result, Err(RasterError::UnsupportedFormat(_))));
    }

    #[test]
    fn gif_is_unsupported() {
        let result = ingest(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;", &IngestConfig::default());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Gif"), "{err}");
    }

    #[test]
    fn corrupt_png_is_a_decode_error() {
        let mut bytes = png(4, 4);
        bytes.truncate(20);
        let result = ingest(&bytes, &IngestConfig::default());
        assert!(matches!(result, Err(RasterError::ImageDecode(_))));
    }

    #[test]
    fn small_png_decodes_to_byte_buffer() {
        let buf = ingest(&png(5, 3), &IngestConfig::default()).unwrap();
        assert_eq!((buf.width(), buf.height()), (5, 3));
        assert_eq!(buf.scale(), SampleScale::Byte);
        assert_eq!(buf.pixel(2, 1), Some([2.0, 1.0, 90.0]));
    }

    #[test]
    fn jpeg_is_accepted() {
        let img = image::RgbImage::from_pixel(6, 6, image::Rgb([200, 100, 50]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageFormat::Jpeg)
            .unwrap();
        let buf = ingest(&bytes.into_inner(), &IngestConfig::default()).unwrap();
        assert_eq!((buf.width(), buf.height()), (6, 6));
    }

    #[test]
    fn landscape_is_shrunk_preserving_aspect() {
        let config = IngestConfig {
            max_dimension: 50,
            ..IngestConfig::default()
        };
        let buf = ingest(&png(200, 100), &config).unwrap();
        assert_eq!((buf.width(), buf.height()), (50, 25));
    }

    #[test]
    fn portrait_is_shrunk_preserving_aspect() {
        let config = IngestConfig {
            max_dimension: 40,
            ..IngestConfig::default()
        };
        let buf = ingest(&png(60, 120), &config).unwrap();
        assert_eq!((buf.width(), buf.height()), (20, 40));
    }

    #[test]
    fn exact_limit_is_left_alone() {
        let config = IngestConfig {
            max_dimension: 32,
            ..IngestConfig::default()
        };
        let buf = ingest(&png(32, 10), &config).unwrap();
        assert_eq!((buf.width(), buf.height()), (32, 10));
    }

    #[test]
    fn encode_png_round_trips_pixels() {
        let buf = PixelBuffer::from_fn(3, 2, SampleScale::Byte, |x, y| {
            #[allow(clippy::cast_precision_loss)]
            [x as f32 * 40.0, y as f32 * 100.0, 255.0]
        })
        .unwrap();
        let bytes = encode_png(&buf).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let back = ingest(&bytes, &IngestConfig::default()).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn encode_png_requires_byte_scale() {
        let buf = PixelBuffer::filled(2, 2, SampleScale::Unit, [0.5; 3]).unwrap();
        assert!(matches!(encode_png(&buf), Err(RasterError::NotByteScale)));
    }

    #[test]
    fn download_names() {
        assert_eq!(download_name(StyleId::StarryNight), "styled_starry-night.png");
        assert_eq!(download_name(StyleId::Watercolor), "styled_watercolor.png");
        assert_eq!(download_name(StyleId::Udnie), "styled_udnie.png");
        assert_eq!(download_name(StyleId::OilPainting), "styled_oil-painting.png");
        for style in StyleId::ALL {
            let name = download_name(style);
            assert!(
                name.chars().all(|c| c.is_ascii_alphanumeric() || "_-.".contains(c)),
                "{name}"
            );
        }
    }

    #[test]
    fn errors_serialize_with_messages() {
        let err = RasterError::TooLarge { size: 20, limit: 10 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["TooLarge"]["limit"], 10);

        let mut bytes = png(4, 4);
        bytes.truncate(20);
        let decode_err = ingest(&bytes, &IngestConfig::default()).unwrap_err();
        let json = serde_json::to_value(&decode_err).unwrap();
        assert!(json["ImageDecode"].is_string());
    }

    #[test]
    fn config_defaults_and_serde() {
        let config = IngestConfig::default();
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_dimension, 1024);
        let back: IngestConfig =
            serde_json::from_str(r#"{"max_bytes":100,"max_dimension":64}"#).unwrap();
        assert_eq!(back.filter, ResampleFilter::Triangle);
    }
}
