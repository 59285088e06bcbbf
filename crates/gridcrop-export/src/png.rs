//! PNG export serializer.
//!
//! Encodes an RGB image as a lossless PNG using the strongest
//! compression level and adaptive per-row filtering, which gives the
//! smallest files the `image` crate's encoder can produce.
//!
//! This is a pure function with no I/O -- it returns a `Vec<u8>`.

use image::ImageEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use gridcrop_pipeline::RgbImage;

/// Errors from encoding an output image.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The encoder rejected the image.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode `image` as an optimized PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder fails, e.g. for an
/// image with a zero dimension.
pub fn to_png(image: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}
