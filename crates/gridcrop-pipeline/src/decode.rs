//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an
//! 8-bit RGB image for the bracket locator.
//!
//! This is the first step in the pipeline: raw bytes in, `RgbImage` out.

use image::RgbImage;

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB image.
///
/// Supports whatever formats the `image` crate was built with. An alpha
/// channel, if present, is discarded without blending.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}
