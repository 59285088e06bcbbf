//! Crop-rectangle resolution and cropping.
//!
//! Turns the four bracket corners into an inclusive [`CropRect`] moved
//! `offset` pixels inward from each bracket line, then cuts that
//! rectangle out of the source image.
//!
//! Corners from a slightly rotated screenshot need not share rows and
//! columns exactly. Each edge is taken as the midpoint of its two
//! corners, rounded half up. Axis-aligned corners are unaffected.

use image::RgbImage;

use crate::types::{BracketCorners, CropRect, Dimensions, PipelineError};

/// Midpoint of two coordinates, rounded half up.
fn midpoint(a: u32, b: u32) -> i64 {
    (i64::from(a) + i64::from(b) + 1) / 2
}

/// Compute the crop rectangle inside the bracket.
///
/// ```text
/// left   = mid(top_left.x,    bottom_left.x)  + offset
/// top    = mid(top_left.y,    top_right.y)    + offset
/// right  = mid(top_right.x,   bottom_right.x) - offset
/// bottom = mid(bottom_left.y, bottom_right.y) - offset
/// ```
///
/// The result is clamped to the image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidCrop`] if, after clamping,
/// `left >= right` or `top >= bottom`.
pub fn resolve_crop(
    corners: &BracketCorners,
    offset: i32,
    dimensions: Dimensions,
) -> Result<CropRect, PipelineError> {
    let offset = i64::from(offset);
    let left = midpoint(corners.top_left.x, corners.bottom_left.x) + offset;
    let top = midpoint(corners.top_left.y, corners.top_right.y) + offset;
    let right = midpoint(corners.top_right.x, corners.bottom_right.x) - offset;
    let bottom = midpoint(corners.bottom_left.y, corners.bottom_right.y) - offset;

    let invalid = || PipelineError::InvalidCrop {
        left,
        top,
        right,
        bottom,
    };

    let max_x = i64::from(dimensions.width) - 1;
    let max_y = i64::from(dimensions.height) - 1;

    let clamped_left = left.max(0);
    let clamped_top = top.max(0);
    let clamped_right = right.min(max_x);
    let clamped_bottom = bottom.min(max_y);

    if clamped_left >= clamped_right || clamped_top >= clamped_bottom {
        return Err(invalid());
    }

    let to_u32 = |v: i64| u32::try_from(v).map_err(|_| invalid());
    Ok(CropRect {
        left: to_u32(clamped_left)?,
        top: to_u32(clamped_top)?,
        right: to_u32(clamped_right)?,
        bottom: to_u32(clamped_bottom)?,
    })
}

/// Copy the pixels inside `rect` into a new image.
///
/// `rect` must lie inside `image`, as guaranteed by [`resolve_crop`].
#[must_use = "returns the cropped image"]
pub fn crop(image: &RgbImage, rect: CropRect) -> RgbImage {
    image::imageops::crop_imm(image, rect.left, rect.top, rect.width(), rect.height()).to_image()
}
