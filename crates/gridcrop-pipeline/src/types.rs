//! Shared types for the gridcrop processing pipeline.

use serde::{Deserialize, Serialize};

use crate::resize::ResizeFilter;

/// Re-export `RgbImage` so downstream crates can reference decoded and
/// processed raster data without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Per-channel cutoff deciding which pixels count as bracket ink.
///
/// A pixel is black when every channel is at or below its cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackThreshold {
    /// Red channel cutoff.
    pub red: u8,
    /// Green channel cutoff.
    pub green: u8,
    /// Blue channel cutoff.
    pub blue: u8,
}

impl BlackThreshold {
    /// Default cutoff applied to all three channels.
    pub const DEFAULT_CUTOFF: u8 = 30;

    /// Same cutoff for every channel.
    #[must_use]
    pub const fn uniform(cutoff: u8) -> Self {
        Self {
            red: cutoff,
            green: cutoff,
            blue: cutoff,
        }
    }

    /// Whether `pixel` is classified as black.
    #[must_use]
    pub const fn is_black(self, pixel: &image::Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        r <= self.red && g <= self.green && b <= self.blue
    }
}

impl Default for BlackThreshold {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_CUTOFF)
    }
}

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Corner {
    /// Create a new corner.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// The four corners of a detected bracket frame.
///
/// Each corner sits on the outer edge of the bracket lines, i.e. the
/// first black pixel reached when scanning in from that image corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketCorners {
    /// Where the top and left lines meet.
    pub top_left: Corner,
    /// Where the top and right lines meet.
    pub top_right: Corner,
    /// Where the bottom and left lines meet.
    pub bottom_left: Corner,
    /// Where the bottom and right lines meet.
    pub bottom_right: Corner,
}

impl BracketCorners {
    /// Whether the corners are ordered like a rectangle: left corners
    /// strictly left of right corners and top corners strictly above
    /// bottom corners.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.top_left.x < self.top_right.x
            && self.bottom_left.x < self.bottom_right.x
            && self.top_left.y < self.bottom_left.y
            && self.top_right.y < self.bottom_right.y
    }

    /// Whether corners sharing an edge agree to within `tolerance`
    /// pixels: both top corners on nearly the same row, both left
    /// corners on nearly the same column, and so on.
    #[must_use]
    pub const fn is_aligned(&self, tolerance: u32) -> bool {
        self.top_left.y.abs_diff(self.top_right.y) <= tolerance
            && self.bottom_left.y.abs_diff(self.bottom_right.y) <= tolerance
            && self.top_left.x.abs_diff(self.bottom_left.x) <= tolerance
            && self.top_right.x.abs_diff(self.bottom_right.x) <= tolerance
    }

    /// Area of the bounding box spanned by the four corners.
    #[must_use]
    pub fn bounding_area(&self) -> u64 {
        let left = self.top_left.x.min(self.bottom_left.x);
        let right = self.top_right.x.max(self.bottom_right.x);
        let top = self.top_left.y.min(self.top_right.y);
        let bottom = self.bottom_left.y.max(self.bottom_right.y);
        u64::from(right.saturating_sub(left) + 1) * u64::from(bottom.saturating_sub(top) + 1)
    }
}

/// Crop rectangle in pixel coordinates, inclusive on every side.
///
/// A rectangle with `left == 12` and `right == 88` covers 77 columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// First column kept.
    pub left: u32,
    /// First row kept.
    pub top: u32,
    /// Last column kept.
    pub right: u32,
    /// Last row kept.
    pub bottom: u32,
}

impl CropRect {
    /// Number of columns covered.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Configuration for the processing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cutoff classifying a pixel as bracket ink.
    pub black_threshold: BlackThreshold,

    /// Shortest black run, in pixels, accepted as part of a bracket
    /// line. Must exceed the bracket line thickness and any noise.
    pub min_run_length: u32,

    /// Pixels to move inward from each bracket line before cropping.
    /// Negative values grow the crop outward.
    pub bracket_offset: i32,

    /// Output width in pixels.
    pub target_width: u32,

    /// Output height in pixels.
    pub target_height: u32,

    /// Resampling filter for the final resize.
    pub resize_filter: ResizeFilter,
}

impl PipelineConfig {
    /// Default shortest bracket run.
    pub const DEFAULT_MIN_RUN_LENGTH: u32 = 10;
    /// Default inset from the bracket lines.
    pub const DEFAULT_BRACKET_OFFSET: i32 = 2;
    /// Default output width.
    pub const DEFAULT_TARGET_WIDTH: u32 = 670;
    /// Default output height.
    pub const DEFAULT_TARGET_HEIGHT: u32 = 366;
    /// Default resize filter.
    pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Lanczos3;

    /// The output size as [`Dimensions`].
    #[must_use]
    pub const fn target(&self) -> Dimensions {
        Dimensions {
            width: self.target_width,
            height: self.target_height,
        }
    }

    /// Check the configuration before running the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if either target
    /// dimension or the minimum run length is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height,
            )));
        }
        if self.min_run_length == 0 {
            return Err(PipelineError::InvalidConfig(
                "minimum run length must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            black_threshold: BlackThreshold::default(),
            min_run_length: Self::DEFAULT_MIN_RUN_LENGTH,
            bracket_offset: Self::DEFAULT_BRACKET_OFFSET,
            target_width: Self::DEFAULT_TARGET_WIDTH,
            target_height: Self::DEFAULT_TARGET_HEIGHT,
            resize_filter: Self::DEFAULT_RESIZE_FILTER,
        }
    }
}

/// Result of running the full pipeline on one image.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The cropped and resized output image.
    pub image: RgbImage,
    /// Corners of the detected bracket.
    pub corners: BracketCorners,
    /// The rectangle cut from the source image.
    pub crop: CropRect,
    /// Dimensions of the source image.
    pub source: Dimensions,
}

/// Errors that can occur during pipeline processing.
///
/// Every variant is local to a single image; none of them should stop a
/// batch.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// No complete bracket frame was found.
    #[error("bracket corners not found")]
    NotFound,

    /// The offset crop rectangle has no area left after clamping.
    ///
    /// Carries the rectangle before clamping.
    #[error("crop rectangle ({left}, {top}, {right}, {bottom}) has no area")]
    InvalidCrop {
        /// Computed left column.
        left: i64,
        /// Computed top row.
        top: i64,
        /// Computed right column.
        right: i64,
        /// Computed bottom row.
        bottom: i64,
    },
}
