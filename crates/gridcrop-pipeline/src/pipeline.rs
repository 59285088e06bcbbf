//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use gridcrop_pipeline::{Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let located = Pipeline::new(png, PipelineConfig::default())
//!     .decode()?
//!     .locate()?;
//! println!("bracket at {:?}", located.corners());
//!
//! let result = located.crop()?.resize().into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), making it a compile-time error to
//! skip stages or call them out of order.

use crate::locate::Segments;
use crate::types::{
    BracketCorners, CropRect, Dimensions, PipelineConfig, PipelineError, ProcessResult, RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: PipelineConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the config is invalid,
    /// [`PipelineError::EmptyInput`] if the source bytes are empty, and
    /// [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        self.config.validate()?;
        let image = crate::decode::decode(&self.source)?;
        Ok(Decoded {
            config: self.config,
            image,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`locate`](Self::locate) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .locate() to continue"]
pub struct Decoded {
    config: PipelineConfig,
    image: RgbImage,
}

impl Decoded {
    /// The decoded source image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Dimensions of the source image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }

    /// Find the bracket corners.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] if no complete bracket frame
    /// is present.
    pub fn locate(self) -> Result<Located, PipelineError> {
        let segments = crate::locate::detect_segments(
            &self.image,
            self.config.black_threshold,
            self.config.min_run_length,
        );
        let corners = crate::locate::corners_from_segments(&segments, self.dimensions())?;
        Ok(Located {
            config: self.config,
            image: self.image,
            segments,
            corners,
        })
    }
}

// ───────────────────────── Stage 2: Located ──────────────────────────

/// Pipeline state after the bracket corners have been found.
///
/// Call [`crop`](Self::crop) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .crop() to continue"]
pub struct Located {
    config: PipelineConfig,
    image: RgbImage,
    segments: Segments,
    corners: BracketCorners,
}

impl Located {
    /// The line segments the corners were resolved from.
    #[must_use]
    pub const fn segments(&self) -> &Segments {
        &self.segments
    }

    /// The resolved bracket corners.
    #[must_use]
    pub const fn corners(&self) -> &BracketCorners {
        &self.corners
    }

    /// Apply the bracket offset and cut the interior out of the image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCrop`] if the offset leaves no
    /// area inside the bracket.
    pub fn crop(self) -> Result<Cropped, PipelineError> {
        let source = Dimensions::of(&self.image);
        let rect = crate::crop::resolve_crop(&self.corners, self.config.bracket_offset, source)?;
        let cropped = crate::crop::crop(&self.image, rect);
        tracing::debug!(?rect, "cropped to {}x{}", cropped.width(), cropped.height());
        Ok(Cropped {
            config: self.config,
            corners: self.corners,
            rect,
            cropped,
            source,
        })
    }
}

// ───────────────────────── Stage 3: Cropped ──────────────────────────

/// Pipeline state after cropping. The source image has been dropped.
///
/// Call [`resize`](Self::resize) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .resize() to continue"]
pub struct Cropped {
    config: PipelineConfig,
    corners: BracketCorners,
    rect: CropRect,
    cropped: RgbImage,
    source: Dimensions,
}

impl Cropped {
    /// The crop rectangle in source image coordinates.
    #[must_use]
    pub const fn rect(&self) -> CropRect {
        self.rect
    }

    /// The cropped image, before resizing.
    #[must_use]
    pub const fn cropped(&self) -> &RgbImage {
        &self.cropped
    }

    /// Stretch the cropped image to the configured target size.
    pub fn resize(self) -> Resized {
        let image = crate::resize::resize(
            &self.cropped,
            self.config.target(),
            self.config.resize_filter,
        );
        Resized {
            image,
            corners: self.corners,
            rect: self.rect,
            source: self.source,
        }
    }
}

// ───────────────────────── Stage 4: Resized ──────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() to take the output image"]
pub struct Resized {
    image: RgbImage,
    corners: BracketCorners,
    rect: CropRect,
    source: Dimensions,
}

impl Resized {
    /// The output image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the pipeline and return the [`ProcessResult`].
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            image: self.image,
            corners: self.corners,
            crop: self.rect,
            source: self.source,
        }
    }
}

/// Entry point for the typed pipeline.
///
/// ```rust
/// # use gridcrop_pipeline::{Pipeline, PipelineConfig, PipelineError};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let result = Pipeline::new(png, PipelineConfig::default())
///     .decode()?
///     .locate()?
///     .crop()?
///     .resize()
///     .into_result();
/// # Ok(())
/// # }
/// ```
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed; the bytes and config are simply
    /// stored. Call [`.decode()`](Pending::decode) to begin processing.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already decoded image, skipping the decode stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the config is invalid.
    pub fn from_image(image: RgbImage, config: PipelineConfig) -> Result<Decoded, PipelineError> {
        config.validate()?;
        Ok(Decoded { config, image })
    }
}
