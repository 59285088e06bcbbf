//! gridcrop-pipeline: Pure bracket-crop pipeline (sans-IO).
//!
//! Turns a screenshot of the grid interface into a fixed-size image of
//! the region framed by its black bracket:
//! decode -> locate bracket -> resolve crop -> crop -> resize.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and images and returns structured data. Encoding lives in
//! `gridcrop-export`, filesystem interaction in the `gridcrop` CLI.

pub mod crop;
pub mod decode;
pub mod diagnostics;
pub mod locate;
pub mod pipeline;
pub mod resize;
pub mod types;

pub use locate::{Run, Segments};
pub use pipeline::Pipeline;
pub use resize::ResizeFilter;
pub use types::{
    BlackThreshold, BracketCorners, Corner, CropRect, Dimensions, PipelineConfig, PipelineError,
    ProcessResult, RgbImage,
};

/// Run the full pipeline on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`ProcessResult`] holding the output image and the
/// geometry it was cut from.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::NotFound`] if no bracket frame is found.
/// Returns [`PipelineError::InvalidCrop`] if the bracket offset leaves no area.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .locate()?
        .crop()?
        .resize()
        .into_result())
}

/// Run the pipeline on an already decoded image.
///
/// # Errors
///
/// Same as [`process`], minus the decoding errors.
pub fn process_image(
    image: &RgbImage,
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    Ok(Pipeline::from_image(image.clone(), config.clone())?
        .locate()?
        .crop()?
        .resize()
        .into_result())
}
