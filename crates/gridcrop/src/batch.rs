//! File-level driver: read, process, encode and write one file at a time.
//!
//! Every failure is local to its file. A batch run records it in the
//! [`Summary`] and moves on; nothing is written for a failed file.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gridcrop_export::ExportError;
use gridcrop_pipeline::diagnostics::{Clock, process_with_diagnostics};
use gridcrop_pipeline::{PipelineConfig, PipelineError, ProcessResult};
use serde::Serialize;
use tracing::{info, warn};

/// Why a single file was skipped.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The pipeline rejected the image.
    #[error("{}: {source}", path.display())]
    Pipeline {
        /// Input path.
        path: PathBuf,
        /// Pipeline failure.
        source: PipelineError,
    },

    /// The output image could not be encoded.
    #[error("failed to encode output for {}: {source}", path.display())]
    Export {
        /// Input path.
        path: PathBuf,
        /// Encoder failure.
        source: ExportError,
    },

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl FileError {
    /// Short machine-readable failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Pipeline { source, .. } => match source {
                PipelineError::ImageDecode(_) | PipelineError::EmptyInput => "decode",
                PipelineError::InvalidConfig(_) => "config",
                PipelineError::NotFound => "not-found",
                PipelineError::InvalidCrop { .. } => "invalid-crop",
            },
            Self::Export { .. } => "encode",
            Self::Write { .. } => "write",
        }
    }
}

/// Errors that stop a batch before any file is processed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The input directory is missing or not a directory.
    #[error("input directory '{}' not found", .0.display())]
    MissingInput(PathBuf),

    /// The input directory could not be listed.
    #[error("failed to list {}: {source}", path.display())]
    ListInput {
        /// Input directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutput {
        /// Output directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// One skipped file in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// Input file name.
    pub file: String,
    /// Failure kind, see [`FileError::kind`].
    pub kind: &'static str,
    /// Full error message.
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    /// Files written successfully.
    pub processed: usize,
    /// Files skipped because of an error.
    pub skipped: usize,
    /// Details for each skipped file, in processing order.
    pub failures: Vec<Failure>,
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Process `input` and write the result to `output`.
///
/// The output's parent directory is created if needed. Nothing is
/// written unless every stage, including encoding, succeeded.
///
/// When `diagnostics` is set, a per-stage timing report is logged.
///
/// # Errors
///
/// Returns a [`FileError`] describing the first stage that failed.
pub fn process_file(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    diagnostics: bool,
) -> Result<ProcessResult, FileError> {
    info!("Processing {}", display_name(input));
    let bytes = fs::read(input).map_err(|source| FileError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let pipeline_error = |source| FileError::Pipeline {
        path: input.to_path_buf(),
        source,
    };
    let result = if diagnostics {
        let (result, diag) =
            process_with_diagnostics(&bytes, config, &StdClock).map_err(pipeline_error)?;
        info!("{}", diag.report());
        result
    } else {
        gridcrop_pipeline::process(&bytes, config).map_err(pipeline_error)?
    };

    info!(
        "  Source size: {}x{}",
        result.source.width, result.source.height
    );
    info!(
        "  Cropped to: {}x{}",
        result.crop.width(),
        result.crop.height()
    );
    info!(
        "  Resized to: {}x{}",
        result.image.width(),
        result.image.height()
    );

    let encoded = gridcrop_export::to_png(&result.image).map_err(|source| FileError::Export {
        path: input.to_path_buf(),
        source,
    })?;

    write_output(output, &encoded).map_err(|source| FileError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!("  Saved: {}", output.display());

    Ok(result)
}

/// Write `bytes` to `output` through a temporary file in the same
/// directory, so `output` is either absent or complete.
///
/// An interrupted run can leave a `.tmp*` file behind but never a
/// truncated PNG.
fn write_output(output: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.persist(output).map_err(|e| e.error)?;
    Ok(())
}

/// List the PNG files directly inside `dir`, sorted by name.
///
/// The extension match is case-insensitive.
fn list_pngs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Process every PNG in `input_dir` into `output_dir`, keeping file names.
///
/// Files are processed sequentially in name order. A failed file is
/// logged at `warn`, recorded in the summary and skipped.
///
/// # Errors
///
/// Returns a [`BatchError`] if the input directory cannot be listed or
/// the output directory cannot be created. Per-file failures are never
/// returned as errors.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    diagnostics: bool,
) -> Result<Summary, BatchError> {
    if !input_dir.is_dir() {
        return Err(BatchError::MissingInput(input_dir.to_path_buf()));
    }

    let files = list_pngs(input_dir).map_err(|source| BatchError::ListInput {
        path: input_dir.to_path_buf(),
        source,
    })?;
    if files.is_empty() {
        info!("No PNG files found in {}", input_dir.display());
        return Ok(Summary::default());
    }

    fs::create_dir_all(output_dir).map_err(|source| BatchError::CreateOutput {
        path: output_dir.to_path_buf(),
        source,
    })?;

    info!("Found {} PNG files to process", files.len());
    info!(
        "Target size: {}x{}",
        config.target_width, config.target_height
    );

    let mut summary = Summary::default();
    for input in &files {
        let name = display_name(input);
        let output = output_dir.join(&name);
        match process_file(input, &output, config, diagnostics) {
            Ok(_) => summary.processed += 1,
            Err(e) => {
                warn!(kind = e.kind(), "Skipping {name}: {e}");
                summary.skipped += 1;
                summary.failures.push(Failure {
                    file: name,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
