//! grid-process: crop grid interface screenshots to their bracket frame.
//!
//! Finds the black bracket drawn around the region of interest in each
//! screenshot, crops just inside it and stretches the result to a fixed
//! output size.
//!
//! # Usage
//!
//! ```text
//! grid-process batch -i screenshots -o processed
//! grid-process batch --width 800 --height 450
//! grid-process single screenshot.png processed.png
//! ```
//!
//! Interrupting a batch with Ctrl-C ends the process with a non-zero
//! status. Files already written stay in place; outputs are renamed into
//! place only once complete, so no half-written PNG is left behind.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod batch;
mod logger;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridcrop_pipeline::{BlackThreshold, PipelineConfig, ResizeFilter};
use tracing::error;

/// Crop grid interface screenshots to their bracket frame and resize them.
#[derive(Parser)]
#[command(name = "grid-process", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every PNG image in a directory.
    #[command(disable_help_flag = true)]
    Batch {
        /// Directory containing the PNG screenshots.
        #[arg(short, long, default_value = "images")]
        input_dir: PathBuf,

        /// Directory for the processed images (created if missing).
        #[arg(short, long, default_value = "images/processed")]
        output_dir: PathBuf,

        #[command(flatten)]
        options: ProcessArgs,
    },

    /// Process a single screenshot.
    #[command(disable_help_flag = true)]
    Single {
        /// Input PNG image.
        input: PathBuf,

        /// Path for the processed image.
        output: PathBuf,

        #[command(flatten)]
        options: ProcessArgs,
    },
}

/// Options shared by both subcommands.
///
/// `-h` is taken by `--height`, so help is only available as `--help`.
#[derive(Args)]
struct ProcessArgs {
    /// Output width in pixels.
    #[arg(short, long, default_value_t = PipelineConfig::DEFAULT_TARGET_WIDTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    width: u32,

    /// Output height in pixels.
    #[arg(short = 'h', long, default_value_t = PipelineConfig::DEFAULT_TARGET_HEIGHT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    height: u32,

    /// Pixels to crop inside the brackets to exclude the black lines.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BRACKET_OFFSET, allow_negative_numbers = true)]
    bracket_offset: i32,

    /// Highest channel value (0-255) still counted as black.
    #[arg(long, default_value_t = BlackThreshold::DEFAULT_CUTOFF)]
    threshold: u8,

    /// Shortest black run in pixels accepted as a bracket line.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MIN_RUN_LENGTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    min_run: u32,

    /// Resampling filter for the resize.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their default values.
    #[arg(long)]
    config_json: Option<String>,

    /// Suppress progress messages.
    #[arg(short, long)]
    quiet: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,

    /// Log per-stage timing for every file.
    #[arg(long)]
    diagnostics: bool,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

/// Resize filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Maps a [`ResizeFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResizeFilter) -> Filter {
    match f {
        ResizeFilter::Nearest => Filter::Nearest,
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from [`PipelineConfig::DEFAULT_RESIZE_FILTER`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(PipelineConfig::DEFAULT_RESIZE_FILTER);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_args(args: &ProcessArgs) -> Result<PipelineConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        black_threshold: BlackThreshold::uniform(args.threshold),
        min_run_length: args.min_run,
        bracket_offset: args.bracket_offset,
        target_width: args.width,
        target_height: args.height,
        resize_filter: match args.filter {
            Filter::Nearest => ResizeFilter::Nearest,
            Filter::Triangle => ResizeFilter::Triangle,
            Filter::CatmullRom => ResizeFilter::CatmullRom,
            Filter::Gaussian => ResizeFilter::Gaussian,
            Filter::Lanczos3 => ResizeFilter::Lanczos3,
        },
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = match &cli.command {
        Command::Batch { options, .. } | Command::Single { options, .. } => options,
    };
    logger::init(options.quiet);

    let config = match config_from_args(options) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match &cli.command {
        Command::Batch {
            input_dir,
            output_dir,
            options,
        } => run_batch(input_dir, output_dir, &config, options),
        Command::Single {
            input,
            output,
            options,
        } => run_single(input, output, &config, options),
    }
}

fn run_batch(
    input_dir: &std::path::Path,
    output_dir: &std::path::Path,
    config: &PipelineConfig,
    options: &ProcessArgs,
) -> ExitCode {
    if !options.quiet && !options.json {
        println!("Grid Interface Image Processor");
        println!("{}", "=".repeat(40));
    }

    let summary = match batch::run_batch(input_dir, output_dir, config, options.diagnostics) {
        Ok(summary) => summary,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else if !options.quiet {
        println!("{}", "=".repeat(50));
        println!("Processing complete!");
        println!("Processed: {}", summary.processed);
        println!("Skipped: {}", summary.skipped);
        for failure in &summary.failures {
            println!("  {} ({}): {}", failure.file, failure.kind, failure.message);
        }
        println!("Processed images saved to: {}", output_dir.display());
    }

    if summary.skipped > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_single(
    input: &std::path::Path,
    output: &std::path::Path,
    config: &PipelineConfig,
    options: &ProcessArgs,
) -> ExitCode {
    match batch::process_file(input, output, config, options.diagnostics) {
        Ok(_) => {
            if !options.quiet {
                println!("Processed {} -> {}", input.display(), output.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process {}: {e}", input.display());
            ExitCode::FAILURE
        }
    }
}
