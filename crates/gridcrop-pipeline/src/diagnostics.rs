//! Pipeline diagnostics: timing and counts for each stage.
//!
//! [`process_with_diagnostics`] drives the typed [`Pipeline`] one stage
//! at a time and records how long each step took together with the
//! metrics meaningful for that step.
//!
//! Timestamps come from a caller-supplied [`Clock`] so this crate stays
//! free of platform time sources.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::resize::ResizeFilter;
use crate::types::{BracketCorners, CropRect, PipelineConfig, PipelineError, ProcessResult};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: bracket location.
    pub locate: StageDiagnostics,
    /// Stage 2: crop resolution and cropping.
    pub crop: StageDiagnostics,
    /// Stage 3: resize to the target size.
    pub resize: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
    },
    /// Bracket location metrics.
    Locate {
        /// Horizontal runs at least the minimum run length.
        horizontal_runs: usize,
        /// Vertical runs at least the minimum run length.
        vertical_runs: usize,
        /// The resolved corners.
        corners: BracketCorners,
    },
    /// Crop metrics.
    Crop {
        /// Applied bracket offset.
        offset: i32,
        /// The crop rectangle.
        rect: CropRect,
    },
    /// Resize metrics.
    Resize {
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
        /// Filter used.
        filter: ResizeFilter,
    },
}

impl StageMetrics {
    /// One-line human-readable summary of the metrics.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Decode {
                input_bytes,
                width,
                height,
            } => format!("{input_bytes} bytes -> {width}x{height}"),
            Self::Locate {
                horizontal_runs,
                vertical_runs,
                corners,
            } => format!(
                "{horizontal_runs} h-runs, {vertical_runs} v-runs, \
                 corners ({}, {}) ({}, {}) ({}, {}) ({}, {})",
                corners.top_left.x,
                corners.top_left.y,
                corners.top_right.x,
                corners.top_right.y,
                corners.bottom_left.x,
                corners.bottom_left.y,
                corners.bottom_right.x,
                corners.bottom_right.y,
            ),
            Self::Crop { offset, rect } => format!(
                "offset {offset}, rect ({}, {}, {}, {}) = {}x{}",
                rect.left,
                rect.top,
                rect.right,
                rect.bottom,
                rect.width(),
                rect.height(),
            ),
            Self::Resize {
                width,
                height,
                filter,
            } => format!("{width}x{height} ({filter})"),
        }
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl PipelineDiagnostics {
    /// Human-readable multi-line report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Locate", &self.locate),
            ("Crop", &self.crop),
            ("Resize", &self.resize),
        ];

        for (name, stage) in stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{name:<12} {ms:>8.3}ms {pct:>9.1}%  {}",
                stage.metrics.summary()
            ));
        }

        lines.join("\n")
    }
}

/// Run the full pipeline, timing each stage with `clock`.
///
/// # Errors
///
/// Returns the same errors as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let dims = decoded.dimensions();
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dims.width,
            height: dims.height,
        },
    };

    let t = clock.now();
    let located = decoded.locate()?;
    let locate = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Locate {
            horizontal_runs: located.segments().horizontal.len(),
            vertical_runs: located.segments().vertical.len(),
            corners: *located.corners(),
        },
    };

    let t = clock.now();
    let cropped = located.crop()?;
    let crop = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Crop {
            offset: config.bracket_offset,
            rect: cropped.rect(),
        },
    };

    let t = clock.now();
    let resized = cropped.resize();
    let resize = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Resize {
            width: resized.image().width(),
            height: resized.image().height(),
            filter: config.resize_filter,
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        locate,
        crop,
        resize,
        total_duration: clock.elapsed(&start),
    };
    Ok((resized.into_result(), diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::locate::tests::{blank, fixture};

    /// Clock that advances one millisecond on every reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn png(img: &image::RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn collects_metrics_for_every_stage() {
        let bytes = png(&fixture());
        let (result, diag) =
            process_with_diagnostics(&bytes, &PipelineConfig::default(), &TickClock(Cell::new(0)))
                .unwrap();

        assert_eq!(result.image.dimensions(), (670, 366));
        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                width: 100,
                height: 100,
                ..
            }
        ));
        assert!(matches!(
            diag.locate.metrics,
            StageMetrics::Locate {
                horizontal_runs: 2,
                vertical_runs: 2,
                ..
            }
        ));
        assert!(matches!(
            diag.crop.metrics,
            StageMetrics::Crop { offset: 2, .. }
        ));
        assert!(diag.total_duration >= diag.decode.duration + diag.locate.duration);
    }

    #[test]
    fn errors_pass_through() {
        let bytes = png(&blank(30, 30));
        let result =
            process_with_diagnostics(&bytes, &PipelineConfig::default(), &TickClock(Cell::new(0)));
        assert!(matches!(result, Err(PipelineError::NotFound)));
    }

    #[test]
    fn report_lists_all_stages() {
        let bytes = png(&fixture());
        let (_, diag) =
            process_with_diagnostics(&bytes, &PipelineConfig::default(), &TickClock(Cell::new(0)))
                .unwrap();
        let report = diag.report();
        for stage in ["Decode", "Locate", "Crop", "Resize"] {
            assert!(report.contains(stage), "missing {stage} in report");
        }
        assert!(report.contains("(12, 12, 88, 88) = 77x77"));
    }

    #[test]
    fn diagnostics_serialize_to_json() {
        let bytes = png(&fixture());
        let (_, diag) =
            process_with_diagnostics(&bytes, &PipelineConfig::default(), &TickClock(Cell::new(0)))
                .unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decode.duration, diag.decode.duration);
    }
}
