//! Bracket locator: find the four corners of the black bracket frame.
//!
//! Detection and geometry are split into two pure steps:
//!
//! 1. [`detect_segments`] scans every row and every column for runs of
//!    contiguous black pixels at least `min_run_length` long. Shorter
//!    runs are either noise or the cross-section of a perpendicular
//!    bracket line, so they are dropped here.
//! 2. [`resolve_corners`] looks for junctions where a horizontal and a
//!    vertical run both end, i.e. the outer point of an L. Junctions of
//!    filled black areas are not lines and are dropped. The outermost
//!    set of four junctions that lines up into a rectangle is the
//!    bracket.
//!
//! Working from junctions handles both full rectangular frames and four
//! separate L-shaped corner marks anywhere in the image, and tolerates
//! corners up to [`ALIGNMENT_TOLERANCE`] pixels out of line. The crop
//! resolver decides how to reconcile such corners. Bracket lines must
//! be thinner than the minimum run length, otherwise their cross
//! sections are runs too and the frame reads as a filled area.
//!
//! Pixels are classified lazily during the scans; no boolean mask is
//! materialized.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::types::{BlackThreshold, BracketCorners, Corner, Dimensions, PipelineError};

/// A maximal run of black pixels along one row or column.
///
/// For a horizontal run `line` is the row and `start..=end` the
/// columns; for a vertical run `line` is the column and `start..=end`
/// the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Row (horizontal run) or column (vertical run) index.
    pub line: u32,
    /// First black pixel along the line.
    pub start: u32,
    /// Last black pixel along the line (inclusive).
    pub end: u32,
}

impl Run {
    /// Number of pixels in the run.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Whether the run contains position `pos` along its line.
    #[must_use]
    pub const fn covers(&self, pos: u32) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Candidate bracket line segments found by [`detect_segments`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segments {
    /// Runs found in row scans, ordered by row then column.
    pub horizontal: Vec<Run>,
    /// Runs found in column scans, ordered by column then row.
    pub vertical: Vec<Run>,
}

impl Segments {
    /// Returns `true` if no runs were found in either direction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }
}

/// Scan all rows and columns for black runs of at least
/// `min_run_length` pixels.
#[must_use = "returns the detected segments"]
pub fn detect_segments(
    image: &RgbImage,
    threshold: BlackThreshold,
    min_run_length: u32,
) -> Segments {
    let (width, height) = image.dimensions();

    let horizontal = (0..height)
        .flat_map(|y| {
            runs_along(y, width, min_run_length, |x| {
                threshold.is_black(image.get_pixel(x, y))
            })
        })
        .collect();

    let vertical = (0..width)
        .flat_map(|x| {
            runs_along(x, height, min_run_length, |y| {
                threshold.is_black(image.get_pixel(x, y))
            })
        })
        .collect();

    Segments {
        horizontal,
        vertical,
    }
}

/// Collect the black runs along a single line of `length` pixels.
fn runs_along(
    line: u32,
    length: u32,
    min_run_length: u32,
    is_black: impl Fn(u32) -> bool,
) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut open: Option<u32> = None;

    for pos in 0..length {
        match (open, is_black(pos)) {
            (None, true) => open = Some(pos),
            (Some(start), false) => {
                push_run(&mut runs, line, start, pos - 1, min_run_length);
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        push_run(&mut runs, line, start, length - 1, min_run_length);
    }

    runs
}

fn push_run(runs: &mut Vec<Run>, line: u32, start: u32, end: u32, min_run_length: u32) {
    let run = Run { line, start, end };
    if run.len() >= min_run_length {
        runs.push(run);
    }
}

/// Largest disagreement, in pixels, between two corners on the same
/// bracket edge. Corners further apart are taken to be on different
/// lines.
pub const ALIGNMENT_TOLERANCE: u32 = 2;

/// Which corner of the bracket a junction can be.
#[derive(Debug, Clone, Copy)]
enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Whether the two arms leave the corner towards +x and towards +y.
    const fn arms(self) -> (bool, bool) {
        match self {
            Self::TopLeft => (true, true),
            Self::TopRight => (false, true),
            Self::BottomLeft => (true, false),
            Self::BottomRight => (false, false),
        }
    }
}

/// Runs grouped by the row or column they lie on.
struct RunIndex {
    rows: Vec<Vec<Run>>,
    cols: Vec<Vec<Run>>,
}

impl RunIndex {
    fn new(segments: &Segments, dimensions: Dimensions) -> Self {
        Self {
            rows: group_by_line(&segments.horizontal, dimensions.height),
            cols: group_by_line(&segments.vertical, dimensions.width),
        }
    }

    fn col(&self, x: u32) -> &[Run] {
        self.cols
            .get(x as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn row(&self, y: u32) -> &[Run] {
        self.rows
            .get(y as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `(x, y)` lies on a horizontal run.
    fn row_covers(&self, x: u32, y: u32) -> bool {
        self.row(y).iter().any(|r| r.covers(x))
    }

    /// Whether `(x, y)` lies on a vertical run.
    fn col_covers(&self, x: u32, y: u32) -> bool {
        self.col(x).iter().any(|r| r.covers(y))
    }
}

fn group_by_line(runs: &[Run], lines: u32) -> Vec<Vec<Run>> {
    let mut grouped = vec![Vec::new(); lines as usize];
    for run in runs {
        if let Some(line) = grouped.get_mut(run.line as usize) {
            line.push(*run);
        }
    }
    grouped
}

/// Junctions that can serve as the `quadrant` corner.
///
/// A top-left corner is a point where a horizontal run starts and a
/// vertical run starts, so both arms point into the bracket and the
/// point itself is the outer edge of both lines. The other quadrants
/// mirror this.
fn corner_candidates(index: &RunIndex, quadrant: Quadrant) -> Vec<Corner> {
    let (rightward, downward) = quadrant.arms();
    index
        .rows
        .iter()
        .flatten()
        .filter_map(|&horizontal| {
            let x = if rightward {
                horizontal.start
            } else {
                horizontal.end
            };
            let y = horizontal.line;
            let vertical = *index.col(x).iter().find(|v| {
                if downward { v.start == y } else { v.end == y }
            })?;
            let corner = Corner::new(x, y);
            is_line_corner(index, corner, horizontal, vertical, rightward, downward)
                .then_some(corner)
        })
        .collect()
}

/// Whether the two runs meeting at `corner` are thin lines and not the
/// edges of a filled black area.
///
/// Walking along the horizontal arm, the first columns belong to the
/// vertical line and carry vertical runs through `corner.y`. A line
/// leaves that band before its arm ends; a filled area never does. The
/// vertical arm is checked the same way.
fn is_line_corner(
    index: &RunIndex,
    corner: Corner,
    horizontal: Run,
    vertical: Run,
    rightward: bool,
    downward: bool,
) -> bool {
    let vertical_band = (0..horizontal.len())
        .map(|d| if rightward { corner.x + d } else { corner.x - d })
        .take_while(|&x| index.col_covers(x, corner.y))
        .count();
    let horizontal_band = (0..vertical.len())
        .map(|d| if downward { corner.y + d } else { corner.y - d })
        .take_while(|&y| index.row_covers(corner.x, y))
        .count();
    vertical_band < horizontal.len() as usize && horizontal_band < vertical.len() as usize
}

/// Resolve the four bracket corners from detected segments.
///
/// Every junction where a horizontal and a vertical run both end, with
/// their free ends pointing the same way as one bracket corner, is a
/// candidate for that corner. Junctions of thick black areas are
/// rejected. Candidates are then combined into
/// rectangles whose corners sharing an edge agree within
/// [`ALIGNMENT_TOLERANCE`], and the outermost (largest) rectangle wins.
/// The position of the bracket in the image does not matter.
///
/// Returns `None` if no combination of candidates forms an ordered,
/// aligned rectangle.
#[must_use]
pub fn resolve_corners(segments: &Segments, dimensions: Dimensions) -> Option<BracketCorners> {
    let index = RunIndex::new(segments, dimensions);
    let [top_lefts, top_rights, bottom_lefts, bottom_rights] =
        Quadrant::ALL.map(|q| corner_candidates(&index, q));

    let mut best: Option<BracketCorners> = None;
    for &top_left in &top_lefts {
        let same_row = top_rights
            .iter()
            .filter(|c| c.x > top_left.x && c.y.abs_diff(top_left.y) <= ALIGNMENT_TOLERANCE);
        for &top_right in same_row {
            let same_col = bottom_lefts
                .iter()
                .filter(|c| c.y > top_left.y && c.x.abs_diff(top_left.x) <= ALIGNMENT_TOLERANCE);
            for &bottom_left in same_col {
                for &bottom_right in &bottom_rights {
                    let corners = BracketCorners {
                        top_left,
                        top_right,
                        bottom_left,
                        bottom_right,
                    };
                    let better =
                        best.is_none_or(|b| corners.bounding_area() > b.bounding_area());
                    if better && corners.is_ordered() && corners.is_aligned(ALIGNMENT_TOLERANCE) {
                        best = Some(corners);
                    }
                }
            }
        }
    }
    best
}

/// Locate the bracket frame in `image`.
///
/// # Errors
///
/// Returns [`PipelineError::NotFound`] if the four corners cannot be
/// resolved into an ordered rectangle. There is no best-effort fallback.
pub fn locate(
    image: &RgbImage,
    threshold: BlackThreshold,
    min_run_length: u32,
) -> Result<BracketCorners, PipelineError> {
    let segments = detect_segments(image, threshold, min_run_length);
    corners_from_segments(&segments, Dimensions::of(image))
}

/// [`resolve_corners`] with logging, mapping a miss to
/// [`PipelineError::NotFound`].
pub(crate) fn corners_from_segments(
    segments: &Segments,
    dimensions: Dimensions,
) -> Result<BracketCorners, PipelineError> {
    tracing::debug!(
        horizontal = segments.horizontal.len(),
        vertical = segments.vertical.len(),
        "detected bracket segments"
    );
    let corners = resolve_corners(segments, dimensions).ok_or(PipelineError::NotFound)?;
    tracing::debug!(?corners, "resolved bracket corners");
    Ok(corners)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);
    const BLACK: image::Rgb<u8> = image::Rgb([0, 0, 0]);

    pub(crate) fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, WHITE)
    }

    pub(crate) fn hline(img: &mut RgbImage, y: u32, x0: u32, x1: u32, color: image::Rgb<u8>) {
        for x in x0..=x1 {
            img.put_pixel(x, y, color);
        }
    }

    pub(crate) fn vline(img: &mut RgbImage, x: u32, y0: u32, y1: u32, color: image::Rgb<u8>) {
        for y in y0..=y1 {
            img.put_pixel(x, y, color);
        }
    }

    /// Draw a closed black frame whose outer edge is `(x0, y0)`-`(x1, y1)`.
    pub(crate) fn frame(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, thickness: u32) {
        for t in 0..thickness {
            hline(img, y0 + t, x0, x1, BLACK);
            hline(img, y1 - t, x0, x1, BLACK);
            vline(img, x0 + t, y0, y1, BLACK);
            vline(img, x1 - t, y0, y1, BLACK);
        }
    }

    /// The 100x100 fixture: 1 px frame at x,y in {10, 90}.
    pub(crate) fn fixture() -> RgbImage {
        let mut img = blank(100, 100);
        frame(&mut img, 10, 10, 90, 90, 1);
        img
    }

    fn corners(tl: (u32, u32), tr: (u32, u32), bl: (u32, u32), br: (u32, u32)) -> BracketCorners {
        BracketCorners {
            top_left: Corner::new(tl.0, tl.1),
            top_right: Corner::new(tr.0, tr.1),
            bottom_left: Corner::new(bl.0, bl.1),
            bottom_right: Corner::new(br.0, br.1),
        }
    }

    fn locate_default(img: &RgbImage) -> Result<BracketCorners, PipelineError> {
        locate(img, BlackThreshold::default(), 10)
    }

    // --- detect_segments ---

    #[test]
    fn runs_along_finds_interior_and_trailing_runs() {
        let line = [0, 1, 1, 1, 0, 0, 1, 1];
        let runs = runs_along(7, 8, 2, |i| line[i as usize] == 1);
        assert_eq!(
            runs,
            vec![
                Run {
                    line: 7,
                    start: 1,
                    end: 3
                },
                Run {
                    line: 7,
                    start: 6,
                    end: 7
                },
            ]
        );
    }

    #[test]
    fn runs_along_drops_short_runs() {
        let line = [1, 0, 1, 1, 0, 1];
        let runs = runs_along(0, 6, 2, |i| line[i as usize] == 1);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, 2);
        assert_eq!(runs[0].len(), 2);
    }

    #[test]
    fn fixture_segments_are_the_four_lines() {
        let segments = detect_segments(&fixture(), BlackThreshold::default(), 10);
        let rows: Vec<u32> = segments.horizontal.iter().map(|r| r.line).collect();
        let cols: Vec<u32> = segments.vertical.iter().map(|r| r.line).collect();
        assert_eq!(rows, vec![10, 90]);
        assert_eq!(cols, vec![10, 90]);
        assert!(segments.horizontal.iter().all(|r| r.start == 10 && r.end == 90));
    }

    #[test]
    fn white_image_has_no_segments() {
        let segments = detect_segments(&blank(40, 30), BlackThreshold::default(), 10);
        assert!(segments.is_empty());
    }

    #[test]
    fn gray_pixels_follow_threshold() {
        let mut img = blank(50, 50);
        hline(&mut img, 5, 5, 40, image::Rgb([25, 25, 25]));

        let loose = detect_segments(&img, BlackThreshold::uniform(30), 10);
        assert_eq!(loose.horizontal.len(), 1);

        let strict = detect_segments(&img, BlackThreshold::uniform(0), 10);
        assert!(strict.horizontal.is_empty());
    }

    // --- locate ---

    #[test]
    fn fixture_corners() {
        let found = locate_default(&fixture()).unwrap();
        assert_eq!(found, corners((10, 10), (90, 10), (10, 90), (90, 90)));
    }

    #[test]
    fn locate_is_deterministic() {
        let img = fixture();
        assert_eq!(locate_default(&img).unwrap(), locate_default(&img).unwrap());

        let white = blank(64, 64);
        assert!(matches!(locate_default(&white), Err(PipelineError::NotFound)));
        assert!(matches!(locate_default(&white), Err(PipelineError::NotFound)));
    }

    #[test]
    fn all_white_is_not_found() {
        for (w, h) in [(1, 1), (10, 3), (100, 100), (333, 127)] {
            assert!(
                matches!(locate_default(&blank(w, h)), Err(PipelineError::NotFound)),
                "{w}x{h}"
            );
        }
    }

    #[test]
    fn thick_frame_uses_outer_edge() {
        let mut img = blank(120, 80);
        frame(&mut img, 5, 7, 110, 70, 3);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((5, 7), (110, 7), (5, 70), (110, 70)));
    }

    #[test]
    fn corner_marks_without_full_lines() {
        let mut img = blank(200, 120);
        // Four L-shaped marks with 20 px arms.
        hline(&mut img, 10, 10, 30, BLACK);
        vline(&mut img, 10, 10, 30, BLACK);
        hline(&mut img, 10, 170, 190, BLACK);
        vline(&mut img, 190, 10, 30, BLACK);
        hline(&mut img, 110, 10, 30, BLACK);
        vline(&mut img, 10, 90, 110, BLACK);
        hline(&mut img, 110, 170, 190, BLACK);
        vline(&mut img, 190, 90, 110, BLACK);

        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((10, 10), (190, 10), (10, 110), (190, 110)));
    }

    #[test]
    fn misaligned_corner_is_resolved_independently() {
        let mut img = blank(200, 120);
        hline(&mut img, 10, 10, 30, BLACK);
        vline(&mut img, 10, 10, 30, BLACK);
        // Top-right mark is one pixel lower and further right.
        hline(&mut img, 11, 171, 191, BLACK);
        vline(&mut img, 191, 11, 31, BLACK);
        hline(&mut img, 110, 10, 30, BLACK);
        vline(&mut img, 10, 90, 110, BLACK);
        hline(&mut img, 110, 170, 190, BLACK);
        vline(&mut img, 190, 90, 110, BLACK);

        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((10, 10), (191, 11), (10, 110), (190, 110)));
    }

    #[test]
    fn noise_specks_are_ignored() {
        let mut img = fixture();
        for (x, y) in [(2, 2), (95, 3), (50, 50), (3, 97), (97, 97)] {
            img.put_pixel(x, y, BLACK);
            img.put_pixel(x + 1, y, BLACK);
        }
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((10, 10), (90, 10), (10, 90), (90, 90)));
    }

    #[test]
    fn specks_alone_are_not_found() {
        let mut img = blank(100, 100);
        for i in 0..20 {
            img.put_pixel(i * 5, (i * 7) % 100, BLACK);
        }
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }

    #[test]
    fn missing_bottom_line_is_not_found() {
        let mut img = blank(100, 100);
        hline(&mut img, 10, 10, 90, BLACK);
        vline(&mut img, 10, 10, 40, BLACK);
        vline(&mut img, 90, 10, 40, BLACK);
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }

    #[test]
    fn lines_that_do_not_meet_are_not_found() {
        let mut img = blank(100, 100);
        // Horizontal lines span the middle only; vertical lines sit
        // outside them, so no corner is covered by both.
        hline(&mut img, 10, 30, 70, BLACK);
        hline(&mut img, 90, 30, 70, BLACK);
        vline(&mut img, 10, 20, 80, BLACK);
        vline(&mut img, 90, 20, 80, BLACK);
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }

    #[test]
    fn lines_shorter_than_min_run_are_not_found() {
        let img = fixture();
        assert!(matches!(
            locate(&img, BlackThreshold::default(), 200),
            Err(PipelineError::NotFound)
        ));
    }

    #[test]
    fn successful_locate_is_ordered() {
        let mut img = blank(300, 200);
        frame(&mut img, 40, 20, 260, 180, 2);
        let found = locate_default(&img).unwrap();
        assert!(found.top_left.x < found.top_right.x);
        assert!(found.top_left.y < found.bottom_left.y);
        assert!(found.is_ordered());
    }

    // --- dark areas, clutter and placement ---

    #[test]
    fn all_black_is_not_found() {
        for (w, h) in [(20, 20), (100, 100), (200, 120)] {
            let img = RgbImage::from_pixel(w, h, BLACK);
            assert!(
                matches!(locate_default(&img), Err(PipelineError::NotFound)),
                "{w}x{h}"
            );
        }
    }

    #[test]
    fn dark_background_without_bracket_is_not_found() {
        let mut img = RgbImage::from_pixel(200, 120, image::Rgb([20, 20, 24]));
        for y in 30..=90 {
            hline(&mut img, y, 60, 140, image::Rgb([128, 128, 128]));
        }
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }

    #[test]
    fn filled_block_is_not_found() {
        let mut img = blank(100, 100);
        for y in 20..=60 {
            hline(&mut img, y, 20, 60, BLACK);
        }
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }

    #[test]
    fn black_bar_outside_frame_is_ignored() {
        let mut img = blank(100, 100);
        for y in 0..=12 {
            hline(&mut img, y, 0, 99, BLACK);
        }
        frame(&mut img, 10, 30, 90, 90, 1);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((10, 30), (90, 30), (10, 90), (90, 90)));
    }

    #[test]
    fn dark_sidebar_beside_frame_is_ignored() {
        let mut img = blank(200, 120);
        for x in 0..20 {
            vline(&mut img, x, 0, 119, BLACK);
        }
        frame(&mut img, 40, 10, 180, 110, 2);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((40, 10), (180, 10), (40, 110), (180, 110)));
    }

    #[test]
    fn off_centre_frames_are_found() {
        let mut img = blank(200, 200);
        frame(&mut img, 10, 10, 80, 80, 1);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((10, 10), (80, 10), (10, 80), (80, 80)));

        let mut img = blank(200, 200);
        frame(&mut img, 120, 130, 190, 190, 2);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((120, 130), (190, 130), (120, 190), (190, 190)));
    }

    #[test]
    fn nested_frames_pick_the_outer_one() {
        let mut img = blank(100, 100);
        frame(&mut img, 5, 5, 95, 95, 1);
        frame(&mut img, 30, 30, 70, 70, 1);
        let found = locate_default(&img).unwrap();
        assert_eq!(found, corners((5, 5), (95, 5), (5, 95), (95, 95)));
    }

    #[test]
    fn corners_beyond_tolerance_are_not_found() {
        let mut img = blank(200, 120);
        hline(&mut img, 10, 10, 30, BLACK);
        vline(&mut img, 10, 10, 30, BLACK);
        // Top-right mark five rows below the top-left one.
        hline(&mut img, 15, 170, 190, BLACK);
        vline(&mut img, 190, 15, 35, BLACK);
        hline(&mut img, 110, 10, 30, BLACK);
        vline(&mut img, 10, 90, 110, BLACK);
        hline(&mut img, 110, 170, 190, BLACK);
        vline(&mut img, 190, 90, 110, BLACK);
        assert!(matches!(locate_default(&img), Err(PipelineError::NotFound)));
    }
}
