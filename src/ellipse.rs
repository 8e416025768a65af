//! Largest gait ellipse centered on x = 0 inside a workspace boundary.
//!
//! The boundary is sampled into a 1mm vertical profile of safe symmetric
//! half-widths, then every row is tried as the ellipse center with widths
//! shrinking in 2mm steps. This is a greedy grid search, not an exact
//! inscription.

use tracing::debug;

use crate::datatypes::{EllipseFit, Segment};

/// Ellipse height as a fraction of its width
pub const ELLIPSE_ASPECT_RATIO: f64 = 0.5;

/// Vertical spacing of profile rows (mm)
pub const PROFILE_RESOLUTION: f64 = 1.0;

/// Decrement between candidate widths (mm)
pub const WIDTH_STEP: f64 = 2.0;

/// Crossings closer than this to x = 0 are not counted as walls
const WALL_CLEARANCE: f64 = 0.1;

/// Rows narrower than this are never used as a center
const MIN_CENTER_RADIUS: f64 = 1.0;

const HORIZONTAL_EPSILON: f64 = 1e-5;

/// Safe half-width of the boundary at each sampled height
#[derive(Debug, Clone, PartialEq)]
pub struct WidthProfile {
    pub min_y: f64,
    pub ys: Vec<f64>,
    pub radius: Vec<f64>,
}

impl WidthProfile {
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }

    /// Row index covering `y`, truncated toward zero like the row grid
    fn row_index(&self, y: f64) -> i64 {
        ((y - self.min_y) / PROFILE_RESOLUTION).trunc() as i64
    }
}

/// Finds the walls closest to x = 0 at height `y`
///
/// # Returns
/// `(left, right)` crossings, or `None` when either side is open
pub fn scan_limits_at_y(y: f64, lines: &[Segment]) -> Option<(f64, f64)> {
    let mut left: Option<f64> = None;
    let mut right: Option<f64> = None;

    for line in lines {
        let (p1, p2) = (&line.p1, &line.p2);
        let straddles = (p1.y <= y && y <= p2.y) || (p2.y <= y && y <= p1.y);
        if !straddles || (p2.y - p1.y).abs() < HORIZONTAL_EPSILON {
            continue;
        }

        let t = (y - p1.y) / (p2.y - p1.y);
        let x = p1.x + t * (p2.x - p1.x);

        if x < -WALL_CLEARANCE {
            left = Some(left.map_or(x, |l| l.max(x)));
        } else if x > WALL_CLEARANCE {
            right = Some(right.map_or(x, |r| r.min(x)));
        }
    }

    Some((left?, right?))
}

/// Samples the boundary into a 1mm profile from its lowest to its highest
/// endpoint (upper end excluded)
///
/// # Returns
/// `None` when there is no boundary or it has no vertical extent
pub fn build_profile(lines: &[Segment]) -> Option<WidthProfile> {
    let (min_y, max_y) = lines
        .iter()
        .flat_map(|line| [line.p1.y, line.p2.y])
        .fold(None, |acc: Option<(f64, f64)>, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;

    let rows = ((max_y - min_y) / PROFILE_RESOLUTION).ceil().max(0.0) as usize;
    if rows == 0 {
        return None;
    }

    let ys: Vec<f64> = (0..rows)
        .map(|i| min_y + i as f64 * PROFILE_RESOLUTION)
        .collect();

    let radius: Vec<f64> = ys
        .iter()
        .map(|y| match scan_limits_at_y(*y, lines) {
            Some((left, right)) => left.abs().min(right.abs()),
            None => 0.0,
        })
        .collect();

    Some(WidthProfile { min_y, ys, radius })
}

/// Checks whether an ellipse of `width` centered at row `center` fits the
/// profile everywhere it spans
///
/// # Returns
/// `false` if `center` is not a profile row, the ellipse leaves the sampled
/// range, or any row is too narrow
pub fn ellipse_fits(profile: &WidthProfile, center: usize, width: f64, aspect_ratio: f64) -> bool {
    let Some(&center_y) = profile.ys.get(center) else {
        return false;
    };
    let half_h = width * aspect_ratio / 2.0;

    let start = profile.row_index(center_y - half_h);
    let end = profile.row_index(center_y + half_h);
    if start < 0 || end >= profile.len() as i64 {
        return false;
    }

    (start as usize..=end as usize).all(|j| {
        let dy = (profile.ys[j] - center_y).abs();
        let term = f64::max(0.0, 1.0 - (dy / half_h).powi(2));
        let required_half_width = (width / 2.0) * term.sqrt();
        required_half_width <= profile.radius[j]
    })
}

/// Fits the largest centered ellipse with the default aspect ratio
pub fn fit_centered_ellipse(lines: &[Segment]) -> EllipseFit {
    fit_centered_ellipse_with_aspect(lines, ELLIPSE_ASPECT_RATIO)
}

/// Fits the largest ellipse centered on x = 0 with `height = width * aspect_ratio`
///
/// # Arguments
/// * `lines` - Workspace boundary segments
/// * `aspect_ratio` - Height to width ratio
///
/// # Returns
/// The best center height, width and height, or all zeros if nothing fits
pub fn fit_centered_ellipse_with_aspect(lines: &[Segment], aspect_ratio: f64) -> EllipseFit {
    let Some(profile) = build_profile(lines) else {
        return EllipseFit::default();
    };

    let mut best_width = 0.0;
    let mut best_y = 0.0;

    for (i, center_y) in profile.ys.iter().enumerate() {
        let max_radius = profile.radius[i];
        if max_radius < MIN_CENTER_RADIUS {
            continue;
        }

        let start_width = max_radius * 2.0;
        let mut valid_width = 0.0;

        for step in 0.. {
            let width = start_width - WIDTH_STEP * step as f64;
            // nothing smaller can beat the current best
            if width <= 0.0 || width <= best_width {
                break;
            }

            if ellipse_fits(&profile, i, width, aspect_ratio) {
                valid_width = width;
                break;
            }
        }

        if valid_width > best_width {
            best_width = valid_width;
            best_y = *center_y;
        }
    }

    debug!(
        "ellipse fit over {} rows: width {:.1} at y = {:.1}",
        profile.len(),
        best_width,
        best_y
    );

    EllipseFit {
        center_y: best_y,
        width: best_width,
        height: best_width * aspect_ratio,
    }
}
