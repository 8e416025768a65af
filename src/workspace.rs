use tracing::{debug, info};

use crate::{
    alpha_shape::{calculate_concave_hull, DEFAULT_ALPHA_THRESHOLD},
    datatypes::{Point2D, WorkspaceResult},
    legs::Linkage,
};

/// Servo travel swept by the scanner, in degrees
pub const SCAN_MIN_DEG: f64 = 0.0;
pub const SCAN_MAX_DEG: f64 = 180.0;

/// `count` evenly spaced samples over `[start, end]`, both ends included
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Sweeps both servos over their travel and collects every reachable,
/// collision-free foot position
///
/// # Arguments
/// * `leg` - The leg to drive
/// * `resolution` - Samples per servo; `resolution^2` poses are evaluated
pub fn scan_foot_points<L: Linkage + ?Sized>(leg: &L, resolution: usize) -> Vec<Point2D> {
    let angles = linspace(SCAN_MIN_DEG, SCAN_MAX_DEG, resolution);
    let mut points: Vec<Point2D> = Vec::new();
    let mut unreachable: usize = 0;
    let mut colliding: usize = 0;

    for theta1 in &angles {
        for theta2 in &angles {
            match leg.forward_kinematics(*theta1, *theta2) {
                None => unreachable += 1,
                Some(pose) if leg.check_collisions(&pose.joints) => colliding += 1,
                Some(pose) => points.push(pose.foot),
            }
        }
    }

    debug!(
        "{}: {} valid, {} unreachable, {} colliding poses",
        leg.display_name(),
        points.len(),
        unreachable,
        colliding
    );

    points
}

/// Scans a leg and extracts the workspace area and boundary
///
/// # Arguments
/// * `leg` - The leg to drive
/// * `resolution` - Samples per servo
pub fn compute_workspace<L: Linkage + ?Sized>(leg: &L, resolution: usize) -> WorkspaceResult {
    let points = scan_foot_points(leg, resolution);

    if points.is_empty() {
        info!("{}: no reachable foot positions", leg.display_name());
        return WorkspaceResult::default();
    }

    let (area, boundary) = calculate_concave_hull(&points, DEFAULT_ALPHA_THRESHOLD);

    info!(
        "{}: workspace of {} points, area {:.1} mm^2, {} boundary segments",
        leg.display_name(),
        points.len(),
        area,
        boundary.len()
    );

    WorkspaceResult {
        points,
        area,
        boundary,
    }
}
