use std::collections::BTreeSet;

use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::{debug, warn};

use crate::datatypes::{Point2D, Segment};

/// Default alpha; keeps triangles with a circumradius under 25mm
pub const DEFAULT_ALPHA_THRESHOLD: f64 = 0.04;

/// Triangles with less area than this are slivers and are skipped
const MIN_TRIANGLE_AREA: f64 = 1e-5;

/// Fewer points than this cannot describe an area
const MIN_POINTS: usize = 4;

/// Per-triangle data kept while filtering
#[derive(Debug, Clone, Copy)]
struct TriangleMetrics {
    area: f64,
    circumradius: f64,
}

/// Calculates side lengths, area (Heron) and circumradius of a triangle
///
/// # Returns
/// `None` for triangles too thin to carry a meaningful circumradius
fn triangle_metrics(pa: &Point2D, pb: &Point2D, pc: &Point2D) -> Option<TriangleMetrics> {
    let a = (pa - pb).norm();
    let b = (pb - pc).norm();
    let c = (pc - pa).norm();

    let s = (a + b + c) / 2.0;
    let area = f64::max(0.0, s * (s - a) * (s - b) * (s - c)).sqrt();

    if area < MIN_TRIANGLE_AREA {
        return None;
    }

    Some(TriangleMetrics {
        area,
        circumradius: (a * b * c) / (4.0 * area),
    })
}

/// Flips membership of an undirected edge in the boundary set
fn toggle_edge(boundary: &mut BTreeSet<(usize, usize)>, i: usize, j: usize) {
    let key = if i < j { (i, j) } else { (j, i) };
    if !boundary.remove(&key) {
        boundary.insert(key);
    }
}

/// Computes the concave hull of a point cloud with an alpha shape
///
/// # Arguments
/// * `points` - The point cloud
/// * `alpha_threshold` - Triangles are kept when their circumradius is below
///     `1 / alpha_threshold`
///
/// # Returns
/// The summed area of the kept triangles and the boundary segments, i.e. the
/// edges owned by exactly one kept triangle.
pub fn calculate_concave_hull(points: &[Point2D], alpha_threshold: f64) -> (f64, Vec<Segment>) {
    if points.len() < MIN_POINTS {
        return (0.0, Vec::new());
    }

    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    let mut skipped_points: usize = 0;
    for p in points {
        if let Err(err) = triangulation.insert(Point2::new(p.x, p.y)) {
            debug!("skipping point ({}, {}): {err:?}", p.x, p.y);
            skipped_points += 1;
        }
    }
    if skipped_points > 0 {
        warn!("alpha shape skipped {} points", skipped_points);
    }

    // spade merges duplicate points, so work with its own vertex indices
    let vertices: Vec<Point2D> = triangulation
        .vertices()
        .map(|v| Point2D::new(v.position().x, v.position().y))
        .collect();

    let radius_limit = 1.0 / alpha_threshold;
    let mut total_area = 0.0;
    let mut boundary: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut kept_triangles: usize = 0;

    for face in triangulation.inner_faces() {
        let [ia, ib, ic] = face.vertices().map(|v| v.fix().index());

        let Some(metrics) = triangle_metrics(&vertices[ia], &vertices[ib], &vertices[ic]) else {
            continue;
        };

        if metrics.circumradius < radius_limit {
            total_area += metrics.area;
            kept_triangles += 1;

            toggle_edge(&mut boundary, ia, ib);
            toggle_edge(&mut boundary, ib, ic);
            toggle_edge(&mut boundary, ic, ia);
        }
    }

    debug!(
        "alpha shape kept {} of {} triangles, {} boundary edges",
        kept_triangles,
        triangulation.num_inner_faces(),
        boundary.len()
    );

    let lines = boundary
        .into_iter()
        .map(|(i, j)| Segment::new(vertices[i], vertices[j]))
        .collect();

    (total_area, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(n: usize, spacing: f64) -> Vec<Point2D> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Point2D::new(i as f64 * spacing, j as f64 * spacing));
            }
        }
        points
    }

    fn on_square_edge(p: &Point2D, side: f64) -> bool {
        let eps = 1e-9;
        p.x.abs() < eps || p.y.abs() < eps || (p.x - side).abs() < eps || (p.y - side).abs() < eps
    }

    #[test]
    fn too_few_points_give_nothing() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
        ];
        let (area, lines) = calculate_concave_hull(&points, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(area, 0.0);
        assert!(lines.is_empty());
    }

    #[test]
    fn collinear_points_give_nothing() {
        let points: Vec<Point2D> = (0..10).map(|i| Point2D::new(i as f64, 0.0)).collect();
        let (area, lines) = calculate_concave_hull(&points, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(area, 0.0);
        assert!(lines.is_empty());
    }

    #[test]
    fn unit_lattice_keeps_only_the_outer_square() {
        let n = 5;
        let side = (n - 1) as f64;
        let (area, lines) = calculate_concave_hull(&lattice(n, 1.0), DEFAULT_ALPHA_THRESHOLD);

        assert!((area - side * side).abs() < 1e-6);
        assert_eq!(lines.len(), 4 * (n - 1));
        for line in &lines {
            assert!(on_square_edge(&line.p1, side));
            assert!(on_square_edge(&line.p2, side));
            // no diagonals
            assert!(((line.p1 - line.p2).norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn sparse_lattice_is_filtered_out() {
        // 40mm spacing gives circumradii of ~28mm, above the 25mm limit
        let (area, lines) = calculate_concave_hull(&lattice(4, 40.0), DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(area, 0.0);
        assert!(lines.is_empty());
    }

    #[test]
    fn duplicate_points_are_merged() {
        let mut points = lattice(3, 1.0);
        points.extend(lattice(3, 1.0));
        let (area, lines) = calculate_concave_hull(&points, DEFAULT_ALPHA_THRESHOLD);
        assert!((area - 4.0).abs() < 1e-6);
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn concave_notch_is_preserved() {
        // L-shaped lattice: a 6x6 block with the top-right corner points removed
        let points: Vec<Point2D> = lattice(7, 1.0)
            .into_iter()
            .filter(|p| !(p.x > 3.5 && p.y > 3.5))
            .collect();
        let (area, lines) = calculate_concave_hull(&points, 1.0);

        // 27 full cells plus the half cell at the inner corner; the convex
        // hull would cover 31.5
        assert!((area - 27.5).abs() < 1e-6);
        assert!(!lines.is_empty());
        for line in &lines {
            assert!(!(line.p1.x > 3.5 && line.p1.y > 3.5));
        }
    }
}
