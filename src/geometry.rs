//! Planar geometry used by the leg models and the workspace pipeline.

use crate::datatypes::{Point2D, Segment};

/// Picks one of the two circle-circle intersection solutions.
///
/// A linkage must keep the same chirality for every evaluation, otherwise
/// the closure joint jumps between elbow-up and elbow-down branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chirality {
    Positive,
    Negative,
}

/// Converts polar coordinates to a cartesian vector
///
/// # Arguments
/// * `radius` - Distance from the origin
/// * `angle_rad` - Angle from the +x axis, in radians
pub fn polar_to_cartesian(radius: f64, angle_rad: f64) -> Point2D {
    Point2D::new(radius * angle_rad.cos(), radius * angle_rad.sin())
}

/// Intersects two circles
///
/// # Arguments
/// * `c1` - Center of the first circle
/// * `r1` - Radius of the first circle
/// * `c2` - Center of the second circle
/// * `r2` - Radius of the second circle
/// * `chirality` - Which of the two solutions to return
///
/// # Returns
/// The selected intersection, or `None` when the circles are concentric,
/// nested or too far apart.
pub fn circle_intersection(
    c1: &Point2D,
    r1: f64,
    c2: &Point2D,
    r2: f64,
    chirality: Chirality,
) -> Option<Point2D> {
    let d2 = (c1 - c2).norm_squared();
    let d = d2.sqrt();

    if d > r1 + r2 || d < (r1 - r2).abs() || d == 0.0 {
        return None;
    }

    let a = (r1 * r1 - r2 * r2 + d2) / (2.0 * d);
    let h = f64::max(0.0, r1 * r1 - a * a).sqrt();

    // foot of the common chord on the line of centers
    let mid = c1 + (c2 - c1) * (a / d);

    // rotate the line of centers by -90 degrees, scaled to h
    let offset = Point2D::new(c2.y - c1.y, -(c2.x - c1.x)) * (h / d);

    match chirality {
        Chirality::Positive => Some(mid + offset),
        Chirality::Negative => Some(mid - offset),
    }
}

/// Calculates the distance from a point to a segment
///
/// # Arguments
/// * `p` - The query point
/// * `a` - First segment endpoint
/// * `b` - Second segment endpoint
///
/// # Returns
/// Distance from `p` to its projection clamped onto `[a, b]`. A zero-length
/// segment measures to `a`.
pub fn dist_point_segment(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let len_sq = ab.norm_squared();

    if len_sq == 0.0 {
        return ap.norm();
    }

    let t = (ap.dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Strict counter-clockwise test for `a -> b -> c`
fn ccw(a: &Point2D, b: &Point2D, c: &Point2D) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// Tests whether segment `ab` crosses segment `cd`.
///
/// Uses strict orientation comparisons, so exactly collinear or touching
/// configurations report `false`.
pub fn segments_intersect(a: &Point2D, b: &Point2D, c: &Point2D, d: &Point2D) -> bool {
    ccw(a, c, d) != ccw(b, c, d) && ccw(a, b, c) != ccw(a, b, d)
}

/// Calculates the minimum distance between two segments
///
/// # Returns
/// Zero when the segments cross, otherwise the smallest endpoint-to-segment
/// distance in either direction.
pub fn min_distance_segments(seg1: &Segment, seg2: &Segment) -> f64 {
    if segments_intersect(&seg1.p1, &seg1.p2, &seg2.p1, &seg2.p2) {
        return 0.0;
    }

    [
        dist_point_segment(&seg2.p1, &seg1.p1, &seg1.p2),
        dist_point_segment(&seg2.p2, &seg1.p1, &seg1.p2),
        dist_point_segment(&seg1.p1, &seg2.p1, &seg2.p2),
        dist_point_segment(&seg1.p2, &seg2.p1, &seg2.p2),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pt(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn polar_to_cartesian_axes() {
        let p = polar_to_cartesian(2.0, std::f64::consts::FRAC_PI_2);
        assert!(p.x.abs() < EPS);
        assert!((p.y - 2.0).abs() < EPS);

        let p = polar_to_cartesian(3.0, 0.0);
        assert!((p - pt(3.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn circle_intersection_rejects_unreachable() {
        // concentric
        assert!(circle_intersection(&pt(0.0, 0.0), 5.0, &pt(0.0, 0.0), 5.0, Chirality::Positive).is_none());
        // too far apart
        assert!(circle_intersection(&pt(0.0, 0.0), 1.0, &pt(10.0, 0.0), 1.0, Chirality::Negative).is_none());
        // one inside the other
        assert!(circle_intersection(&pt(0.0, 0.0), 10.0, &pt(1.0, 0.0), 2.0, Chirality::Positive).is_none());
    }

    #[test]
    fn circle_intersection_solutions_lie_on_both_circles() {
        let c1 = pt(0.0, 0.0);
        let c2 = pt(6.0, 0.0);
        for chirality in [Chirality::Positive, Chirality::Negative] {
            let p = circle_intersection(&c1, 5.0, &c2, 5.0, chirality).unwrap();
            assert!(((p - c1).norm() - 5.0).abs() < 1e-9);
            assert!(((p - c2).norm() - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn circle_intersection_chiralities_mirror_across_center_line() {
        let c1 = pt(1.0, 2.0);
        let c2 = pt(7.0, 5.0);
        let pos = circle_intersection(&c1, 5.0, &c2, 4.0, Chirality::Positive).unwrap();
        let neg = circle_intersection(&c1, 5.0, &c2, 4.0, Chirality::Negative).unwrap();

        // reflect `pos` across the line through c1 and c2
        let dir = (c2 - c1).normalize();
        let rel = pos - c1;
        let reflected = c1 + dir * (2.0 * rel.dot(&dir)) - rel;

        assert!((reflected - neg).norm() < 1e-9);
        assert!((pos - neg).norm() > 1.0);
    }

    #[test]
    fn circle_intersection_negative_chirality_on_x_axis() {
        // centers on the x axis: Positive lies below, Negative above
        let pos = circle_intersection(&pt(0.0, 0.0), 5.0, &pt(6.0, 0.0), 5.0, Chirality::Positive).unwrap();
        let neg = circle_intersection(&pt(0.0, 0.0), 5.0, &pt(6.0, 0.0), 5.0, Chirality::Negative).unwrap();
        assert!((pos - pt(3.0, -4.0)).norm() < EPS);
        assert!((neg - pt(3.0, 4.0)).norm() < EPS);
    }

    #[test]
    fn tangent_circles_touch_once() {
        let p = circle_intersection(&pt(0.0, 0.0), 2.0, &pt(5.0, 0.0), 3.0, Chirality::Positive).unwrap();
        assert!((p - pt(2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn dist_point_segment_perpendicular_drop() {
        assert!((dist_point_segment(&pt(5.0, 5.0), &pt(0.0, 0.0), &pt(10.0, 0.0)) - 5.0).abs() < EPS);
    }

    #[test]
    fn dist_point_segment_clamps_to_endpoints() {
        let d = dist_point_segment(&pt(13.0, 4.0), &pt(0.0, 0.0), &pt(10.0, 0.0));
        assert!((d - 5.0).abs() < EPS);
        let d = dist_point_segment(&pt(-3.0, -4.0), &pt(0.0, 0.0), &pt(10.0, 0.0));
        assert!((d - 5.0).abs() < EPS);
    }

    #[test]
    fn dist_point_segment_degenerate_segment() {
        let d = dist_point_segment(&pt(3.0, 4.0), &pt(0.0, 0.0), &pt(0.0, 0.0));
        assert!((d - 5.0).abs() < EPS);
    }

    #[test]
    fn segments_intersect_crossing_and_disjoint() {
        assert!(segments_intersect(&pt(0.0, 0.0), &pt(10.0, 10.0), &pt(0.0, 10.0), &pt(10.0, 0.0)));
        assert!(!segments_intersect(&pt(0.0, 0.0), &pt(1.0, 1.0), &pt(5.0, 0.0), &pt(6.0, 1.0)));
    }

    #[test]
    fn segments_intersect_false_on_collinear_overlap() {
        assert!(!segments_intersect(&pt(0.0, 0.0), &pt(10.0, 0.0), &pt(5.0, 0.0), &pt(15.0, 0.0)));
    }

    #[test]
    fn min_distance_segments_crossing_is_zero() {
        let s1 = Segment::new(pt(0.0, 0.0), pt(10.0, 10.0));
        let s2 = Segment::new(pt(0.0, 10.0), pt(10.0, 0.0));
        assert_eq!(min_distance_segments(&s1, &s2), 0.0);
    }

    #[test]
    fn min_distance_segments_parallel() {
        let s1 = Segment::new(pt(0.0, 0.0), pt(10.0, 0.0));
        let s2 = Segment::new(pt(2.0, 3.0), pt(8.0, 3.0));
        assert!((min_distance_segments(&s1, &s2) - 3.0).abs() < EPS);
    }
}
