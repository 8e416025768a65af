//! Five-bar legs: two servo-driven cranks closed by a pair of passive links,
//! with the foot extended past the closure point.

use crate::{
    datatypes::{DrawPrimitive, JointSet, LegParameter, LegParameters, LinkRole, ParamMap, Point2D, Pose, Segment},
    error::LegscopeError,
    geometry::{circle_intersection, min_distance_segments, polar_to_cartesian, Chirality},
};

use super::{
    hits_servo, lookup_joints, require_param, LegState, Linkage, MIN_DIRECTION_NORM,
    SERVO1_POSITION, SERVO2_POSITION, SERVO_COLLISION_THRESHOLD,
};

/// Branch used to close every five-bar loop
const CLOSURE_CHIRALITY: Chirality = Chirality::Negative;

const LABELS: [&str; 6] = ["S1", "S2", "A", "B", "C", "Foot"];

fn link_bounds(name: &'static str, value: f64) -> LegParameter {
    LegParameter::new(name, value, 10.0, 105.0)
}

/// Shared collision rule: every rigid segment against both servos, then the
/// listed link pairs against each other.
fn fivebar_collides(
    segments: &[Segment],
    cross_pairs: &[(Segment, Segment)],
    servos: [Point2D; 2],
    threshold: f64,
) -> bool {
    for seg in segments {
        for servo in &servos {
            if hits_servo(seg, servo, threshold) {
                return true;
            }
        }
    }

    cross_pairs
        .iter()
        .any(|(a, b)| min_distance_segments(a, b) < threshold)
}

fn extend_foot(from: &Point2D, origin: &Point2D, length: f64) -> Option<Point2D> {
    let direction = from - origin;
    let norm = direction.norm();
    if norm < MIN_DIRECTION_NORM {
        return None;
    }
    Some(from + direction * (length / norm))
}

fn fivebar_joints(s1: Point2D, s2: Point2D, a: Point2D, b: Point2D, c: Point2D, foot: Point2D) -> JointSet {
    JointSet::new()
        .with("S1", s1)
        .with("S2", s2)
        .with("A", a)
        .with("B", b)
        .with("C", c)
        .with("Foot", foot)
}

pub mod rear {
    pub const L1: &str = "L1 (S1->A)";
    pub const L2: &str = "L2 (A->B)";
    pub const L3: &str = "L3 (S2->C)";
    pub const L4: &str = "L4 (B->C)";
    pub const L5: &str = "L5 (Ext. C)";
}

/// Rear-drive five-bar.
///
/// Servo 1 drives A (L1), servo 2 drives C (L3); B closes the loop at the
/// intersection of circle(A, L2) and circle(C, L4). The foot extends from C
/// away from B by L5.
#[derive(Debug, Clone, PartialEq)]
pub struct FiveBarRearLeg {
    state: LegState,
    l1: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    l5: f64,
    servo1: Point2D,
    servo2: Point2D,
}

impl FiveBarRearLeg {
    pub fn new() -> FiveBarRearLeg {
        let parameters = LegParameters::new(vec![
            link_bounds(rear::L1, 45.0),
            link_bounds(rear::L2, 45.0),
            link_bounds(rear::L3, 50.0),
            link_bounds(rear::L4, 45.0),
            link_bounds(rear::L5, 95.0),
        ]);

        FiveBarRearLeg {
            l1: 45.0,
            l2: 45.0,
            l3: 50.0,
            l4: 45.0,
            l5: 95.0,
            servo1: Point2D::from(SERVO1_POSITION),
            servo2: Point2D::from(SERVO2_POSITION),
            state: LegState::new(parameters).with_threshold(SERVO_COLLISION_THRESHOLD),
        }
    }
}

impl Default for FiveBarRearLeg {
    fn default() -> Self {
        FiveBarRearLeg::new()
    }
}

impl Linkage for FiveBarRearLeg {
    fn state(&self) -> &LegState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LegState {
        &mut self.state
    }

    fn display_name(&self) -> &'static str {
        "Five-Bar Rear"
    }

    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        let (theta1, theta2) = self.state.drive_angles(theta1_deg, theta2_deg);

        let a = self.servo1 + polar_to_cartesian(self.l1, theta1);
        let c = self.servo2 + polar_to_cartesian(self.l3, theta2);
        let b = circle_intersection(&a, self.l2, &c, self.l4, CLOSURE_CHIRALITY)?;
        let foot = extend_foot(&c, &b, self.l5)?;

        Some(Pose {
            foot,
            joints: fivebar_joints(self.servo1, self.servo2, a, b, c, foot),
        })
    }

    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        let name = self.display_name();
        let l1 = require_param(params, name, rear::L1)?;
        let l2 = require_param(params, name, rear::L2)?;
        let l3 = require_param(params, name, rear::L3)?;
        let l4 = require_param(params, name, rear::L4)?;
        let l5 = require_param(params, name, rear::L5)?;

        (self.l1, self.l2, self.l3, self.l4, self.l5) = (l1, l2, l3, l4, l5);
        self.state.parameters.set_values(params);
        Ok(())
    }

    fn check_collisions(&self, joints: &JointSet) -> bool {
        let Some([s1, s2, a, b, c, foot]) = lookup_joints(joints, LABELS, self.display_name())
        else {
            return true;
        };

        let s1_a = Segment::new(s1, a);
        let s2_c = Segment::new(s2, c);
        let a_b = Segment::new(a, b);
        let b_c = Segment::new(b, c);
        let c_foot = Segment::new(c, foot);

        fivebar_collides(
            &[s1_a, s2_c, a_b, b_c, c_foot],
            &[(s1_a, s2_c), (s1_a, b_c), (s2_c, a_b)],
            [s1, s2],
            self.collision_threshold(),
        )
    }

    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        let Some([s1, s2, a, b, c, foot]) = lookup_joints(joints, LABELS, self.display_name())
        else {
            return Vec::new();
        };

        let link = |from, to, role| DrawPrimitive::Link { from, to, role };

        vec![
            DrawPrimitive::Servo {
                label: "S2",
                center: s2,
                offset_rad: self.state.offset_t2,
            },
            DrawPrimitive::Servo {
                label: "S1",
                center: s1,
                offset_rad: self.state.offset_t1,
            },
            link(s1, a, LinkRole::Drive1),
            link(s2, c, LinkRole::Drive2),
            link(a, b, LinkRole::Passive),
            link(b, c, LinkRole::Passive),
            link(c, foot, LinkRole::Effector),
        ]
    }

    fn home_angles(&self) -> (f64, f64) {
        (90.0, 130.0)
    }

    fn has_offset_controls(&self) -> bool {
        true
    }
}

pub mod front {
    pub const L1: &str = "L1 (S1->A)";
    pub const L2: &str = "L2 (S2->B)";
    pub const L3: &str = "L3 (B->C)";
    pub const L4: &str = "L4 (A->C)";
    pub const L5: &str = "L5 (Ext. C)";
}

/// Front-drive five-bar.
///
/// Servo 1 drives A (L1), servo 2 drives B (L2); C closes the loop at the
/// intersection of circle(A, L4) and circle(B, L3). The foot continues the
/// A -> C link by L5.
#[derive(Debug, Clone, PartialEq)]
pub struct FiveBarFrontLeg {
    state: LegState,
    l1: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    l5: f64,
    servo1: Point2D,
    servo2: Point2D,
}

impl FiveBarFrontLeg {
    pub fn new() -> FiveBarFrontLeg {
        let parameters = LegParameters::new(vec![
            link_bounds(front::L1, 45.0),
            link_bounds(front::L2, 45.0),
            link_bounds(front::L3, 50.0),
            link_bounds(front::L4, 45.0),
            link_bounds(front::L5, 95.0),
        ]);

        FiveBarFrontLeg {
            l1: 45.0,
            l2: 45.0,
            l3: 50.0,
            l4: 45.0,
            l5: 95.0,
            servo1: Point2D::from(SERVO1_POSITION),
            servo2: Point2D::from(SERVO2_POSITION),
            state: LegState::new(parameters).with_threshold(SERVO_COLLISION_THRESHOLD),
        }
    }
}

impl Default for FiveBarFrontLeg {
    fn default() -> Self {
        FiveBarFrontLeg::new()
    }
}

impl Linkage for FiveBarFrontLeg {
    fn state(&self) -> &LegState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LegState {
        &mut self.state
    }

    fn display_name(&self) -> &'static str {
        "Five-Bar Front"
    }

    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        let (theta1, theta2) = self.state.drive_angles(theta1_deg, theta2_deg);

        let a = self.servo1 + polar_to_cartesian(self.l1, theta1);
        let b = self.servo2 + polar_to_cartesian(self.l2, theta2);
        let c = circle_intersection(&a, self.l4, &b, self.l3, CLOSURE_CHIRALITY)?;
        let foot = extend_foot(&c, &a, self.l5)?;

        Some(Pose {
            foot,
            joints: fivebar_joints(self.servo1, self.servo2, a, b, c, foot),
        })
    }

    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        let name = self.display_name();
        let l1 = require_param(params, name, front::L1)?;
        let l2 = require_param(params, name, front::L2)?;
        let l3 = require_param(params, name, front::L3)?;
        let l4 = require_param(params, name, front::L4)?;
        let l5 = require_param(params, name, front::L5)?;

        (self.l1, self.l2, self.l3, self.l4, self.l5) = (l1, l2, l3, l4, l5);
        self.state.parameters.set_values(params);
        Ok(())
    }

    fn check_collisions(&self, joints: &JointSet) -> bool {
        let Some([s1, s2, a, b, c, foot]) = lookup_joints(joints, LABELS, self.display_name())
        else {
            return true;
        };

        let s1_a = Segment::new(s1, a);
        let s2_b = Segment::new(s2, b);
        let a_c = Segment::new(a, c);
        let b_c = Segment::new(b, c);
        let c_foot = Segment::new(c, foot);

        fivebar_collides(
            &[s1_a, s2_b, a_c, b_c, c_foot],
            &[(s1_a, s2_b), (s1_a, b_c), (s2_b, a_c)],
            [s1, s2],
            self.collision_threshold(),
        )
    }

    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        let Some([s1, s2, a, b, c, foot]) = lookup_joints(joints, LABELS, self.display_name())
        else {
            return Vec::new();
        };

        let link = |from, to, role| DrawPrimitive::Link { from, to, role };

        vec![
            DrawPrimitive::Servo {
                label: "S1",
                center: s1,
                offset_rad: self.state.offset_t1,
            },
            DrawPrimitive::Servo {
                label: "S2",
                center: s2,
                offset_rad: self.state.offset_t2,
            },
            link(s1, a, LinkRole::Drive1),
            link(s2, b, LinkRole::Drive2),
            link(a, c, LinkRole::Passive),
            link(b, c, LinkRole::Passive),
            link(c, foot, LinkRole::Effector),
        ]
    }

    fn has_offset_controls(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Joint set in `LABELS` order: S1, S2, A, B, C, Foot
    fn joints(points: [(f64, f64); 6]) -> JointSet {
        let mut set = JointSet::new();
        for (label, (x, y)) in LABELS.into_iter().zip(points) {
            set.insert(label, Point2D::new(x, y));
        }
        set
    }

    const S1: (f64, f64) = (-15.0, -10.0);
    const S2: (f64, f64) = (0.0, 0.0);

    #[test]
    fn rear_closure_respects_link_lengths() {
        let leg = FiveBarRearLeg::new();
        let pose = leg.forward_kinematics(0.0, 90.0).unwrap();
        let j = &pose.joints;
        let (a, b, c) = (j.get("A").unwrap(), j.get("B").unwrap(), j.get("C").unwrap());

        assert!((a - Point2D::new(30.0, -10.0)).norm() < EPS);
        assert!((c - Point2D::new(0.0, 50.0)).norm() < EPS);
        assert!(((b - a).norm() - 45.0).abs() < EPS);
        assert!(((b - c).norm() - 45.0).abs() < EPS);
        assert!(((pose.foot - c).norm() - 95.0).abs() < EPS);

        // closure takes the negative branch
        let expected = circle_intersection(&a, 45.0, &c, 45.0, Chirality::Negative).unwrap();
        assert!((b - expected).norm() < EPS);
        assert!((b - Point2D::new(-11.8328, 6.5836)).norm() < 1e-3);

        // foot continues the B -> C direction
        let along = (c - b).normalize();
        assert!(((pose.foot - c).normalize() - along).norm() < EPS);
    }

    #[test]
    fn front_foot_continues_a_to_c() {
        let leg = FiveBarFrontLeg::new();
        let pose = leg.forward_kinematics(0.0, 90.0).unwrap();
        let j = &pose.joints;
        let (a, b, c) = (j.get("A").unwrap(), j.get("B").unwrap(), j.get("C").unwrap());

        assert!(((c - a).norm() - 45.0).abs() < EPS);
        assert!(((c - b).norm() - 50.0).abs() < EPS);
        assert!(((pose.foot - c).normalize() - (c - a).normalize()).norm() < EPS);
        assert!(((pose.foot - c).norm() - 95.0).abs() < EPS);
    }

    #[test]
    fn unreachable_closure_returns_none() {
        let leg = FiveBarFrontLeg::new();
        // A swings left, B swings right: 45 + 50 cannot span the gap
        assert!(leg.forward_kinematics(180.0, 0.0).is_none());
    }

    #[test]
    fn crossing_cranks_collide() {
        let leg = FiveBarRearLeg::new();
        // S1->A runs straight up through the S2->C crank
        let pose = leg.forward_kinematics(90.0, 130.0).unwrap();
        assert!(leg.check_collisions(&pose.joints));
    }

    #[test]
    fn rear_foot_link_near_servo_collides() {
        let leg = FiveBarRearLeg::new();
        let a = (-60.0, -10.0);
        let b = (-60.0, 35.0);
        let c = (0.0, 50.0);

        // every link and crossing pair keeps at least 10mm
        let clear = joints([S1, S2, a, b, c, (92.2, 73.0)]);
        assert!(!leg.check_collisions(&clear));

        // C -> Foot swung down past S1; it is not part of any crossing pair
        let swept = joints([S1, S2, a, b, c, (-20.0, -45.0)]);
        let s1 = Point2D::from(SERVO1_POSITION);
        let c_foot = Segment::new(Point2D::new(0.0, 50.0), Point2D::new(-20.0, -45.0));
        assert!(crate::geometry::dist_point_segment(&s1, &c_foot.p1, &c_foot.p2) < 5.0);
        assert!(leg.check_collisions(&swept));
    }

    #[test]
    fn front_clear_layout_is_free() {
        let leg = FiveBarFrontLeg::new();
        let clear = joints([S1, S2, (-60.0, -10.0), (0.0, 45.0), (-40.0, 80.0), (-19.4, 172.7)]);
        assert!(!leg.check_collisions(&clear));
    }

    #[test]
    fn front_cranks_crossing_collide() {
        // S1->A straight up, S2->B at 150 deg: the cranks cross at x = -15
        let leg = FiveBarFrontLeg::new();
        let set = joints([S1, S2, (-15.0, 35.0), (-38.97, 22.5), (-80.0, 60.0), (-168.7, 94.1)]);
        assert!(leg.check_collisions(&set));
    }

    #[test]
    fn front_passive_link_over_crank_tip_collides() {
        // B -> C passes about 8mm above A, the tip of the S1 crank
        let leg = FiveBarFrontLeg::new();
        let set = joints([S1, S2, (-15.0, 35.0), (0.0, 45.0), (-40.0, 40.0), (-133.2, 58.6)]);
        assert!(leg.check_collisions(&set));
    }

    #[test]
    fn front_coupler_grazing_s2_crank_collides() {
        // A -> C passes under 6mm from B, the tip of the S2 crank
        let leg = FiveBarFrontLeg::new();
        let set = joints([S1, S2, (-60.0, -10.0), (0.0, 45.0), (-3.0, 50.0), (62.4, 118.9)]);
        assert!(leg.check_collisions(&set));
    }

    #[test]
    fn update_params_rejects_partial_maps() {
        let mut leg = FiveBarFrontLeg::new();
        let mut params = leg.parameters().values();
        params.remove(front::L3);
        assert!(matches!(
            leg.update_params(&params),
            Err(LegscopeError::MissingParameter { .. })
        ));
    }

    #[test]
    fn forward_kinematics_is_deterministic() {
        let leg = FiveBarRearLeg::new();
        let first = leg.forward_kinematics(20.0, 110.0);
        for _ in 0..3 {
            assert_eq!(leg.forward_kinematics(20.0, 110.0), first);
        }
    }
}
