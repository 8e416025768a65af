use crate::{
    datatypes::{DrawPrimitive, JointSet, LegParameter, LegParameters, LinkRole, ParamMap, Point2D, Pose, Segment},
    error::LegscopeError,
    geometry::polar_to_cartesian,
};

use super::{
    hits_servo, lookup_joints, require_param, LegState, Linkage, MIN_DIRECTION_NORM,
    SERVO1_POSITION, SERVO2_POSITION, SERVO_COLLISION_THRESHOLD,
};

pub const L_THIGH: &str = "L_Thigh (S2->Knee)";
pub const L_CRANK: &str = "L_Crank (S2->Link)";
pub const L_SHIN: &str = "L_Shin (Knee->Foot)";

/// Where the servo 1 drive rod grabs the thigh. Cosmetic only.
const THIGH_CONNECT_RADIUS: f64 = 35.0;

/// Travel limits of the coaxial hub, in degrees
const MIN_THIGH_ANGLE: f64 = 80.0;
const MAX_OPENING: f64 = 170.0;
const MIN_CRANK_CLEARANCE: f64 = 10.0;

const LABELS: [&str; 7] = ["S1", "S2", "Knee", "CrankTip", "Mount", "Foot", "ThighConnect"];

/// Coaxial pantograph leg.
///
/// Thigh and crank both pivot on servo 2. Servo 1 swings the thigh, servo 2
/// swings the crank, and the shin is the closing side of the parallelogram.
#[derive(Debug, Clone, PartialEq)]
pub struct PantographLeg {
    state: LegState,
    l_thigh: f64,
    l_crank: f64,
    l_shin: f64,
    servo1: Point2D,
    servo2: Point2D,
}

impl PantographLeg {
    pub fn new() -> PantographLeg {
        let parameters = LegParameters::new(vec![
            LegParameter::new(L_THIGH, 95.0, 10.0, 105.0),
            LegParameter::new(L_CRANK, 10.0, 10.0, 55.0),
            LegParameter::new(L_SHIN, 95.0, 10.0, 95.0),
        ]);

        PantographLeg {
            l_thigh: 95.0,
            l_crank: 10.0,
            l_shin: 95.0,
            servo1: Point2D::from(SERVO1_POSITION),
            servo2: Point2D::from(SERVO2_POSITION),
            state: LegState::new(parameters).with_threshold(SERVO_COLLISION_THRESHOLD),
        }
    }

    /// Thigh and crank directions around the shared pivot, in degrees
    fn hub_angles(s2: &Point2D, knee: &Point2D, crank_tip: &Point2D) -> (f64, f64) {
        let thigh = knee - s2;
        let crank = crank_tip - s2;
        (
            thigh.y.atan2(thigh.x).to_degrees(),
            crank.y.atan2(crank.x).to_degrees(),
        )
    }
}

impl Default for PantographLeg {
    fn default() -> Self {
        PantographLeg::new()
    }
}

impl Linkage for PantographLeg {
    fn state(&self) -> &LegState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LegState {
        &mut self.state
    }

    fn display_name(&self) -> &'static str {
        "Pantograph"
    }

    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        let (theta1, theta2) = self.state.drive_angles(theta1_deg, theta2_deg);

        let thigh = polar_to_cartesian(self.l_thigh, theta1);
        let knee = self.servo2 + thigh;
        let thigh_connect = self.servo2 + polar_to_cartesian(THIGH_CONNECT_RADIUS, theta1);

        let crank_tip = self.servo2 + polar_to_cartesian(self.l_crank, theta2);

        // parallelogram closure
        let mount = crank_tip + thigh;

        let shin_dir = mount - knee;
        let norm = shin_dir.norm();
        if norm < MIN_DIRECTION_NORM {
            return None;
        }
        let foot = knee + shin_dir * (self.l_shin / norm);

        Some(Pose {
            foot,
            joints: JointSet::new()
                .with("S1", self.servo1)
                .with("S2", self.servo2)
                .with("Knee", knee)
                .with("CrankTip", crank_tip)
                .with("Mount", mount)
                .with("Foot", foot)
                .with("ThighConnect", thigh_connect),
        })
    }

    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        let l_thigh = require_param(params, self.display_name(), L_THIGH)?;
        let l_crank = require_param(params, self.display_name(), L_CRANK)?;
        let l_shin = require_param(params, self.display_name(), L_SHIN)?;

        self.l_thigh = l_thigh;
        self.l_crank = l_crank;
        self.l_shin = l_shin;
        self.state.parameters.set_values(params);
        Ok(())
    }

    fn check_collisions(&self, joints: &JointSet) -> bool {
        let Some([s1, s2, knee, crank_tip, mount, foot, _]) =
            lookup_joints(joints, LABELS, self.display_name())
        else {
            return true;
        };

        let (thigh_angle, crank_angle) = PantographLeg::hub_angles(&s2, &knee, &crank_tip);

        // thigh must stay clear of the frame
        if thigh_angle < MIN_THIGH_ANGLE {
            return true;
        }
        // fully stretched linkage locks up
        if thigh_angle - crank_angle > MAX_OPENING {
            return true;
        }
        // crank may never pass the thigh
        if crank_angle > thigh_angle - MIN_CRANK_CLEARANCE {
            return true;
        }

        // the coupler rides on the crank hub and is not checked against the servos
        let segments = [
            Segment::new(s2, knee),
            Segment::new(s2, crank_tip),
            Segment::new(knee, mount),
            Segment::new(knee, foot),
        ];
        let threshold = self.collision_threshold();

        segments
            .iter()
            .any(|seg| hits_servo(seg, &s1, threshold) || hits_servo(seg, &s2, threshold))
    }

    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        let Some([s1, s2, knee, crank_tip, mount, foot, thigh_connect]) =
            lookup_joints(joints, LABELS, self.display_name())
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
            link(s1, thigh_connect, LinkRole::Drive1),
            link(s2, knee, LinkRole::Drive1),
            link(s2, crank_tip, LinkRole::Drive2),
            link(crank_tip, mount, LinkRole::Passive),
            link(knee, mount, LinkRole::Passive),
            link(knee, foot, LinkRole::Effector),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_closes_the_parallelogram() {
        let leg = PantographLeg::new();
        let pose = leg.forward_kinematics(120.0, 40.0).unwrap();
        let j = &pose.joints;

        let s2 = j.get("S2").unwrap();
        let knee = j.get("Knee").unwrap();
        let crank_tip = j.get("CrankTip").unwrap();
        let mount = j.get("Mount").unwrap();

        assert!(((mount - crank_tip) - (knee - s2)).norm() < 1e-9);
        assert!(((pose.foot - knee).norm() - 95.0).abs() < 1e-9);
        // shin runs parallel to the crank
        let shin = (pose.foot - knee).normalize();
        let crank = (crank_tip - s2).normalize();
        assert!((shin - crank).norm() < 1e-9);
    }

    #[test]
    fn hub_limits_reject_low_thigh() {
        let leg = PantographLeg::new();
        let pose = leg.forward_kinematics(60.0, 10.0).unwrap();
        assert!(leg.check_collisions(&pose.joints));
    }

    #[test]
    fn hub_limits_reject_crank_past_thigh() {
        let leg = PantographLeg::new();
        let pose = leg.forward_kinematics(100.0, 95.0).unwrap();
        assert!(leg.check_collisions(&pose.joints));
    }

    #[test]
    fn hub_limits_reject_overextension() {
        let leg = PantographLeg::new();
        let pose = leg.forward_kinematics(175.0, 0.0).unwrap();
        assert!(leg.check_collisions(&pose.joints));
    }

    #[test]
    fn short_thigh_shin_sweeps_past_hub() {
        // thigh 100 deg, crank -65 deg: inside every hub limit
        let (theta1, theta2) = (100.0, -65.0);

        let mut leg = PantographLeg::new();
        let pose = leg.forward_kinematics(theta1, theta2).unwrap();
        let (thigh_angle, crank_angle) = PantographLeg::hub_angles(
            &pose.joints.get("S2").unwrap(),
            &pose.joints.get("Knee").unwrap(),
            &pose.joints.get("CrankTip").unwrap(),
        );
        assert!(thigh_angle >= MIN_THIGH_ANGLE);
        assert!(thigh_angle - crank_angle <= MAX_OPENING);
        assert!(crank_angle <= thigh_angle - MIN_CRANK_CLEARANCE);
        assert!(!leg.check_collisions(&pose.joints));

        // a 30mm thigh brings the knee close enough that the shin passes
        // about 7.8mm from S2
        let mut params = leg.parameters().values();
        params.insert(L_THIGH.to_string(), 30.0);
        leg.update_params(&params).unwrap();

        let pose = leg.forward_kinematics(theta1, theta2).unwrap();
        let knee = pose.joints.get("Knee").unwrap();
        let s2 = pose.joints.get("S2").unwrap();
        let shin_clearance = crate::geometry::dist_point_segment(&s2, &knee, &pose.foot);
        assert!(shin_clearance > 7.0 && shin_clearance < 8.5);
        assert!(leg.check_collisions(&pose.joints));
    }

    #[test]
    fn nominal_pose_is_free() {
        let leg = PantographLeg::new();
        let pose = leg.forward_kinematics(130.0, 60.0).unwrap();
        assert!(!leg.check_collisions(&pose.joints));
        assert_eq!(leg.describe_draw(&pose.joints).len(), 8);
    }
}
