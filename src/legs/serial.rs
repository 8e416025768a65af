use crate::{
    datatypes::{DrawPrimitive, JointSet, LegParameter, LegParameters, LinkRole, ParamMap, Point2D, Pose},
    error::LegscopeError,
    geometry::polar_to_cartesian,
};

use super::{lookup_joints, require_param, LegState, Linkage, SERVO_COLLISION_THRESHOLD};

pub const L1: &str = "L1 (S1->Knee)";
pub const L2: &str = "L2 (Knee->Foot)";

/// Two-link serial leg.
///
/// Base -> thigh (L1) -> knee -> shin (L2) -> foot, with the knee angle
/// measured relative to the thigh (theta1 - theta2).
#[derive(Debug, Clone, PartialEq)]
pub struct SerialLeg {
    state: LegState,
    l1: f64,
    l2: f64,
    base: Point2D,
}

impl SerialLeg {
    pub fn new() -> SerialLeg {
        let parameters = LegParameters::new(vec![
            LegParameter::new(L1, 50.0, 10.0, 105.0),
            LegParameter::new(L2, 95.0, 10.0, 105.0),
        ]);

        SerialLeg {
            l1: 50.0,
            l2: 95.0,
            base: Point2D::zeros(),
            state: LegState::new(parameters).with_threshold(SERVO_COLLISION_THRESHOLD),
        }
    }
}

impl Default for SerialLeg {
    fn default() -> Self {
        SerialLeg::new()
    }
}

impl Linkage for SerialLeg {
    fn state(&self) -> &LegState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LegState {
        &mut self.state
    }

    fn display_name(&self) -> &'static str {
        "Serial"
    }

    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        let (theta1, theta2) = self.state.drive_angles(theta1_deg, theta2_deg);

        let knee = self.base + polar_to_cartesian(self.l1, theta1);
        let foot = knee + polar_to_cartesian(self.l2, theta1 - theta2);

        Some(Pose {
            foot,
            joints: JointSet::new()
                .with("Base", self.base)
                .with("Knee", knee)
                .with("Foot", foot),
        })
    }

    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        let l1 = require_param(params, self.display_name(), L1)?;
        let l2 = require_param(params, self.display_name(), L2)?;

        self.l1 = l1;
        self.l2 = l2;
        self.state.parameters.set_values(params);
        Ok(())
    }

    fn check_collisions(&self, joints: &JointSet) -> bool {
        let Some([base, foot]) = lookup_joints(joints, ["Base", "Foot"], self.display_name()) else {
            return true;
        };

        (foot - base).norm() < self.collision_threshold()
    }

    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        let Some([base, knee, foot]) =
            lookup_joints(joints, ["Base", "Knee", "Foot"], self.display_name())
        else {
            return Vec::new();
        };

        vec![
            DrawPrimitive::Servo {
                label: "Base",
                center: base,
                offset_rad: self.state.offset_t1,
            },
            DrawPrimitive::Link {
                from: base,
                to: knee,
                role: LinkRole::Drive1,
            },
            DrawPrimitive::Link {
                from: knee,
                to: foot,
                role: LinkRole::Effector,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point2D, x: f64, y: f64) -> bool {
        (a - Point2D::new(x, y)).norm() < 1e-9
    }

    #[test]
    fn straight_leg_points_up_the_y_axis() {
        let leg = SerialLeg::new();
        let pose = leg.forward_kinematics(90.0, 0.0).unwrap();

        assert!(close(pose.joints.get("Knee").unwrap(), 0.0, 50.0));
        assert!(close(pose.joints.get("Foot").unwrap(), 0.0, 145.0));
        assert_eq!(pose.foot, pose.joints.get("Foot").unwrap());
    }

    #[test]
    fn knee_bend_is_relative_to_thigh() {
        let leg = SerialLeg::new();
        // thigh along +x, shin at -90 degrees from it
        let pose = leg.forward_kinematics(0.0, 90.0).unwrap();
        assert!(close(pose.foot, 50.0, -95.0));
    }

    #[test]
    fn offsets_shift_drive_angles() {
        let mut leg = SerialLeg::new();
        leg.set_offsets(std::f64::consts::FRAC_PI_2, 0.0);
        let pose = leg.forward_kinematics(0.0, 0.0).unwrap();
        assert!(close(pose.foot, 0.0, 145.0));
    }

    #[test]
    fn forward_kinematics_is_deterministic() {
        let leg = SerialLeg::new();
        assert_eq!(leg.forward_kinematics(33.0, 71.0), leg.forward_kinematics(33.0, 71.0));
    }

    #[test]
    fn foot_near_base_collides() {
        let mut params = ParamMap::new();
        params.insert(L1.to_string(), 50.0);
        params.insert(L2.to_string(), 50.0);

        let mut leg = SerialLeg::new();
        leg.update_params(&params).unwrap();

        // shin folds straight back onto the base
        let pose = leg.forward_kinematics(90.0, 180.0).unwrap();
        assert!(leg.check_collisions(&pose.joints));

        let pose = leg.forward_kinematics(90.0, 0.0).unwrap();
        assert!(!leg.check_collisions(&pose.joints));
    }

    #[test]
    fn update_params_requires_every_link() {
        let mut params = ParamMap::new();
        params.insert(L1.to_string(), 60.0);

        let mut leg = SerialLeg::new();
        let err = leg.update_params(&params).unwrap_err();
        assert!(matches!(err, LegscopeError::MissingParameter { ref key, .. } if key == L2));

        // nothing was applied
        assert_eq!(leg.parameters().get(L1).unwrap().value, 50.0);
    }

    #[test]
    fn update_params_moves_current_values() {
        let mut params = ParamMap::new();
        params.insert(L1.to_string(), 60.0);
        params.insert(L2.to_string(), 80.0);

        let mut leg = SerialLeg::new();
        leg.update_params(&params).unwrap();

        assert_eq!(leg.parameters().get(L1).unwrap().value, 60.0);
        assert_eq!(leg.parameters().get(L2).unwrap().max, 105.0);
        let pose = leg.forward_kinematics(90.0, 0.0).unwrap();
        assert!(close(pose.foot, 0.0, 140.0));
    }
}
