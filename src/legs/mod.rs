//! Leg linkage models.
//!
//! Every topology implements [`Linkage`]; [`LegModel`] is the closed set of
//! variants the simulator hands out.

pub mod fivebar;
pub mod pantograph;
pub mod serial;

pub use fivebar::{FiveBarFrontLeg, FiveBarRearLeg};
pub use pantograph::PantographLeg;
pub use serial::SerialLeg;

use tracing::warn;

use crate::{
    datatypes::{DrawPrimitive, JointSet, LegParameters, ParamMap, Point2D, Pose, PoseStatus, Segment},
    error::LegscopeError,
    geometry::dist_point_segment,
};

/// Clearance used when a variant does not set its own
pub const DEFAULT_COLLISION_THRESHOLD: f64 = 5.0;

/// Servo radius (6mm) plus a 4mm margin
pub const SERVO_COLLISION_THRESHOLD: f64 = 10.0;

/// Below this length a foot direction vector is considered singular
pub const MIN_DIRECTION_NORM: f64 = 1e-6;

/// A segment endpoint closer than this to a servo is treated as mounted on it
const SERVO_MOUNT_TOLERANCE: f64 = 1e-3;

pub const SERVO1_POSITION: [f64; 2] = [-15.0, -10.0];
pub const SERVO2_POSITION: [f64; 2] = [0.0, 0.0];

/// State shared by every leg variant
#[derive(Debug, Clone, PartialEq)]
pub struct LegState {
    pub parameters: LegParameters,
    /// Calibration offset added to servo 1, in radians
    pub offset_t1: f64,
    /// Calibration offset added to servo 2, in radians
    pub offset_t2: f64,
    /// Minimum clearance in mm
    pub collision_threshold: f64,
}

impl LegState {
    pub fn new(parameters: LegParameters) -> LegState {
        LegState {
            parameters,
            offset_t1: 0.0,
            offset_t2: 0.0,
            collision_threshold: DEFAULT_COLLISION_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> LegState {
        self.collision_threshold = threshold;
        self
    }

    /// Servo angles in radians with calibration offsets applied
    pub fn drive_angles(&self, theta1_deg: f64, theta2_deg: f64) -> (f64, f64) {
        (
            theta1_deg.to_radians() + self.offset_t1,
            theta2_deg.to_radians() + self.offset_t2,
        )
    }
}

/// Capability shared by all leg topologies.
pub trait Linkage {
    fn state(&self) -> &LegState;

    fn state_mut(&mut self) -> &mut LegState;

    /// Human readable variant name
    fn display_name(&self) -> &'static str;

    /// Computes the joint positions for a pair of servo angles (degrees).
    ///
    /// Returns `None` for configurations the linkage cannot assemble.
    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose>;

    /// Overwrites the link lengths. Every parameter of the variant must be
    /// present in `params`.
    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError>;

    /// Returns `true` when the joint configuration interferes with itself or
    /// with a servo body.
    fn check_collisions(&self, joints: &JointSet) -> bool;

    /// Links and servos to render for a joint set
    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive>;

    /// Servo angles (degrees) the front end starts from
    fn home_angles(&self) -> (f64, f64) {
        (130.0, 90.0)
    }

    /// Whether the front end should expose calibration offsets
    fn has_offset_controls(&self) -> bool {
        false
    }

    fn parameters(&self) -> &LegParameters {
        &self.state().parameters
    }

    fn offsets(&self) -> (f64, f64) {
        (self.state().offset_t1, self.state().offset_t2)
    }

    fn set_offsets(&mut self, offset_t1: f64, offset_t2: f64) {
        let state = self.state_mut();
        state.offset_t1 = offset_t1;
        state.offset_t2 = offset_t2;
    }

    fn collision_threshold(&self) -> f64 {
        self.state().collision_threshold
    }

    fn pose_status(&self, theta1_deg: f64, theta2_deg: f64) -> PoseStatus {
        match self.forward_kinematics(theta1_deg, theta2_deg) {
            None => PoseStatus::InvalidGeometry,
            Some(pose) if self.check_collisions(&pose.joints) => PoseStatus::Collision,
            Some(_) => PoseStatus::Ok,
        }
    }
}

/// Reads a required parameter out of `params`
pub(crate) fn require_param(params: &ParamMap, variant: &str, key: &str) -> Result<f64, LegscopeError> {
    match params.get(key) {
        Some(value) => Ok(*value),
        None => Err(LegscopeError::MissingParameter {
            variant: variant.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Looks up several joints at once. Logs and returns `None` if any is absent.
pub(crate) fn lookup_joints<const N: usize>(
    joints: &JointSet,
    labels: [&'static str; N],
    variant: &str,
) -> Option<[Point2D; N]> {
    let mut points = [Point2D::zeros(); N];
    for (slot, label) in points.iter_mut().zip(labels) {
        match joints.get(label) {
            Some(p) => *slot = p,
            None => {
                warn!("{variant}: joint set is missing '{label}', treating pose as colliding");
                return None;
            }
        }
    }
    Some(points)
}

/// Tests a segment against a servo pivot, ignoring segments mounted on it
pub(crate) fn hits_servo(segment: &Segment, servo: &Point2D, threshold: f64) -> bool {
    if (segment.p1 - servo).norm() < SERVO_MOUNT_TOLERANCE
        || (segment.p2 - servo).norm() < SERVO_MOUNT_TOLERANCE
    {
        return false;
    }

    dist_point_segment(servo, &segment.p1, &segment.p2) < threshold
}

/// The leg topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegKind {
    Serial,
    Pantograph,
    FiveBarRear,
    FiveBarFront,
}

impl LegKind {
    pub const ALL: [LegKind; 4] = [
        LegKind::Serial,
        LegKind::Pantograph,
        LegKind::FiveBarRear,
        LegKind::FiveBarFront,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            LegKind::Serial => "Serial",
            LegKind::Pantograph => "Pantograph",
            LegKind::FiveBarRear => "Five-Bar Rear",
            LegKind::FiveBarFront => "Five-Bar Front",
        }
    }

    /// Key used for the variant in persisted configurations
    pub fn identifier(&self) -> &'static str {
        match self {
            LegKind::Serial => "SerialLeg",
            LegKind::Pantograph => "PantographLeg",
            LegKind::FiveBarRear => "FiveBarRearLeg",
            LegKind::FiveBarFront => "FiveBarFrontLeg",
        }
    }

    /// Resolves a display name, identifier or short alias
    /// (`serial`, `pantograph`, `fivebar-rear`, `fivebar-front`).
    pub fn from_name(name: &str) -> Result<LegKind, LegscopeError> {
        let wanted = normalize(name);
        LegKind::ALL
            .into_iter()
            .find(|kind| {
                normalize(kind.display_name()) == wanted
                    || normalize(kind.identifier()) == wanted
                    || normalize(kind.identifier().trim_end_matches("Leg")) == wanted
            })
            .ok_or_else(|| LegscopeError::UnknownVariant(name.to_string()))
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Any of the supported leg variants
#[derive(Debug, Clone, PartialEq)]
pub enum LegModel {
    Serial(SerialLeg),
    Pantograph(PantographLeg),
    FiveBarRear(FiveBarRearLeg),
    FiveBarFront(FiveBarFrontLeg),
}

impl LegModel {
    /// Builds a variant with its default link lengths
    pub fn new(kind: LegKind) -> LegModel {
        match kind {
            LegKind::Serial => LegModel::Serial(SerialLeg::new()),
            LegKind::Pantograph => LegModel::Pantograph(PantographLeg::new()),
            LegKind::FiveBarRear => LegModel::FiveBarRear(FiveBarRearLeg::new()),
            LegKind::FiveBarFront => LegModel::FiveBarFront(FiveBarFrontLeg::new()),
        }
    }

    pub fn kind(&self) -> LegKind {
        match self {
            LegModel::Serial(_) => LegKind::Serial,
            LegModel::Pantograph(_) => LegKind::Pantograph,
            LegModel::FiveBarRear(_) => LegKind::FiveBarRear,
            LegModel::FiveBarFront(_) => LegKind::FiveBarFront,
        }
    }

    fn linkage(&self) -> &dyn Linkage {
        match self {
            LegModel::Serial(leg) => leg,
            LegModel::Pantograph(leg) => leg,
            LegModel::FiveBarRear(leg) => leg,
            LegModel::FiveBarFront(leg) => leg,
        }
    }

    fn linkage_mut(&mut self) -> &mut dyn Linkage {
        match self {
            LegModel::Serial(leg) => leg,
            LegModel::Pantograph(leg) => leg,
            LegModel::FiveBarRear(leg) => leg,
            LegModel::FiveBarFront(leg) => leg,
        }
    }
}

impl Linkage for LegModel {
    fn state(&self) -> &LegState {
        self.linkage().state()
    }

    fn state_mut(&mut self) -> &mut LegState {
        self.linkage_mut().state_mut()
    }

    fn display_name(&self) -> &'static str {
        self.linkage().display_name()
    }

    fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        self.linkage().forward_kinematics(theta1_deg, theta2_deg)
    }

    fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        self.linkage_mut().update_params(params)
    }

    fn check_collisions(&self, joints: &JointSet) -> bool {
        self.linkage().check_collisions(joints)
    }

    fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        self.linkage().describe_draw(joints)
    }

    fn home_angles(&self) -> (f64, f64) {
        self.linkage().home_angles()
    }

    fn has_offset_controls(&self) -> bool {
        self.linkage().has_offset_controls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_resolves_aliases() {
        assert_eq!(LegKind::from_name("serial").unwrap(), LegKind::Serial);
        assert_eq!(LegKind::from_name("PantographLeg").unwrap(), LegKind::Pantograph);
        assert_eq!(LegKind::from_name("Five-Bar Rear").unwrap(), LegKind::FiveBarRear);
        assert_eq!(LegKind::from_name("fivebar-front").unwrap(), LegKind::FiveBarFront);
        assert!(matches!(
            LegKind::from_name("hexapod"),
            Err(LegscopeError::UnknownVariant(_))
        ));
    }

    #[test]
    fn model_kind_round_trips() {
        for kind in LegKind::ALL {
            assert_eq!(LegModel::new(kind).kind(), kind);
        }
    }

    #[test]
    fn hits_servo_skips_mounted_segments() {
        let servo = Point2D::new(0.0, 0.0);
        let mounted = Segment::new(servo, Point2D::new(50.0, 0.0));
        assert!(!hits_servo(&mounted, &servo, 10.0));

        let passing = Segment::new(Point2D::new(-20.0, 5.0), Point2D::new(20.0, 5.0));
        assert!(hits_servo(&passing, &servo, 10.0));

        let clear = Segment::new(Point2D::new(-20.0, 15.0), Point2D::new(20.0, 15.0));
        assert!(!hits_servo(&clear, &servo, 10.0));
    }

    #[test]
    fn only_fivebars_expose_offsets() {
        for kind in LegKind::ALL {
            let expected = matches!(kind, LegKind::FiveBarRear | LegKind::FiveBarFront);
            assert_eq!(LegModel::new(kind).has_offset_controls(), expected);
        }
    }

    #[test]
    fn missing_joint_counts_as_collision() {
        let model = LegModel::new(LegKind::FiveBarFront);
        let joints = JointSet::new().with("S1", Point2D::new(-15.0, -10.0));
        assert!(model.check_collisions(&joints));
    }
}
