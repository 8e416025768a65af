use std::collections::BTreeMap;

use nalgebra::Vector2;

/// A planar point or direction, in millimeters.
pub type Point2D = Vector2<f64>;

/// Parameter name to value, as pushed in by the front end.
pub type ParamMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p1: Point2D,
    pub p2: Point2D,
}

impl Segment {
    pub fn new(p1: Point2D, p2: Point2D) -> Segment {
        Segment { p1, p2 }
    }
}

/// A tunable link length together with its slider bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct LegParameter {
    pub name: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl LegParameter {
    pub const fn new(name: &'static str, value: f64, min: f64, max: f64) -> LegParameter {
        LegParameter {
            name,
            value,
            min,
            max,
        }
    }
}

/// Ordered set of a model's parameters. Bounds are fixed at construction,
/// only the current values move.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegParameters {
    entries: Vec<LegParameter>,
}

impl LegParameters {
    pub fn new(entries: Vec<LegParameter>) -> LegParameters {
        LegParameters { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegParameter> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LegParameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|p| p.name).collect()
    }

    /// Current values keyed by parameter name
    pub fn values(&self) -> ParamMap {
        self.entries
            .iter()
            .map(|p| (p.name.to_string(), p.value))
            .collect()
    }

    /// Overwrites current values for every known key present in `params`.
    /// Unknown keys are ignored.
    pub fn set_values(&mut self, params: &ParamMap) {
        for entry in self.entries.iter_mut() {
            if let Some(value) = params.get(entry.name) {
                entry.value = *value;
            }
        }
    }
}

/// Named joint positions produced by one forward-kinematics evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointSet {
    joints: Vec<(&'static str, Point2D)>,
}

impl JointSet {
    pub fn new() -> JointSet {
        JointSet { joints: Vec::new() }
    }

    pub fn with(mut self, label: &'static str, point: Point2D) -> JointSet {
        self.insert(label, point);
        self
    }

    pub fn insert(&mut self, label: &'static str, point: Point2D) {
        match self.joints.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = point,
            None => self.joints.push((label, point)),
        }
    }

    pub fn get(&self, label: &str) -> Option<Point2D> {
        self.joints
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, Point2D)> {
        self.joints.iter()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// Result of a successful forward-kinematics call
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub foot: Point2D,
    pub joints: JointSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseStatus {
    Ok,
    InvalidGeometry,
    Collision,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceResult {
    pub points: Vec<Point2D>,
    pub area: f64,
    pub boundary: Vec<Segment>,
}

/// Axis-aligned ellipse centered on x = 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EllipseFit {
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// Driven by servo 1
    Drive1,
    /// Driven by servo 2
    Drive2,
    Passive,
    Effector,
}

/// Plain geometry handed to a renderer; styling is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Servo {
        label: &'static str,
        center: Point2D,
        offset_rad: f64,
    },
    Link {
        from: Point2D,
        to: Point2D,
        role: LinkRole,
    },
}
