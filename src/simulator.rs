use tracing::info;

use crate::{
    datatypes::{DrawPrimitive, EllipseFit, JointSet, ParamMap, Pose, PoseStatus, Segment, WorkspaceResult},
    ellipse::fit_centered_ellipse,
    error::LegscopeError,
    legs::{LegKind, LegModel, Linkage},
    workspace::compute_workspace,
};

/// Entry point for a front end: owns one model per variant and forwards
/// every call to the selected one.
#[derive(Debug, Clone)]
pub struct Simulator {
    models: Vec<LegModel>,
    selected: LegKind,
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator::new()
    }
}

impl Simulator {
    /// Builds every variant with default parameters and selects the serial leg
    pub fn new() -> Simulator {
        Simulator {
            models: LegKind::ALL.into_iter().map(LegModel::new).collect(),
            selected: LegKind::Serial,
        }
    }

    pub fn list_variants(&self) -> Vec<LegKind> {
        LegKind::ALL.to_vec()
    }

    /// Selects a variant by display name, identifier or alias
    pub fn select_variant(&mut self, name: &str) -> Result<LegKind, LegscopeError> {
        let kind = LegKind::from_name(name)?;
        self.selected = kind;
        info!("selected {} leg", kind.display_name());
        Ok(kind)
    }

    pub fn selected(&self) -> LegKind {
        self.selected
    }

    pub fn model(&self) -> &LegModel {
        self.model_for(self.selected)
    }

    pub fn model_for(&self, kind: LegKind) -> &LegModel {
        // `models` is built from LegKind::ALL in order
        &self.models[kind as usize]
    }

    pub fn model_for_mut(&mut self, kind: LegKind) -> &mut LegModel {
        &mut self.models[kind as usize]
    }

    fn model_mut(&mut self) -> &mut LegModel {
        self.model_for_mut(self.selected)
    }

    pub fn update_params(&mut self, params: &ParamMap) -> Result<(), LegscopeError> {
        self.model_mut().update_params(params)
    }

    /// Sets both calibration offsets, in radians
    pub fn set_offsets(&mut self, offset_t1: f64, offset_t2: f64) {
        self.model_mut().set_offsets(offset_t1, offset_t2)
    }

    pub fn forward_kinematics(&self, theta1_deg: f64, theta2_deg: f64) -> Option<Pose> {
        self.model().forward_kinematics(theta1_deg, theta2_deg)
    }

    pub fn check_collisions(&self, joints: &JointSet) -> bool {
        self.model().check_collisions(joints)
    }

    pub fn pose_status(&self, theta1_deg: f64, theta2_deg: f64) -> PoseStatus {
        self.model().pose_status(theta1_deg, theta2_deg)
    }

    pub fn describe_draw(&self, joints: &JointSet) -> Vec<DrawPrimitive> {
        self.model().describe_draw(joints)
    }

    pub fn compute_workspace(&self, resolution: usize) -> WorkspaceResult {
        compute_workspace(self.model(), resolution)
    }

    pub fn fit_centered_ellipse(&self, boundary: &[Segment]) -> EllipseFit {
        fit_centered_ellipse(boundary)
    }
}
