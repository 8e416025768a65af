//! Planar two-servo leg linkage simulator.
//!
//! Forward kinematics and collision rules for serial, pantograph and five-bar
//! legs, a workspace scanner with alpha-shape boundary extraction, and a
//! centered gait-ellipse fitter. [`Simulator`] is the entry point for front
//! ends; the CLI in `main.rs` is one of them.

pub mod alpha_shape;
pub mod config;
pub mod datatypes;
pub mod ellipse;
pub mod error;
pub mod geometry;
pub mod legs;
pub mod optimizer;
pub mod post_processor;
pub mod simulator;
pub mod workspace;

pub use datatypes::{
    DrawPrimitive, EllipseFit, JointSet, LegParameter, LegParameters, LinkRole, ParamMap, Point2D,
    Pose, PoseStatus, Segment, WorkspaceResult,
};
pub use error::LegscopeError;
pub use legs::{LegKind, LegModel, Linkage};
pub use simulator::Simulator;

/// Installs the global tracing subscriber
///
/// Honors `RUST_LOG` and falls back to `info`. Log lines go to stderr so
/// command output on stdout stays clean.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
