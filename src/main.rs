//! Command-line front end for the leg simulator.
//!
//! - `variants`: list the leg variants and their parameters
//! - `pose`: evaluate one servo pose
//! - `workspace`: scan a leg and fit the gait ellipse
//! - `optimize`: search link lengths and store the result

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use legscope::{
    config::{self, LegConfigFile, DEFAULT_CONFIG_FILE},
    optimizer::{optimize_leg, OptimizerSettings},
    post_processor, DrawPrimitive, Linkage, PoseStatus, Simulator,
};

/// Planar leg linkage workspace simulator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Selects and configures the leg to work on.
#[derive(Args)]
struct LegArgs {
    /// Variant name, identifier or alias (serial, pantograph, fivebar-rear, fivebar-front).
    #[arg(short, long, default_value = "serial")]
    variant: String,

    /// Stored configuration to apply before anything else.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter override as "name=value"; may be repeated.
    #[arg(short, long = "set")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List variants with their parameters and bounds.
    Variants,

    /// Evaluate a single servo pose.
    Pose {
        #[command(flatten)]
        leg: LegArgs,

        /// Servo 1 angle in degrees; defaults to the variant's home pose.
        #[arg(long)]
        theta1: Option<f64>,

        /// Servo 2 angle in degrees; defaults to the variant's home pose.
        #[arg(long)]
        theta2: Option<f64>,
    },

    /// Scan the workspace and fit the centered gait ellipse.
    Workspace {
        #[command(flatten)]
        leg: LegArgs,

        /// Samples per servo.
        #[arg(short, long, default_value_t = 60)]
        resolution: usize,

        /// Write scanned foot points to this CSV.
        #[arg(long)]
        points: Option<PathBuf>,

        /// Write boundary segments to this CSV.
        #[arg(long)]
        boundary: Option<PathBuf>,
    },

    /// Search link lengths for the widest gait ellipse.
    Optimize {
        #[command(flatten)]
        leg: LegArgs,

        /// Samples per servo for each evaluation.
        #[arg(short, long, default_value_t = 40)]
        resolution: usize,

        /// Nelder-Mead iteration limit.
        #[arg(short, long, default_value_t = 100)]
        max_iters: u64,

        /// Config file the result is merged into.
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

/// Builds a simulator with the requested variant selected and configured
fn prepare(leg: &LegArgs) -> anyhow::Result<Simulator> {
    let mut sim = Simulator::new();

    if let Some(path) = &leg.config {
        let stored = LegConfigFile::load(path)?;
        config::apply_config(&mut sim, &stored)?;
    }

    let kind = sim.select_variant(&leg.variant)?;

    let overrides = leg
        .set
        .iter()
        .map(|text| config::parse_override(text))
        .collect::<Result<Vec<_>, _>>()?;
    if !overrides.is_empty() {
        config::apply_overrides(sim.model_for_mut(kind), &overrides)?;
    }

    Ok(sim)
}

fn list_variants(sim: &Simulator) {
    for kind in sim.list_variants() {
        let model = sim.model_for(kind);
        let (home_t1, home_t2) = model.home_angles();
        println!(
            "{} ({}), home {}/{} deg{}",
            kind.display_name(),
            kind.identifier(),
            home_t1,
            home_t2,
            if model.has_offset_controls() {
                ", offsets adjustable"
            } else {
                ""
            }
        );
        for parameter in model.parameters().iter() {
            println!(
                "    {:<22} {:>6.1}  [{}, {}]",
                parameter.name, parameter.value, parameter.min, parameter.max
            );
        }
    }
}

fn show_pose(sim: &Simulator, theta1: Option<f64>, theta2: Option<f64>) {
    let (home_t1, home_t2) = sim.model().home_angles();
    let theta1 = theta1.unwrap_or(home_t1);
    let theta2 = theta2.unwrap_or(home_t2);

    println!("{} at {theta1}/{theta2} deg", sim.model().display_name());

    let Some(pose) = sim.forward_kinematics(theta1, theta2) else {
        println!("status: {:?}", PoseStatus::InvalidGeometry);
        return;
    };

    for (label, point) in pose.joints.iter() {
        println!("    {:<12} ({:.3}, {:.3})", label, point.x, point.y);
    }
    println!("status: {:?}", sim.pose_status(theta1, theta2));

    let links = sim
        .describe_draw(&pose.joints)
        .iter()
        .filter(|p| matches!(p, DrawPrimitive::Link { .. }))
        .count();
    println!("draw: {links} links");
}

fn run_workspace(
    sim: &Simulator,
    resolution: usize,
    points: Option<PathBuf>,
    boundary: Option<PathBuf>,
) -> anyhow::Result<()> {
    let result = sim.compute_workspace(resolution);
    let ellipse = sim.fit_centered_ellipse(&result.boundary);

    println!("{} workspace", sim.model().display_name());
    println!("    points:   {}", result.points.len());
    println!(
        "    area:     {:.1} mm^2 ({:.2} cm^2)",
        result.area,
        result.area / 100.0
    );
    println!("    boundary: {} segments", result.boundary.len());
    println!(
        "    ellipse:  width {:.1} mm, height {:.1} mm, center y {:.1} mm",
        ellipse.width, ellipse.height, ellipse.center_y
    );

    if let Some(path) = points {
        post_processor::points_csv(&result.points, &path)?;
    }
    if let Some(path) = boundary {
        post_processor::boundary_csv(&result.boundary, &path)?;
    }

    Ok(())
}

fn run_optimize(sim: &Simulator, settings: OptimizerSettings, output: PathBuf) -> anyhow::Result<()> {
    let kind = sim.selected();
    let best = optimize_leg(sim.model(), &settings)?;

    println!(
        "{}: width {:.1} mm, area {:.1} mm^2",
        kind.display_name(),
        best.ellipse_width.unwrap_or_default(),
        best.area.unwrap_or_default()
    );
    for (name, value) in &best.parameters {
        println!("    {name:<22} {value:.2}");
    }

    let mut stored = LegConfigFile::load_or_default(&output)?;
    stored.insert(kind, best);
    stored
        .save(&output)
        .with_context(|| format!("saving optimized {}", kind.identifier()))?;

    info!("merged {} into {}", kind.identifier(), output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    legscope::init_logging()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Variants => list_variants(&Simulator::new()),
        Commands::Pose { leg, theta1, theta2 } => {
            let sim = prepare(&leg)?;
            show_pose(&sim, theta1, theta2);
        }
        Commands::Workspace {
            leg,
            resolution,
            points,
            boundary,
        } => {
            let sim = prepare(&leg)?;
            run_workspace(&sim, resolution, points, boundary)?;
        }
        Commands::Optimize {
            leg,
            resolution,
            max_iters,
            output,
        } => {
            let sim = prepare(&leg)?;
            let settings = OptimizerSettings {
                resolution,
                max_iters,
                ..OptimizerSettings::default()
            };
            run_optimize(&sim, settings, output)?;
        }
    }

    Ok(())
}
