use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use argmin::{
    core::{
        observers::{Observe, ObserverMode},
        CostFunction, Error, Executor, State, KV,
    },
    solver::neldermead::NelderMead,
};

use crate::{
    config::VariantConfig,
    datatypes::ParamMap,
    ellipse::fit_centered_ellipse,
    error::LegscopeError,
    legs::{LegModel, Linkage},
    workspace::compute_workspace,
};

/// Offsets are searched within +/- this many degrees
pub const OFFSET_SEARCH_LIMIT_DEG: f64 = 90.0;

/// Weight of workspace area in the score; only breaks ties between widths
pub const AREA_WEIGHT: f64 = 1e-5;

/// Initial simplex edge as a fraction of each coordinate's range
const SIMPLEX_STEP_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    /// Samples per servo for each workspace scan
    pub resolution: usize,
    pub max_iters: u64,
    /// Stop once the simplex costs spread less than this
    pub sd_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            resolution: 40,
            max_iters: 100,
            sd_tolerance: 1e-3,
        }
    }
}

/// Search coordinates: every link length in parameter order, followed by
/// both offsets in degrees when the variant exposes them
#[derive(Debug, Clone)]
struct SearchSpace {
    names: Vec<&'static str>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    with_offsets: bool,
}

impl SearchSpace {
    fn for_model(model: &LegModel) -> SearchSpace {
        let mut names = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        for parameter in model.parameters().iter() {
            names.push(parameter.name);
            lower.push(parameter.min);
            upper.push(parameter.max);
        }

        let with_offsets = model.has_offset_controls();
        if with_offsets {
            lower.extend([-OFFSET_SEARCH_LIMIT_DEG; 2]);
            upper.extend([OFFSET_SEARCH_LIMIT_DEG; 2]);
        }

        SearchSpace {
            names,
            lower,
            upper,
            with_offsets,
        }
    }

    fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Current model state as a search point
    fn start(&self, model: &LegModel) -> Vec<f64> {
        let mut x: Vec<f64> = model.parameters().iter().map(|p| p.value).collect();
        if self.with_offsets {
            let (offset_t1, offset_t2) = model.offsets();
            x.push(offset_t1.to_degrees());
            x.push(offset_t2.to_degrees());
        }
        self.clamp(&x)
    }

    fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }

    /// Start point plus one vertex per coordinate, stepped toward the
    /// interior of its range
    fn initial_simplex(&self, start: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = vec![start.to_vec()];
        for i in 0..self.dimension() {
            let step = (self.upper[i] - self.lower[i]) * SIMPLEX_STEP_FRACTION;
            let mut vertex = start.to_vec();
            vertex[i] = if start[i] + step <= self.upper[i] {
                start[i] + step
            } else {
                start[i] - step
            };
            simplex.push(vertex);
        }
        simplex
    }

    /// Copy of `base` configured at search point `x`
    fn apply(&self, base: &LegModel, x: &[f64]) -> Result<LegModel, LegscopeError> {
        let x = self.clamp(x);
        let params: ParamMap = self
            .names
            .iter()
            .zip(&x)
            .map(|(name, value)| (name.to_string(), *value))
            .collect();

        let mut model = base.clone();
        model.update_params(&params)?;
        if self.with_offsets {
            let n = self.names.len();
            model.set_offsets(x[n].to_radians(), x[n + 1].to_radians());
        }
        Ok(model)
    }
}

/// Ellipse width and workspace area of a model at the given scan resolution
pub fn score_model(model: &LegModel, resolution: usize) -> (f64, f64) {
    let workspace = compute_workspace(model, resolution);
    let ellipse = fit_centered_ellipse(&workspace.boundary);
    (ellipse.width, workspace.area)
}

fn combined_score(width: f64, area: f64) -> f64 {
    width + AREA_WEIGHT * area
}

/// Negated score of a candidate, for the minimizer
struct WorkspaceCost<'a> {
    base: &'a LegModel,
    space: &'a SearchSpace,
    resolution: usize,
}

impl<'a> CostFunction for WorkspaceCost<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        let model = self.space.apply(self.base, x)?;
        let (width, area) = score_model(&model, self.resolution);
        Ok(-combined_score(width, area))
    }
}

/// Observer bar for the Nelder-Mead search
struct OptimizerObserverBar {
    bar: ProgressBar,
}

impl OptimizerObserverBar {
    fn new(max_iters: u64) -> OptimizerObserverBar {
        let bar = ProgressBar::new(max_iters);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        OptimizerObserverBar { bar }
    }
}

impl<I> Observe<I> for OptimizerObserverBar
where
    I: State<Float = f64>,
{
    fn observe_init(&mut self, _name: &str, _state: &I, _kv: &KV) -> Result<(), Error> {
        Ok(())
    }

    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        self.bar.set_position(state.get_iter());
        self.bar
            .set_message(format!("best score {:.2}", -state.get_best_cost()));
        Ok(())
    }

    fn observe_final(&mut self, _state: &I) -> Result<(), Error> {
        self.bar.finish();
        Ok(())
    }
}

/// Searches link lengths (and offsets, where the variant has them) for the
/// widest centered gait ellipse
///
/// # Arguments
/// * `model` - The starting model; it is not modified
/// * `settings` - Scan resolution and stopping criteria
///
/// # Returns
/// A config entry holding the best parameters with their ellipse width and
/// workspace area
pub fn optimize_leg(
    model: &LegModel,
    settings: &OptimizerSettings,
) -> Result<VariantConfig, LegscopeError> {
    let space = SearchSpace::for_model(model);
    let start = space.start(model);
    let (start_width, start_area) = score_model(&space.apply(model, &start)?, settings.resolution);

    info!(
        "optimizing {} over {} coordinates (start width {:.1}, area {:.1})",
        model.display_name(),
        space.dimension(),
        start_width,
        start_area
    );

    let solver = match NelderMead::new(space.initial_simplex(&start))
        .with_sd_tolerance(settings.sd_tolerance)
    {
        Ok(s) => s,
        Err(err) => {
            return Err(LegscopeError::Optimizer(format!(
                "Nelder-Mead setup error: {err}"
            )))
        }
    };

    let cost = WorkspaceCost {
        base: model,
        space: &space,
        resolution: settings.resolution,
    };
    let observer = OptimizerObserverBar::new(settings.max_iters);

    let start_time = std::time::Instant::now();
    let res = match Executor::new(cost, solver)
        .configure(|state| state.max_iters(settings.max_iters))
        .add_observer(observer, ObserverMode::Always)
        .run()
    {
        Ok(r) => r,
        Err(err) => {
            return Err(LegscopeError::Optimizer(format!(
                "Nelder-Mead error: {err}"
            )))
        }
    };

    let best_param = match res.state().get_best_param() {
        Some(p) => p.clone(),
        None => {
            return Err(LegscopeError::Optimizer(
                "Nelder-Mead could not produce best parameter".to_owned(),
            ))
        }
    };

    let best_model = space.apply(model, &best_param)?;
    let (width, area) = score_model(&best_model, settings.resolution);

    info!(
        "optimized {} in {:.1} seconds over {} iterations: width {:.1}, area {:.1}",
        model.display_name(),
        start_time.elapsed().as_secs_f32(),
        res.state().get_iter(),
        width,
        area
    );

    let mut config = VariantConfig::from_model(&best_model);
    config.ellipse_width = Some(width);
    config.area = Some(area);
    Ok(config)
}
