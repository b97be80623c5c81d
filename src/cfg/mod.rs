use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod method;
pub use method::{AcceptanceCriterion, Algorithm, IntegratorType};

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown optimization algorithm")]
    UnknownAlgorithm,
    #[error("unknown integrator")]
    UnknownIntegrator,
    #[error("unknown line search acceptance criterion")]
    UnknownAcceptanceCriterion,
    #[error("time horizon must be positive and finite")]
    InvalidTimeHorizon,
    #[error("sampling time must be positive and not exceed the time horizon")]
    InvalidSamplingTime,
    #[error("simulation step must be positive and not exceed the sampling time")]
    InvalidSimulationStep,
    #[error("integration tolerances must be positive")]
    InvalidTolerance,
    #[error("at least one worker thread is required")]
    NoWorkers,
    #[error("at least one iteration is required")]
    NoIterations,
    #[error("min. cost improvement must be positive")]
    InvalidCostImprovement,
    #[error("merit defect weight must be positive")]
    InvalidMeritWeight,
    #[error("invalid line search settings: {0}")]
    InvalidLineSearch(&'static str),
    #[error("invalid regularization settings: {0}")]
    InvalidRegularization(&'static str),
}

fn default_time_horizon() -> f64 {
    3.0
}

fn default_dt() -> f64 {
    0.01
}

fn default_dt_sim() -> f64 {
    0.01
}

fn default_tolerance() -> f64 {
    1.0E-8
}

fn default_max_iterations() -> usize {
    100
}

fn default_min_cost_improvement() -> f64 {
    1.0E-5
}

fn default_nthreads() -> usize {
    1
}

fn default_merit_defect_weight() -> f64 {
    1.0
}

fn default_line_search_active() -> bool {
    true
}

fn default_line_search_iterations() -> usize {
    10
}

fn default_alpha_0() -> f64 {
    1.0
}

fn default_alpha_decay() -> f64 {
    0.5
}

fn default_armijo_parameter() -> f64 {
    1.0E-4
}

fn default_mu_initial() -> f64 {
    1.0E-6
}

fn default_mu_min() -> f64 {
    1.0E-6
}

fn default_mu_max() -> f64 {
    1.0E10
}

fn default_mu_factor() -> f64 {
    1.6
}

/// Line search (step size backtracking) options
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchOpts {
    /// When turned off, only [Self::alpha_0] is attempted.
    #[cfg_attr(feature = "serde", serde(default = "default_line_search_active"))]
    pub active: bool,
    /// Maximal number of step sizes to attempt
    #[cfg_attr(feature = "serde", serde(default = "default_line_search_iterations"))]
    pub max_iterations: usize,
    /// Initial step size
    #[cfg_attr(feature = "serde", serde(default = "default_alpha_0"))]
    pub alpha_0: f64,
    /// Step size decay factor, within ]0, 1[
    #[cfg_attr(feature = "serde", serde(default = "default_alpha_decay"))]
    pub alpha_decay: f64,
    /// Acceptance criterion
    #[cfg_attr(feature = "serde", serde(default))]
    pub acceptance: AcceptanceCriterion,
    /// Sufficient decrease parameter, only used by [AcceptanceCriterion::Armijo]
    #[cfg_attr(feature = "serde", serde(default = "default_armijo_parameter"))]
    pub armijo_parameter: f64,
}

impl Default for LineSearchOpts {
    fn default() -> Self {
        Self {
            active: default_line_search_active(),
            max_iterations: default_line_search_iterations(),
            alpha_0: default_alpha_0(),
            alpha_decay: default_alpha_decay(),
            acceptance: AcceptanceCriterion::default(),
            armijo_parameter: default_armijo_parameter(),
        }
    }
}

impl LineSearchOpts {
    /// Step sizes to attempt, in order.
    pub(crate) fn step_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        let tries = if self.active { self.max_iterations } else { 1 };
        std::iter::successors(Some(self.alpha_0), |alpha| Some(alpha * self.alpha_decay))
            .take(tries)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidLineSearch("zero iterations"));
        }
        if !(self.alpha_0 > 0.0 && self.alpha_0.is_finite()) {
            return Err(Error::InvalidLineSearch("initial step size"));
        }
        if !(self.alpha_decay > 0.0 && self.alpha_decay < 1.0) {
            return Err(Error::InvalidLineSearch("step size decay"));
        }
        if !(self.armijo_parameter > 0.0 && self.armijo_parameter < 1.0) {
            return Err(Error::InvalidLineSearch("armijo parameter"));
        }
        Ok(())
    }
}

/// Regularization (Levenberg Marquardt like) schedule options,
/// applied to the control hessian of the backward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegularizationOpts {
    /// Regularization of the first iteration
    #[cfg_attr(feature = "serde", serde(default = "default_mu_initial"))]
    pub initial: f64,
    /// Below this value, regularization is dropped entirely
    #[cfg_attr(feature = "serde", serde(default = "default_mu_min"))]
    pub min: f64,
    /// Ceiling: failing at this value terminates the solver
    #[cfg_attr(feature = "serde", serde(default = "default_mu_max"))]
    pub max: f64,
    /// Base scaling factor, > 1
    #[cfg_attr(feature = "serde", serde(default = "default_mu_factor"))]
    pub factor: f64,
}

impl Default for RegularizationOpts {
    fn default() -> Self {
        Self {
            initial: default_mu_initial(),
            min: default_mu_min(),
            max: default_mu_max(),
            factor: default_mu_factor(),
        }
    }
}

impl RegularizationOpts {
    fn validate(&self) -> Result<(), Error> {
        if !(self.min > 0.0) {
            return Err(Error::InvalidRegularization("minimum must be positive"));
        }
        if !(self.max > self.min && self.max.is_finite()) {
            return Err(Error::InvalidRegularization("maximum below minimum"));
        }
        if !(self.initial >= 0.0 && self.initial <= self.max) {
            return Err(Error::InvalidRegularization("initial value out of range"));
        }
        if !(self.factor > 1.0 && self.factor.is_finite()) {
            return Err(Error::InvalidRegularization("factor must be > 1"));
        }
        Ok(())
    }
}

/// Solver settings. They remain constant during a solving process.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// [Algorithm] to deploy
    #[cfg_attr(feature = "serde", serde(default))]
    pub algorithm: Algorithm,
    /// Time horizon [s]
    #[cfg_attr(feature = "serde", serde(default = "default_time_horizon"))]
    pub time_horizon: f64,
    /// Control sampling period [s]
    #[cfg_attr(feature = "serde", serde(default = "default_dt"))]
    pub dt: f64,
    /// Integration step [s]. Adaptive integrators use it as initial step.
    #[cfg_attr(feature = "serde", serde(default = "default_dt_sim"))]
    pub dt_sim: f64,
    /// Integration scheme
    #[cfg_attr(feature = "serde", serde(default))]
    pub integrator: IntegratorType,
    /// Absolute error tolerance of adaptive integrators
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub abs_err_tol: f64,
    /// Relative error tolerance of adaptive integrators
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub rel_err_tol: f64,
    /// Maximal number of iterations
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// Convergence threshold, on the relative cost improvement
    #[cfg_attr(feature = "serde", serde(default = "default_min_cost_improvement"))]
    pub min_cost_improvement: f64,
    /// Number of linearization workers
    #[cfg_attr(feature = "serde", serde(default = "default_nthreads"))]
    pub nthreads: usize,
    /// Weight of the defects (1-norm) in the [Algorithm::GNMS] merit function
    #[cfg_attr(feature = "serde", serde(default = "default_merit_defect_weight"))]
    pub merit_defect_weight: f64,
    /// Line search options
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_search: LineSearchOpts,
    /// Regularization options
    #[cfg_attr(feature = "serde", serde(default))]
    pub regularization: RegularizationOpts,
    /// Detailed (debug) report of each iteration
    #[cfg_attr(feature = "serde", serde(default))]
    pub debug_print: bool,
    /// Detailed (debug) report of each step size attempt
    #[cfg_attr(feature = "serde", serde(default))]
    pub debug_print_line_search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            time_horizon: default_time_horizon(),
            dt: default_dt(),
            dt_sim: default_dt_sim(),
            integrator: IntegratorType::default(),
            abs_err_tol: default_tolerance(),
            rel_err_tol: default_tolerance(),
            max_iterations: default_max_iterations(),
            min_cost_improvement: default_min_cost_improvement(),
            nthreads: default_nthreads(),
            merit_defect_weight: default_merit_defect_weight(),
            line_search: LineSearchOpts::default(),
            regularization: RegularizationOpts::default(),
            debug_print: false,
            debug_print_line_search: false,
        }
    }
}

impl Config {
    /// Returns [Config] preset for [Algorithm::ILQG] over given horizon [s],
    /// sampled at dt [s]. You can then customize [Self] as you will.
    pub fn ilqg_preset(time_horizon: f64, dt: f64) -> Self {
        let mut s = Self::default();
        s.algorithm = Algorithm::ILQG;
        s.time_horizon = time_horizon;
        s.dt = dt;
        s.dt_sim = dt;
        s
    }

    /// Returns [Config] preset for [Algorithm::GNMS] over given horizon [s],
    /// sampled at dt [s]. You can then customize [Self] as you will.
    pub fn gnms_preset(time_horizon: f64, dt: f64) -> Self {
        let mut s = Self::ilqg_preset(time_horizon, dt);
        s.algorithm = Algorithm::GNMS;
        s
    }

    /// Copies and returns [Config] with desired number of workers.
    pub fn with_threads(&self, nthreads: usize) -> Self {
        let mut s = self.clone();
        s.nthreads = nthreads;
        s
    }

    /// Copies and returns [Config] with desired [IntegratorType] and step [s].
    pub fn with_integrator(&self, integrator: IntegratorType, dt_sim: f64) -> Self {
        let mut s = self.clone();
        s.integrator = integrator;
        s.dt_sim = dt_sim;
        s
    }

    /// Copies and returns [Config] with desired [AcceptanceCriterion].
    pub fn with_acceptance(&self, acceptance: AcceptanceCriterion) -> Self {
        let mut s = self.clone();
        s.line_search.acceptance = acceptance;
        s
    }

    /// Copies and returns [Config] with debug reports turned on.
    pub fn with_debug_print(&self, line_search: bool) -> Self {
        let mut s = self.clone();
        s.debug_print = true;
        s.debug_print_line_search = line_search;
        s
    }

    /// Number of control intervals K over the horizon.
    pub fn horizon_steps(&self) -> usize {
        (self.time_horizon / self.dt).round() as usize
    }

    /// Verifies these settings are consistent.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.time_horizon > 0.0 && self.time_horizon.is_finite()) {
            return Err(Error::InvalidTimeHorizon);
        }
        if !(self.dt > 0.0 && self.dt <= self.time_horizon) {
            return Err(Error::InvalidSamplingTime);
        }
        // tolerate rounding on dt_sim = dt
        if !(self.dt_sim > 0.0 && self.dt_sim <= self.dt * (1.0 + 1.0E-9)) {
            return Err(Error::InvalidSimulationStep);
        }
        if !(self.abs_err_tol > 0.0 && self.rel_err_tol > 0.0) {
            return Err(Error::InvalidTolerance);
        }
        if self.nthreads == 0 {
            return Err(Error::NoWorkers);
        }
        if self.max_iterations == 0 {
            return Err(Error::NoIterations);
        }
        if !(self.min_cost_improvement > 0.0) {
            return Err(Error::InvalidCostImprovement);
        }
        if !(self.merit_defect_weight > 0.0 && self.merit_defect_weight.is_finite()) {
            return Err(Error::InvalidMeritWeight);
        }
        self.line_search.validate()?;
        self.regularization.validate()?;
        Ok(())
    }
}
