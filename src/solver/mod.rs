//! Iterative optimal control solvers
use std::sync::Arc;

use log::{debug, error, info, warn};
use nalgebra::SMatrix;

mod approximation;
mod backward;
mod linesearch;
mod problem;
mod regularization;
mod rollout;

pub use problem::OptConProblem;
pub use rollout::Rollout;

use approximation::Approximator;
use backward::backward_pass;
use linesearch::{Candidate, LineSearch};
use regularization::Regularization;

use crate::{
    cfg::{Algorithm, Config},
    cost::{trajectory_cost, CostFunction},
    error::Error,
    integrator::Integrator,
    policy::Policy,
    system::ControlledSystem,
    trajectory::{ControlTrajectory, StateTrajectory},
};

/// [Solver] life cycle
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Deployed, waiting for an initial guess
    #[default]
    Configuring,
    /// Iterations may improve the current solution
    Iterating,
    /// Optimum (or iteration budget) reached
    Converged,
    /// Unrecoverable iteration failure
    Failed,
}

impl std::fmt::Display for SolverState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Configuring => write!(f, "configuring"),
            Self::Iterating => write!(f, "iterating"),
            Self::Converged => write!(f, "converged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Current (nominal) solution
#[derive(Debug, Clone, PartialEq)]
struct Nominal<const N: usize, const M: usize> {
    states: StateTrajectory<N>,
    controls: ControlTrajectory<M>,
    cost: f64,
    merit: f64,
}

impl<const N: usize, const M: usize> From<Candidate<N, M>> for Nominal<N, M> {
    fn from(candidate: Candidate<N, M>) -> Self {
        Self {
            states: candidate.states,
            controls: candidate.controls,
            cost: candidate.cost,
            merit: candidate.merit,
        }
    }
}

/// [Solver] iteratively improves a control [Policy], with either
/// [Algorithm::ILQG] (single shooting) or [Algorithm::GNMS] (multiple shooting).
///
/// Each iteration linearizes the dynamics and approximates the cost around
/// the nominal trajectory (on the worker pool), solves the resulting LQ
/// problem by Riccati recursion and searches for a better trajectory along
/// the obtained update.
pub struct Solver<const N: usize, const M: usize> {
    /// Solver parametrization
    cfg: Config,
    /// Problem definition
    problem: OptConProblem<N, M>,
    /// [SolverState]
    state: SolverState,
    /// Forward simulation
    rollout: Rollout,
    /// LQ approximation workers
    approximator: Approximator<N, M>,
    /// Dynamics instance dedicated to the forward pass
    system: Box<dyn ControlledSystem<N, M>>,
    /// Shared cost function
    cost: Arc<dyn CostFunction<N, M>>,
    /// Hessian regularization
    regularization: Regularization,
    /// Current solution
    nominal: Option<Nominal<N, M>>,
    /// Feedback gains of the last backward pass
    gains: Option<Vec<SMatrix<f64, M, N>>>,
    /// Number of iterations performed
    iterations: usize,
}

impl<const N: usize, const M: usize> Solver<N, M> {
    /// Deploys a new [Solver] for this [OptConProblem].
    /// ## Inputs
    /// - problem: [OptConProblem] definition
    /// - cfg: solver [Config], verified here: malformed settings are fatal.
    pub fn new(problem: OptConProblem<N, M>, cfg: &Config) -> Result<Self, Error> {
        cfg.validate().map_err(Error::Configuration)?;

        let rollout = Self::rollout(cfg);
        let approximator = Approximator::new(&problem, rollout, cfg.nthreads)?;

        info!(
            "{} solver deployed - horizon={}s ({} steps) workers={}",
            cfg.algorithm,
            cfg.time_horizon,
            rollout.horizon(),
            approximator.workers()
        );

        Ok(Self {
            rollout,
            approximator,
            system: problem.system(),
            cost: problem.cost(),
            regularization: Regularization::new(cfg.regularization),
            cfg: cfg.clone(),
            problem,
            state: SolverState::Configuring,
            nominal: None,
            gains: None,
            iterations: 0,
        })
    }

    fn rollout(cfg: &Config) -> Rollout {
        Rollout::new(Integrator::from_config(cfg), cfg.dt, cfg.horizon_steps())
    }

    /// Applies new settings. This redeploys the workers and drops the current
    /// solution: a new initial guess is then required.
    pub fn configure(&mut self, cfg: &Config) -> Result<(), Error> {
        cfg.validate().map_err(Error::Configuration)?;

        let rollout = Self::rollout(cfg);
        self.approximator = Approximator::new(&self.problem, rollout, cfg.nthreads)?;
        self.rollout = rollout;
        self.system = self.problem.system();
        self.regularization = Regularization::new(cfg.regularization);
        self.cfg = cfg.clone();
        self.state = SolverState::Configuring;
        self.nominal = None;
        self.gains = None;
        self.iterations = 0;

        debug!(
            "{} solver reconfigured - {} steps",
            self.cfg.algorithm,
            self.rollout.horizon()
        );
        Ok(())
    }

    /// Initializes the iterations from this [Policy].
    /// [Algorithm::ILQG] simulates the policy in closed loop, while
    /// [Algorithm::GNMS] uses its reference states as initial shooting nodes
    /// (the first node being replaced by the initial state) and its
    /// feedforward terms as initial controls.
    pub fn set_initial_guess(&mut self, policy: &Policy<N, M>) -> Result<(), Error> {
        let horizon = self.rollout.horizon();
        if policy.len() != horizon {
            return Err(Error::DimensionMismatch {
                expected: horizon,
                got: policy.len(),
            });
        }

        let x0 = *self.problem.initial_state();
        let dt = self.rollout.dt();

        let nominal = match self.cfg.algorithm {
            Algorithm::ILQG => {
                let (states, controls) =
                    self.rollout.closed_loop(self.system.as_mut(), &x0, policy)?;
                let cost = trajectory_cost(&*self.cost, &states, &controls, dt);
                Nominal {
                    states,
                    controls,
                    cost,
                    merit: cost,
                }
            },
            Algorithm::GNMS => {
                let mut nodes = policy.reference_states().to_vec();
                nodes[0] = x0;

                let mut defects = 0.0;
                for (k, u) in policy.feedforward_controls().iter().enumerate() {
                    let x_next = self.rollout.shoot(self.system.as_mut(), &nodes[k], k, u)?;
                    defects += (x_next - nodes[k + 1]).lp_norm(1);
                }

                let states = StateTrajectory::uniform(0.0, dt, nodes);
                let controls =
                    ControlTrajectory::uniform(0.0, dt, policy.feedforward_controls().to_vec());

                let cost = trajectory_cost(&*self.cost, &states, &controls, dt);
                Nominal {
                    states,
                    controls,
                    cost,
                    merit: cost + self.cfg.merit_defect_weight * defects,
                }
            },
        };

        info!(
            "{} initial guess - cost={:.6e} merit={:.6e}",
            self.cfg.algorithm, nominal.cost, nominal.merit
        );

        self.nominal = Some(nominal);
        self.gains = None;
        self.iterations = 0;
        self.regularization = Regularization::new(self.cfg.regularization);
        self.state = SolverState::Iterating;
        Ok(())
    }

    /// Runs one iteration.
    /// Returns true when a better solution was found, false when none was
    /// found (regularization is then raised for the next attempt) or when
    /// the iterations are over. Errors are fatal: the [Solver] then
    /// enters [SolverState::Failed].
    pub fn run_iteration(&mut self) -> Result<bool, Error> {
        if self.nominal.is_none() {
            return Err(Error::MissingInitialGuess);
        }
        if self.state != SolverState::Iterating {
            return Ok(false);
        }
        match self.iterate() {
            Ok(improved) => Ok(improved),
            Err(e) => {
                error!("{} iteration #{} failed: {}", self.cfg.algorithm, self.iterations, e);
                self.state = SolverState::Failed;
                Err(e)
            },
        }
    }

    fn iterate(&mut self) -> Result<bool, Error> {
        let Some(nominal) = &self.nominal else {
            return Err(Error::MissingInitialGuess);
        };

        let multiple_shooting = self.cfg.algorithm == Algorithm::GNMS;

        let lq = self
            .approximator
            .approximate(&nominal.states, &nominal.controls, multiple_shooting)?;

        if self.cfg.debug_print && multiple_shooting {
            debug!("defects |d|_1={:.6e}", lq.defects_norm());
        }

        let gains = loop {
            match backward_pass(&lq, self.regularization.mu()) {
                Ok(gains) => break gains,
                Err(Error::IndefiniteHessian(k)) => {
                    if self.cfg.debug_print {
                        debug!(
                            "backward pass - indefinite hessian at stage {} (mu={:.3e})",
                            k,
                            self.regularization.mu()
                        );
                    }
                    if !self.regularization.increase() {
                        return Err(Error::IndefiniteHessian(k));
                    }
                },
                Err(e) => return Err(e),
            }
        };

        let expected = gains.expected_change(1.0);

        if self.cfg.debug_print {
            debug!(
                "backward pass - mu={:.3e} expected change={:.6e}",
                self.regularization.mu(),
                expected
            );
        }

        let mut search = LineSearch {
            opts: &self.cfg.line_search,
            rollout: &self.rollout,
            system: self.system.as_mut(),
            cost: self.cost.as_ref(),
            verbose: self.cfg.debug_print_line_search,
        };

        let candidate = match self.cfg.algorithm {
            Algorithm::ILQG => {
                search.search_ilqg(&nominal.states, &nominal.controls, &gains, nominal.merit)?
            },
            Algorithm::GNMS => search.search_gnms(
                &nominal.states,
                &nominal.controls,
                &lq,
                &gains,
                self.cfg.merit_defect_weight,
                nominal.merit,
            )?,
        };

        self.iterations += 1;

        let previous = nominal.merit;
        let scale = previous.abs().max(1.0);

        let improved = match candidate {
            Some(candidate) => {
                let relative = (previous - candidate.merit) / scale;

                info!(
                    "{} iteration #{} - cost={:.6e} merit={:.6e} alpha={:.3e} mu={:.3e}",
                    self.cfg.algorithm,
                    self.iterations,
                    candidate.cost,
                    candidate.merit,
                    candidate.alpha,
                    self.regularization.mu()
                );

                self.regularization.decrease();
                self.nominal = Some(candidate.into());
                self.gains = Some(gains.feedback);

                if relative < self.cfg.min_cost_improvement {
                    info!(
                        "{} converged after {} iteration(s)",
                        self.cfg.algorithm, self.iterations
                    );
                    self.state = SolverState::Converged;
                }
                true
            },
            None => {
                self.gains = Some(gains.feedback);

                // predicted decrease without regularization,
                // None when the unregularized hessian is indefinite
                let predicted = if self.regularization.mu() > 0.0 {
                    backward_pass(&lq, 0.0).map(|g| g.expected_change(1.0)).ok()
                } else {
                    Some(expected)
                };

                if predicted.is_some_and(|p| -p <= self.cfg.min_cost_improvement * scale) {
                    info!(
                        "{} converged after {} iteration(s): negligible predicted decrease",
                        self.cfg.algorithm, self.iterations
                    );
                    self.state = SolverState::Converged;
                    return Ok(false);
                }

                if !self.regularization.increase() {
                    return Err(Error::NoImprovementFound);
                }

                debug!(
                    "{} iteration #{} - no better solution found (mu={:.3e})",
                    self.cfg.algorithm,
                    self.iterations,
                    self.regularization.mu()
                );
                false
            },
        };

        if self.state == SolverState::Iterating && self.iterations >= self.cfg.max_iterations {
            warn!(
                "{} reached maximal number of iterations ({})",
                self.cfg.algorithm, self.cfg.max_iterations
            );
            self.state = SolverState::Converged;
        }

        Ok(improved)
    }

    /// Iterates until convergence (or failure) and returns the final [SolverState].
    pub fn solve(&mut self) -> Result<SolverState, Error> {
        if self.nominal.is_none() {
            return Err(Error::MissingInitialGuess);
        }
        while self.state == SolverState::Iterating {
            self.run_iteration()?;
        }
        Ok(self.state)
    }

    /// Current state trajectory (K+1 samples)
    pub fn state_trajectory(&self) -> Option<&StateTrajectory<N>> {
        self.nominal.as_ref().map(|nominal| &nominal.states)
    }

    /// Current control trajectory (K samples)
    pub fn control_trajectory(&self) -> Option<&ControlTrajectory<M>> {
        self.nominal.as_ref().map(|nominal| &nominal.controls)
    }

    /// Current solution as a feedback [Policy]: nominal controls as feedforward,
    /// gains of the last backward pass, nominal states as reference.
    pub fn solution(&self) -> Result<Policy<N, M>, Error> {
        let nominal = self.nominal.as_ref().ok_or(Error::MissingInitialGuess)?;

        let gains = match &self.gains {
            Some(gains) => gains.clone(),
            None => vec![SMatrix::zeros(); nominal.controls.len()],
        };

        Policy::new(
            nominal.controls.values().to_vec(),
            gains,
            nominal.states.values().to_vec(),
            self.rollout.dt(),
        )
    }

    /// Current cost
    pub fn cost(&self) -> Option<f64> {
        self.nominal.as_ref().map(|nominal| nominal.cost)
    }

    /// Current merit: cost penalized by the defects
    pub fn merit(&self) -> Option<f64> {
        self.nominal.as_ref().map(|nominal| nominal.merit)
    }

    /// Number of iterations performed since the initial guess
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Current [SolverState]
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Current [Config]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// [OptConProblem] being solved
    pub fn problem(&self) -> &OptConProblem<N, M> {
        &self.problem
    }

    /// Current hessian regularization
    pub fn regularization(&self) -> f64 {
        self.regularization.mu()
    }
}
