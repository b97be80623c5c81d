use itertools::izip;
use log::{debug, warn};
use nalgebra::SVector;

use crate::{
    cfg::{AcceptanceCriterion, LineSearchOpts},
    cost::{trajectory_cost, CostFunction},
    error::Error,
    solver::{approximation::LqProblem, backward::Gains, rollout::Rollout},
    system::ControlledSystem,
    trajectory::{ControlTrajectory, StateTrajectory},
};

/// Trajectory proposed for a given step size
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate<const N: usize, const M: usize> {
    pub states: StateTrajectory<N>,
    pub controls: ControlTrajectory<M>,
    /// Step size
    pub alpha: f64,
    /// Total cost
    pub cost: f64,
    /// Cost penalized by the defects (equals the cost for dynamically consistent trajectories)
    pub merit: f64,
}

/// Candidate evaluation context, shared by single and multiple shooting.
pub(crate) struct LineSearch<'a, S: ?Sized, const N: usize, const M: usize> {
    pub opts: &'a LineSearchOpts,
    pub rollout: &'a Rollout,
    pub system: &'a mut S,
    pub cost: &'a dyn CostFunction<N, M>,
    pub verbose: bool,
}

/// Acceptance test of a candidate merit, given the previous merit
/// and the change predicted by the LQ model.
pub(crate) fn accept(opts: &LineSearchOpts, previous: f64, candidate: f64, expected: f64) -> bool {
    if !(candidate < previous) {
        return false;
    }
    match opts.acceptance {
        AcceptanceCriterion::SimpleImprovement => true,
        AcceptanceCriterion::Armijo => {
            candidate <= previous + opts.armijo_parameter * expected.min(0.0)
        },
    }
}

/// Multiple shooting linear update, from the nominal nodes:
/// `δx_0 = 0`, `δu_k = l_k + K_k δx_k`, `δx_k+1 = A_k δx_k + B_k δu_k + d_k`.
pub(crate) fn gnms_update<const N: usize, const M: usize>(
    lq: &LqProblem<N, M>,
    gains: &Gains<N, M>,
) -> (Vec<SVector<f64, N>>, Vec<SVector<f64, M>>) {
    let horizon = lq.stages.len();
    let mut dx = Vec::with_capacity(horizon + 1);
    let mut du = Vec::with_capacity(horizon);

    let mut delta_x = SVector::<f64, N>::zeros();
    dx.push(delta_x);

    for (stage, gain, ff) in izip!(&lq.stages, &gains.feedback, &gains.feedforward) {
        let delta_u = ff + gain * delta_x;
        delta_x = stage.a * delta_x + stage.b * delta_u + stage.defect;
        du.push(delta_u);
        dx.push(delta_x);
    }

    (dx, du)
}

impl<'a, S, const N: usize, const M: usize> LineSearch<'a, S, N, M>
where
    S: ControlledSystem<N, M> + ?Sized,
{
    /// Closed loop candidate: `u_k = u_nom_k + α l_k + K_k (x_k - x_nom_k)`.
    pub fn ilqg_candidate(
        &mut self,
        nominal_states: &StateTrajectory<N>,
        nominal_controls: &ControlTrajectory<M>,
        gains: &Gains<N, M>,
        alpha: f64,
    ) -> Result<Candidate<N, M>, Error> {
        let x0 = nominal_states[0];

        let (states, controls) = self.rollout.run(&mut *self.system, &x0, |k, x| {
            nominal_controls[k]
                + gains.feedforward[k] * alpha
                + gains.feedback[k] * (x - nominal_states[k])
        })?;

        let cost = trajectory_cost(self.cost, &states, &controls, self.rollout.dt());

        Ok(Candidate {
            states,
            controls,
            alpha,
            cost,
            merit: cost,
        })
    }

    /// Backtracking over step sizes, single shooting.
    /// Returns the first accepted [Candidate], None if all step sizes were rejected.
    pub fn search_ilqg(
        &mut self,
        nominal_states: &StateTrajectory<N>,
        nominal_controls: &ControlTrajectory<M>,
        gains: &Gains<N, M>,
        previous: f64,
    ) -> Result<Option<Candidate<N, M>>, Error> {
        for alpha in self.opts.step_sizes() {
            match self.ilqg_candidate(nominal_states, nominal_controls, gains, alpha) {
                Ok(candidate) => {
                    if self.verbose {
                        debug!(
                            "line search - alpha={:.4e} cost={:.6e} (previous={:.6e})",
                            alpha, candidate.cost, previous
                        );
                    }
                    if accept(self.opts, previous, candidate.merit, gains.expected_change(alpha)) {
                        return Ok(Some(candidate));
                    }
                },
                Err(Error::NumericalDivergence(t)) => {
                    warn!("line search - alpha={:.4e}: rollout diverged at t={:.4}s", alpha, t);
                },
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Multiple shooting candidate: nodes and controls moved by α along the
    /// linear update, merit = cost + weight * Σ |d_k|₁ (defects re-evaluated).
    pub fn gnms_candidate(
        &mut self,
        nominal_states: &StateTrajectory<N>,
        nominal_controls: &ControlTrajectory<M>,
        update: &(Vec<SVector<f64, N>>, Vec<SVector<f64, M>>),
        defect_weight: f64,
        alpha: f64,
    ) -> Result<Candidate<N, M>, Error> {
        let (dx, du) = update;

        let states = izip!(nominal_states.iter(), dx)
            .map(|(x, dx)| x + dx * alpha)
            .collect::<Vec<_>>();

        let controls = izip!(nominal_controls.iter(), du)
            .map(|(u, du)| u + du * alpha)
            .collect::<Vec<_>>();

        let mut defects = 0.0;
        for (k, u) in controls.iter().enumerate() {
            let x_next = self.rollout.shoot(&mut *self.system, &states[k], k, u)?;
            defects += (x_next - states[k + 1]).lp_norm(1);
        }

        let states = StateTrajectory::new(nominal_states.times().to_vec(), states)?;
        let controls = ControlTrajectory::new(nominal_controls.times().to_vec(), controls)?;

        let cost = trajectory_cost(self.cost, &states, &controls, self.rollout.dt());

        Ok(Candidate {
            states,
            controls,
            alpha,
            cost,
            merit: cost + defect_weight * defects,
        })
    }

    /// Backtracking over step sizes, multiple shooting.
    pub fn search_gnms(
        &mut self,
        nominal_states: &StateTrajectory<N>,
        nominal_controls: &ControlTrajectory<M>,
        lq: &LqProblem<N, M>,
        gains: &Gains<N, M>,
        defect_weight: f64,
        previous: f64,
    ) -> Result<Option<Candidate<N, M>>, Error> {
        let update = gnms_update(lq, gains);

        for alpha in self.opts.step_sizes() {
            let candidate = self.gnms_candidate(
                nominal_states,
                nominal_controls,
                &update,
                defect_weight,
                alpha,
            );
            match candidate {
                Ok(candidate) => {
                    if self.verbose {
                        debug!(
                            "line search - alpha={:.4e} cost={:.6e} merit={:.6e} (previous={:.6e})",
                            alpha, candidate.cost, candidate.merit, previous
                        );
                    }
                    if accept(self.opts, previous, candidate.merit, gains.expected_change(alpha)) {
                        return Ok(Some(candidate));
                    }
                },
                Err(Error::NumericalDivergence(t)) => {
                    warn!("line search - alpha={:.4e}: shot diverged at t={:.4}s", alpha, t);
                },
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
