use std::sync::Arc;

use log::debug;
use nalgebra::{SMatrix, SVector};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
    cost::{CostFunction, QuadraticModel},
    error::Error,
    linear::LinearSystem,
    solver::{problem::OptConProblem, rollout::Rollout},
    system::ControlledSystem,
    trajectory::{ControlTrajectory, StateTrajectory},
};

/// LQ approximation of one interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Stage<const N: usize, const M: usize> {
    /// Discrete ∂f/∂x
    pub a: SMatrix<f64, N, N>,
    /// Discrete ∂f/∂u
    pub b: SMatrix<f64, N, M>,
    /// Running cost model, integrated over the interval
    pub cost: QuadraticModel<N, M>,
    /// Gap between the integrated node and the next node
    pub defect: SVector<f64, N>,
}

impl<const N: usize, const M: usize> Stage<N, M> {
    fn zeros() -> Self {
        Self {
            a: SMatrix::zeros(),
            b: SMatrix::zeros(),
            cost: QuadraticModel::terminal(0.0, SVector::zeros(), SMatrix::zeros()),
            defect: SVector::zeros(),
        }
    }
}

/// LQ approximation of the optimal control problem around a nominal trajectory
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LqProblem<const N: usize, const M: usize> {
    pub stages: Vec<Stage<N, M>>,
    pub terminal: QuadraticModel<N, M>,
}

impl<const N: usize, const M: usize> LqProblem<N, M> {
    /// Sum of the defects 1-norm
    pub fn defects_norm(&self) -> f64 {
        self.stages.iter().map(|stage| stage.defect.lp_norm(1)).sum()
    }
}

/// Worker owned instances
struct Worker<const N: usize, const M: usize> {
    linear: Box<dyn LinearSystem<N, M>>,
    system: Box<dyn ControlledSystem<N, M>>,
}

impl<const N: usize, const M: usize> Worker<N, M> {
    fn stage(
        &mut self,
        k: usize,
        states: &StateTrajectory<N>,
        controls: &ControlTrajectory<M>,
        cost: &dyn CostFunction<N, M>,
        rollout: &Rollout,
        defects: bool,
    ) -> Result<Stage<N, M>, Error> {
        let (x, u, t) = (&states[k], &controls[k], controls.time(k));
        let dt = rollout.dt();

        let linearization = self.linear.linearize(x, u, t)?.discretize(dt);

        let defect = if defects {
            rollout.shoot(self.system.as_mut(), x, k, u)? - states[k + 1]
        } else {
            SVector::zeros()
        };

        Ok(Stage {
            a: linearization.a,
            b: linearization.b,
            cost: cost.intermediate_model(x, u, t).scaled(dt),
            defect,
        })
    }
}

/// Evaluates [LqProblem]s on a static pool of workers.
/// Each worker owns its [LinearSystem] and [ControlledSystem] instances
/// and processes a contiguous chunk of the horizon.
pub(crate) struct Approximator<const N: usize, const M: usize> {
    pool: ThreadPool,
    workers: Vec<Worker<N, M>>,
    cost: Arc<dyn CostFunction<N, M>>,
    rollout: Rollout,
}

impl<const N: usize, const M: usize> Approximator<N, M> {
    /// Deploys `nthreads` workers.
    pub fn new(
        problem: &OptConProblem<N, M>,
        rollout: Rollout,
        nthreads: usize,
    ) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(nthreads)
            .thread_name(|i| format!("optcon-lq-{}", i))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        let workers = (0..nthreads)
            .map(|_| Worker {
                linear: problem.linear_system(),
                system: problem.system(),
            })
            .collect();

        debug!("deployed {} linearization worker(s)", nthreads);

        Ok(Self {
            pool,
            workers,
            cost: problem.cost(),
            rollout,
        })
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Approximates the problem around (states, controls).
    /// Defects are only evaluated when requested (multiple shooting).
    pub fn approximate(
        &mut self,
        states: &StateTrajectory<N>,
        controls: &ControlTrajectory<M>,
        defects: bool,
    ) -> Result<LqProblem<N, M>, Error> {
        let horizon = controls.len();
        let chunk = horizon.div_ceil(self.workers.len()).max(1);

        let mut stages = vec![Stage::zeros(); horizon];

        let Self {
            pool,
            workers,
            cost,
            rollout,
        } = self;

        let cost: &dyn CostFunction<N, M> = cost.as_ref();
        let rollout = *rollout;

        pool.install(|| {
            workers
                .par_iter_mut()
                .zip(stages.par_chunks_mut(chunk))
                .enumerate()
                .try_for_each(|(i, (worker, output))| {
                    for (j, stage) in output.iter_mut().enumerate() {
                        *stage =
                            worker.stage(i * chunk + j, states, controls, cost, &rollout, defects)?;
                    }
                    Ok::<(), Error>(())
                })
        })?;

        let (x_final, t_final) = (&states[horizon], states.time(horizon));

        Ok(LqProblem {
            stages,
            terminal: cost.terminal_model(x_final, t_final),
        })
    }
}
