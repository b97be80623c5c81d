use nalgebra::SVector;

use crate::{
    error::Error,
    integrator::Integrator,
    policy::Policy,
    system::ControlledSystem,
    trajectory::{ControlTrajectory, StateTrajectory},
};

/// Forward simulation of a [ControlledSystem] over K intervals of dt,
/// the control being held constant over each interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rollout {
    integrator: Integrator,
    dt: f64,
    horizon: usize,
}

impl Rollout {
    /// Builds a new [Rollout] of K = `horizon` intervals, starting at t=0.
    pub fn new(integrator: Integrator, dt: f64, horizon: usize) -> Self {
        Self {
            integrator,
            dt,
            horizon,
        }
    }

    /// Number of intervals
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Sampling period [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Instant of the k-th sample [s]
    pub fn time(&self, k: usize) -> f64 {
        k as f64 * self.dt
    }

    /// Simulates the system driven by `law(k, x_k)`.
    /// Returns the K+1 states and the K applied controls.
    pub fn run<S, F, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        x0: &SVector<f64, N>,
        mut law: F,
    ) -> Result<(StateTrajectory<N>, ControlTrajectory<M>), Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
        F: FnMut(usize, &SVector<f64, N>) -> SVector<f64, M>,
    {
        let mut states = Vec::with_capacity(self.horizon + 1);
        let mut controls = Vec::with_capacity(self.horizon);

        let mut x = *x0;
        states.push(x);

        for k in 0..self.horizon {
            let u = law(k, &x);
            x = self.shoot(system, &x, k, &u)?;
            states.push(x);
            controls.push(u);
        }

        Ok((
            StateTrajectory::uniform(0.0, self.dt, states),
            ControlTrajectory::uniform(0.0, self.dt, controls),
        ))
    }

    /// Open loop simulation, replaying K controls.
    pub fn open_loop<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        x0: &SVector<f64, N>,
        controls: &[SVector<f64, M>],
    ) -> Result<StateTrajectory<N>, Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        if controls.len() != self.horizon {
            return Err(Error::DimensionMismatch {
                expected: self.horizon,
                got: controls.len(),
            });
        }
        let (states, _) = self.run(system, x0, |k, _| controls[k])?;
        Ok(states)
    }

    /// Closed loop simulation of the system controlled by [Policy].
    pub fn closed_loop<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        x0: &SVector<f64, N>,
        policy: &Policy<N, M>,
    ) -> Result<(StateTrajectory<N>, ControlTrajectory<M>), Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        if policy.len() != self.horizon {
            return Err(Error::DimensionMismatch {
                expected: self.horizon,
                got: policy.len(),
            });
        }
        self.run(system, x0, |k, x| policy.control(k, x))
    }

    /// Integrates a single interval: from x at t_k, holding u.
    pub fn shoot<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        x: &SVector<f64, N>,
        k: usize,
        u: &SVector<f64, M>,
    ) -> Result<SVector<f64, N>, Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        self.integrator
            .integrate(system, x, self.time(k), self.dt, u)
    }
}
