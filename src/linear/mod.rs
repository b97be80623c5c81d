//! Local linear models of [ControlledSystem](crate::prelude::ControlledSystem)s
use std::sync::Arc;

use nalgebra::{SMatrix, SVector};

use crate::error::Error;

pub mod kinematics;

mod numdiff;
mod rbd;

pub use numdiff::SystemLinearizer;
pub use rbd::RbdLinearizer;

/// Continuous time Jacobians of the dynamics, around one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linearization<const N: usize, const M: usize> {
    /// ∂f/∂x
    pub a: SMatrix<f64, N, N>,
    /// ∂f/∂u
    pub b: SMatrix<f64, N, M>,
}

impl<const N: usize, const M: usize> Linearization<N, M> {
    /// Forward Euler discretization over dt [s]: `(I + dt A, dt B)`.
    pub fn discretize(&self, dt: f64) -> Self {
        Self {
            a: SMatrix::<f64, N, N>::identity() + self.a * dt,
            b: self.b * dt,
        }
    }
}

/// Provides the Jacobians of a [ControlledSystem](crate::prelude::ControlledSystem).
pub trait LinearSystem<const N: usize, const M: usize>: Send {
    /// ∂f/∂x evaluated at (x, u, t)
    fn derivative_state(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<SMatrix<f64, N, N>, Error>;

    /// ∂f/∂u evaluated at (x, u, t)
    fn derivative_control(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<SMatrix<f64, N, M>, Error>;

    /// Both Jacobians at once
    fn linearize(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<Linearization<N, M>, Error> {
        Ok(Linearization {
            a: self.derivative_state(state, control, t)?,
            b: self.derivative_control(state, control, t)?,
        })
    }
}

/// Creates independent [LinearSystem] instances, one per worker.
pub type LinearSystemFactory<const N: usize, const M: usize> =
    Arc<dyn Fn() -> Box<dyn LinearSystem<N, M>> + Send + Sync>;

/// Builds a [LinearSystemFactory] from any constructor.
pub fn linear_system_factory<L, F, const N: usize, const M: usize>(
    build: F,
) -> LinearSystemFactory<N, M>
where
    L: LinearSystem<N, M> + 'static,
    F: Fn() -> L + Send + Sync + 'static,
{
    Arc::new(move || Box::new(build()) as Box<dyn LinearSystem<N, M>>)
}
