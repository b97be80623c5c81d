//! Cost functions and their local quadratic models
use itertools::izip;
use nalgebra::{SMatrix, SVector};

use crate::trajectory::{ControlTrajectory, StateTrajectory};

mod quadratic;
pub use quadratic::QuadraticCost;

/// Second order model of a cost term around one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticModel<const N: usize, const M: usize> {
    /// Cost value
    pub value: f64,
    /// ∂L/∂x
    pub qv: SVector<f64, N>,
    /// ∂²L/∂x²
    pub q: SMatrix<f64, N, N>,
    /// ∂L/∂u
    pub rv: SVector<f64, M>,
    /// ∂²L/∂u²
    pub r: SMatrix<f64, M, M>,
    /// ∂²L/∂u∂x
    pub p: SMatrix<f64, M, N>,
}

impl<const N: usize, const M: usize> QuadraticModel<N, M> {
    /// Model of a cost term that does not depend on the control.
    pub fn terminal(value: f64, qv: SVector<f64, N>, q: SMatrix<f64, N, N>) -> Self {
        Self {
            value,
            qv,
            q,
            rv: SVector::zeros(),
            r: SMatrix::zeros(),
            p: SMatrix::zeros(),
        }
    }

    /// Scales all terms, used to integrate running costs over one interval.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            value: self.value * factor,
            qv: self.qv * factor,
            q: self.q * factor,
            rv: self.rv * factor,
            r: self.r * factor,
            p: self.p * factor,
        }
    }
}

/// Optimal control cost: `J = Σ dt L(x_k, u_k, t_k) + Φ(x_K, t_K)`.
pub trait CostFunction<const N: usize, const M: usize>: Send + Sync {
    /// Running cost L(x, u, t)
    fn intermediate_cost(&self, state: &SVector<f64, N>, control: &SVector<f64, M>, t: f64) -> f64;

    /// Terminal cost Φ(x, t)
    fn terminal_cost(&self, state: &SVector<f64, N>, t: f64) -> f64;

    /// [QuadraticModel] of the running cost
    fn intermediate_model(
        &self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> QuadraticModel<N, M>;

    /// [QuadraticModel] of the terminal cost. Control terms are null.
    fn terminal_model(&self, state: &SVector<f64, N>, t: f64) -> QuadraticModel<N, M>;

    /// [QuadraticModel] at (x, u, t), the terminal flag selecting the cost term.
    fn quadratic_model(
        &self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
        terminal: bool,
    ) -> QuadraticModel<N, M> {
        if terminal {
            self.terminal_model(state, t)
        } else {
            self.intermediate_model(state, control, t)
        }
    }
}

/// Total cost of a trajectory, running cost being integrated over dt [s].
pub fn trajectory_cost<C, const N: usize, const M: usize>(
    cost: &C,
    states: &StateTrajectory<N>,
    controls: &ControlTrajectory<M>,
    dt: f64,
) -> f64
where
    C: CostFunction<N, M> + ?Sized,
{
    let running = izip!(states.iter(), controls.iter(), controls.times())
        .map(|(x, u, t)| cost.intermediate_cost(x, u, *t) * dt)
        .sum::<f64>();

    let terminal = match (states.back(), states.times().last()) {
        (Some(x), Some(t)) => cost.terminal_cost(x, *t),
        _ => 0.0,
    };

    running + terminal
}
