//! Controlled dynamical systems
use std::sync::Arc;

use nalgebra::{DMatrix, DVector, SVector};

mod oscillator;
pub use oscillator::SecondOrderSystem;

/// Structure of the dynamics, exploited by the linearizers.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemType {
    /// No particular structure
    #[default]
    General,
    /// State is made of positions (first half) and velocities (second half),
    /// the derivative of the position being the velocity.
    SecondOrder,
}

/// Continuous time controlled system `dx/dt = f(x, t, u)`,
/// with N states and M controls.
pub trait ControlledSystem<const N: usize, const M: usize>: Send {
    /// Evaluates the state derivative.
    fn compute_dynamics(
        &mut self,
        state: &SVector<f64, N>,
        t: f64,
        control: &SVector<f64, M>,
    ) -> SVector<f64, N>;

    /// [SystemType] of these dynamics.
    fn system_type(&self) -> SystemType {
        SystemType::General
    }
}

impl<const N: usize, const M: usize> ControlledSystem<N, M> for Box<dyn ControlledSystem<N, M>> {
    fn compute_dynamics(
        &mut self,
        state: &SVector<f64, N>,
        t: f64,
        control: &SVector<f64, M>,
    ) -> SVector<f64, N> {
        self.as_mut().compute_dynamics(state, t, control)
    }

    fn system_type(&self) -> SystemType {
        self.as_ref().system_type()
    }
}

/// Creates independent [ControlledSystem] instances, one per worker.
pub type SystemFactory<const N: usize, const M: usize> =
    Arc<dyn Fn() -> Box<dyn ControlledSystem<N, M>> + Send + Sync>;

/// Builds a [SystemFactory] from any constructor.
pub fn system_factory<S, F, const N: usize, const M: usize>(build: F) -> SystemFactory<N, M>
where
    S: ControlledSystem<N, M> + 'static,
    F: Fn() -> S + Send + Sync + 'static,
{
    Arc::new(move || Box::new(build()) as Box<dyn ControlledSystem<N, M>>)
}

/// Articulated rigid body dynamics, in generalized coordinates.
///
/// State layout is `[q, qd]` where `q` stacks (for floating bases) the base
/// orientation (Euler XYZ), the base position and the joint positions, and
/// `qd` stacks the base angular velocity and linear velocity (both expressed
/// in the base frame) and the joint velocities. Controls are joint torques.
pub trait RigidBodySystem<const N: usize, const M: usize>: ControlledSystem<N, M> {
    /// True when the base is free floating (6 unactuated DOF).
    fn floating_base(&self) -> bool;

    /// Number of actuated joints.
    fn joints(&self) -> usize;

    /// Joint space inertia matrix M(q), symmetric positive definite,
    /// of dimension N/2. Receives the generalized positions `q`.
    fn mass_matrix(&self, positions: &DVector<f64>) -> DMatrix<f64>;

    /// Actuator selection matrix S (M x N/2): generalized forces are `S^T u`.
    fn selection_matrix(&self) -> DMatrix<f64> {
        let dofs = N / 2;
        DMatrix::from_fn(M, dofs, |i, j| if j == dofs - M + i { 1.0 } else { 0.0 })
    }
}
