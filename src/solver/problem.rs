use std::sync::Arc;

use nalgebra::SVector;

use crate::{
    cost::CostFunction,
    linear::{LinearSystem, LinearSystemFactory, SystemLinearizer},
    system::{ControlledSystem, SystemFactory},
};

/// Optimal control problem definition: what is controlled (dynamics and
/// their linearization), from where, and how performance is measured.
/// The horizon is part of the solver [Config](crate::prelude::Config).
#[derive(Clone)]
pub struct OptConProblem<const N: usize, const M: usize> {
    /// x0
    initial_state: SVector<f64, N>,
    /// Nonlinear dynamics
    system: SystemFactory<N, M>,
    /// Linearized dynamics
    linear_system: LinearSystemFactory<N, M>,
    /// Running and terminal costs
    cost: Arc<dyn CostFunction<N, M>>,
}

impl<const N: usize, const M: usize> OptConProblem<N, M> {
    /// Defines a new [OptConProblem].
    pub fn new(
        initial_state: SVector<f64, N>,
        system: SystemFactory<N, M>,
        linear_system: LinearSystemFactory<N, M>,
        cost: Arc<dyn CostFunction<N, M>>,
    ) -> Self {
        Self {
            initial_state,
            system,
            linear_system,
            cost,
        }
    }

    /// Defines a new [OptConProblem] linearized by double sided
    /// numerical differentiation of the dynamics.
    pub fn with_numdiff(
        initial_state: SVector<f64, N>,
        system: SystemFactory<N, M>,
        cost: Arc<dyn CostFunction<N, M>>,
    ) -> Self {
        let factory = system.clone();
        let linear_system: LinearSystemFactory<N, M> = Arc::new(move || {
            Box::new(SystemLinearizer::new(factory(), true)) as Box<dyn LinearSystem<N, M>>
        });
        Self::new(initial_state, system, linear_system, cost)
    }

    /// Initial state
    pub fn initial_state(&self) -> &SVector<f64, N> {
        &self.initial_state
    }

    /// New dynamics instance
    pub fn system(&self) -> Box<dyn ControlledSystem<N, M>> {
        (self.system)()
    }

    /// New linear system instance
    pub fn linear_system(&self) -> Box<dyn LinearSystem<N, M>> {
        (self.linear_system)()
    }

    /// Shared cost function
    pub fn cost(&self) -> Arc<dyn CostFunction<N, M>> {
        Arc::clone(&self.cost)
    }
}
