#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod cfg;
mod constants;
mod cost;
mod error;
mod integrator;
mod linear;
mod policy;
mod solver;
mod system;
mod trajectory;
mod utils;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::{
        AcceptanceCriterion, Algorithm, Config, Error as ConfigError, IntegratorType,
        LineSearchOpts, RegularizationOpts,
    };
    pub use crate::cost::{trajectory_cost, CostFunction, QuadraticCost, QuadraticModel};
    pub use crate::error::Error;
    pub use crate::integrator::Integrator;
    pub use crate::linear::{
        kinematics, linear_system_factory, LinearSystem, LinearSystemFactory, Linearization,
        RbdLinearizer, SystemLinearizer,
    };
    pub use crate::policy::Policy;
    pub use crate::solver::{OptConProblem, Rollout, Solver, SolverState};
    pub use crate::system::{
        system_factory, ControlledSystem, RigidBodySystem, SecondOrderSystem, SystemFactory,
        SystemType,
    };
    pub use crate::trajectory::{ControlTrajectory, DiscreteTrajectory, StateTrajectory};
    // re-export
    pub use nalgebra::{DMatrix, DVector, SMatrix, SVector};
}

// pub export
pub use error::Error;
