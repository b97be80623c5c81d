use thiserror::Error;

use crate::cfg::Error as ConfigError;

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// Malformed [Config](crate::prelude::Config): fatal, returned when configuring.
    #[error("invalid configuration: {0}")]
    Configuration(ConfigError),

    /// Trajectory, policy or rigid body dimensions do not agree.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Integration produced a non finite state (or the adaptive
    /// step size collapsed) at given instant [s].
    #[error("numerical divergence at t={0:.6}s")]
    NumericalDivergence(f64),

    /// Quu could not be made positive definite at given
    /// stage, even with maximal regularization.
    #[error("indefinite hessian at stage {0}")]
    IndefiniteHessian(usize),

    /// Line search exhausted while regularization is saturated.
    #[error("no improvement found")]
    NoImprovementFound,

    /// Cholesky factorization of the joint space inertia matrix failed.
    #[error("mass matrix is not positive definite")]
    MassMatrixNotPositiveDefinite,

    /// Iterations require an initial guess first.
    #[error("missing initial guess")]
    MissingInitialGuess,

    /// Failed to deploy the linearization workers.
    #[error("worker pool error: {0}")]
    ThreadPool(String),
}
