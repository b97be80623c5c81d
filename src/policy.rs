use nalgebra::{SMatrix, SVector};

use crate::{
    error::Error,
    trajectory::{check_lengths, ControlTrajectory, StateTrajectory},
};

/// Time varying affine state feedback:
/// `u_k = u_ff_k + K_k (x_k - x_ref_k)`, sampled every `dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy<const N: usize, const M: usize> {
    feedforward: Vec<SVector<f64, M>>,
    gains: Vec<SMatrix<f64, M, N>>,
    reference: Vec<SVector<f64, N>>,
    dt: f64,
}

impl<const N: usize, const M: usize> Policy<N, M> {
    /// Builds a new [Policy]: K feedforward terms and gains, K+1 reference states.
    pub fn new(
        feedforward: Vec<SVector<f64, M>>,
        gains: Vec<SMatrix<f64, M, N>>,
        reference: Vec<SVector<f64, N>>,
        dt: f64,
    ) -> Result<Self, Error> {
        if gains.len() != feedforward.len() {
            return Err(Error::DimensionMismatch {
                expected: feedforward.len(),
                got: gains.len(),
            });
        }
        if reference.len() != feedforward.len() + 1 {
            return Err(Error::DimensionMismatch {
                expected: feedforward.len() + 1,
                got: reference.len(),
            });
        }
        Ok(Self {
            feedforward,
            gains,
            reference,
            dt,
        })
    }

    /// Open loop [Policy] that simply replays the controls.
    pub fn feedforward(controls: Vec<SVector<f64, M>>, dt: f64) -> Self {
        let horizon = controls.len();
        Self {
            feedforward: controls,
            gains: vec![SMatrix::zeros(); horizon],
            reference: vec![SVector::zeros(); horizon + 1],
            dt,
        }
    }

    /// Open loop [Policy] holding a constant control over K intervals.
    pub fn constant(control: SVector<f64, M>, horizon: usize, dt: f64) -> Self {
        Self::feedforward(vec![control; horizon], dt)
    }

    /// Open loop [Policy] built from a state and control trajectory. The states
    /// act as reference and are used as initial shooting nodes by multiple shooting.
    pub fn from_trajectory(
        states: &StateTrajectory<N>,
        controls: &ControlTrajectory<M>,
        dt: f64,
    ) -> Result<Self, Error> {
        check_lengths(states, controls)?;
        Ok(Self {
            feedforward: controls.values().to_vec(),
            gains: vec![SMatrix::zeros(); controls.len()],
            reference: states.values().to_vec(),
            dt,
        })
    }

    /// Number of control intervals K
    pub fn len(&self) -> usize {
        self.feedforward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feedforward.is_empty()
    }

    /// Sampling period [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn feedforward_controls(&self) -> &[SVector<f64, M>] {
        &self.feedforward
    }

    pub fn gains(&self) -> &[SMatrix<f64, M, N>] {
        &self.gains
    }

    pub fn reference_states(&self) -> &[SVector<f64, N>] {
        &self.reference
    }

    /// Control to apply at stage k, in given state.
    pub fn control(&self, k: usize, state: &SVector<f64, N>) -> SVector<f64, M> {
        self.feedforward[k] + self.gains[k] * (state - self.reference[k])
    }
}
