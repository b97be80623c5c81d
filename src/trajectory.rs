use std::ops::Index;

use nalgebra::SVector;

use crate::error::Error;

/// Time indexed sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteTrajectory<T> {
    times: Vec<f64>,
    values: Vec<T>,
}

/// Sequence of K+1 states
pub type StateTrajectory<const N: usize> = DiscreteTrajectory<SVector<f64, N>>;

/// Sequence of K controls
pub type ControlTrajectory<const M: usize> = DiscreteTrajectory<SVector<f64, M>>;

impl<T> Default for DiscreteTrajectory<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T> DiscreteTrajectory<T> {
    /// Builds a new [DiscreteTrajectory], both sequences must have the same length.
    pub fn new(times: Vec<f64>, values: Vec<T>) -> Result<Self, Error> {
        if times.len() != values.len() {
            return Err(Error::DimensionMismatch {
                expected: times.len(),
                got: values.len(),
            });
        }
        Ok(Self { times, values })
    }

    /// Builds a uniformly sampled [DiscreteTrajectory], starting at t0 [s].
    pub fn uniform(t0: f64, dt: f64, values: Vec<T>) -> Self {
        let times = (0..values.len()).map(|k| t0 + k as f64 * dt).collect();
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sampling instants [s]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time of k-th sample [s]
    pub fn time(&self, k: usize) -> f64 {
        self.times[k]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn front(&self) -> Option<&T> {
        self.values.first()
    }

    pub fn back(&self) -> Option<&T> {
        self.values.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Iterates (time, value) pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &T)> {
        self.times.iter().copied().zip(self.values.iter())
    }

    /// Consumes [Self], returns the values.
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl<T> Index<usize> for DiscreteTrajectory<T> {
    type Output = T;
    fn index(&self, k: usize) -> &T {
        &self.values[k]
    }
}

/// Verifies the K+1 states / K controls relation.
pub(crate) fn check_lengths<const N: usize, const M: usize>(
    states: &StateTrajectory<N>,
    controls: &ControlTrajectory<M>,
) -> Result<(), Error> {
    if states.len() != controls.len() + 1 {
        return Err(Error::DimensionMismatch {
            expected: controls.len() + 1,
            got: states.len(),
        });
    }
    Ok(())
}
