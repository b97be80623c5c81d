use nalgebra::{SMatrix, SVector};

use crate::{
    cost::{CostFunction, QuadraticModel},
    utils::symmetrize,
};

/// Quadratic tracking cost:
///
/// `L(x, u) = ½ (x - x_nom)ᵀ Q (x - x_nom) + ½ (u - u_nom)ᵀ R (u - u_nom)`
///
/// `Φ(x) = ½ (x - x_final)ᵀ Q_final (x - x_final)`
///
/// Weighting matrices are symmetrized on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticCost<const N: usize, const M: usize> {
    q: SMatrix<f64, N, N>,
    r: SMatrix<f64, M, M>,
    x_nominal: SVector<f64, N>,
    u_nominal: SVector<f64, M>,
    x_final: SVector<f64, N>,
    q_final: SMatrix<f64, N, N>,
}

impl<const N: usize, const M: usize> QuadraticCost<N, M> {
    /// Builds a [QuadraticCost] regulating towards the origin,
    /// without terminal cost.
    pub fn new(q: SMatrix<f64, N, N>, r: SMatrix<f64, M, M>) -> Self {
        Self {
            q: symmetrize(&q),
            r: symmetrize(&r),
            x_nominal: SVector::zeros(),
            u_nominal: SVector::zeros(),
            x_final: SVector::zeros(),
            q_final: SMatrix::zeros(),
        }
    }

    /// Copies and returns [Self] with desired nominal state and control.
    pub fn with_nominal(mut self, x_nominal: SVector<f64, N>, u_nominal: SVector<f64, M>) -> Self {
        self.x_nominal = x_nominal;
        self.u_nominal = u_nominal;
        self
    }

    /// Copies and returns [Self] with desired terminal cost.
    pub fn with_terminal(mut self, x_final: SVector<f64, N>, q_final: SMatrix<f64, N, N>) -> Self {
        self.x_final = x_final;
        self.q_final = symmetrize(&q_final);
        self
    }

    /// Desired final state
    pub fn x_final(&self) -> &SVector<f64, N> {
        &self.x_final
    }
}

impl<const N: usize, const M: usize> CostFunction<N, M> for QuadraticCost<N, M> {
    fn intermediate_cost(&self, state: &SVector<f64, N>, control: &SVector<f64, M>, _: f64) -> f64 {
        let dx = state - self.x_nominal;
        let du = control - self.u_nominal;
        0.5 * (dx.dot(&(self.q * dx)) + du.dot(&(self.r * du)))
    }

    fn terminal_cost(&self, state: &SVector<f64, N>, _: f64) -> f64 {
        let dx = state - self.x_final;
        0.5 * dx.dot(&(self.q_final * dx))
    }

    fn intermediate_model(
        &self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> QuadraticModel<N, M> {
        let dx = state - self.x_nominal;
        let du = control - self.u_nominal;
        QuadraticModel {
            value: self.intermediate_cost(state, control, t),
            qv: self.q * dx,
            q: self.q,
            rv: self.r * du,
            r: self.r,
            p: SMatrix::zeros(),
        }
    }

    fn terminal_model(&self, state: &SVector<f64, N>, t: f64) -> QuadraticModel<N, M> {
        let dx = state - self.x_final;
        QuadraticModel::terminal(self.terminal_cost(state, t), self.q_final * dx, self.q_final)
    }
}
