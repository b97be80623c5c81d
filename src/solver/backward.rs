use nalgebra::{SMatrix, SVector};

use crate::{error::Error, solver::approximation::LqProblem, utils::symmetrize};

/// Backward pass output: affine control law correction
/// `δu_k = l_k + K_k δx_k`, and the predicted cost change.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Gains<const N: usize, const M: usize> {
    /// K_k
    pub feedback: Vec<SMatrix<f64, M, N>>,
    /// l_k
    pub feedforward: Vec<SVector<f64, M>>,
    /// Σ lᵀ Qu
    pub expected_linear: f64,
    /// Σ ½ lᵀ Quu l
    pub expected_quadratic: f64,
}

impl<const N: usize, const M: usize> Gains<N, M> {
    /// Cost change predicted by the LQ model, for step size alpha.
    pub fn expected_change(&self, alpha: f64) -> f64 {
        alpha * self.expected_linear + alpha.powi(2) * self.expected_quadratic
    }
}

/// Riccati recursion over the [LqProblem], with `mu` regularization
/// of the control hessian. Fails with [Error::IndefiniteHessian] at the
/// first stage whose regularized control hessian is not positive definite.
pub(crate) fn backward_pass<const N: usize, const M: usize>(
    lq: &LqProblem<N, M>,
    mu: f64,
) -> Result<Gains<N, M>, Error> {
    let horizon = lq.stages.len();

    let mut feedback = vec![SMatrix::<f64, M, N>::zeros(); horizon];
    let mut feedforward = vec![SVector::<f64, M>::zeros(); horizon];

    let (mut expected_linear, mut expected_quadratic) = (0.0, 0.0);

    // value function: ½ δxᵀ S δx + sᵀ δx
    let mut s_mat = lq.terminal.q;
    let mut s_vec = lq.terminal.qv;

    for (k, stage) in lq.stages.iter().enumerate().rev() {
        let (a, b, cost) = (&stage.a, &stage.b, &stage.cost);

        let bt_s = b.transpose() * s_mat;
        let at_s = a.transpose() * s_mat;

        // gradient of the value function at the next node, defect included
        let s_next = s_vec + s_mat * stage.defect;

        let qu = cost.rv + b.transpose() * s_next;
        let qx = cost.qv + a.transpose() * s_next;
        let quu = cost.r + bt_s * b;
        let qux = cost.p + bt_s * a;
        let qxx = cost.q + at_s * a;

        let quu_reg = symmetrize(&quu) + SMatrix::<f64, M, M>::identity() * mu;

        let chol = quu_reg.cholesky().ok_or(Error::IndefiniteHessian(k))?;

        let gain = -chol.solve(&qux);
        let ff = -chol.solve(&qu);

        let gain_t = gain.transpose();

        s_vec = qx + gain_t * quu * ff + gain_t * qu + qux.transpose() * ff;
        s_mat = symmetrize(&(qxx + gain_t * quu * gain + gain_t * qux + qux.transpose() * gain));

        expected_linear += ff.dot(&qu);
        expected_quadratic += 0.5 * ff.dot(&(quu * ff));

        feedback[k] = gain;
        feedforward[k] = ff;
    }

    Ok(Gains {
        feedback,
        feedforward,
        expected_linear,
        expected_quadratic,
    })
}
