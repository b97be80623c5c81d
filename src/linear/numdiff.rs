use log::warn;
use nalgebra::{SMatrix, SVector};

use crate::{
    constants::NUMDIFF_EPSILON,
    error::Error,
    linear::LinearSystem,
    system::{ControlledSystem, SystemType},
};

/// [LinearSystem] obtained by numerical differentiation of a [ControlledSystem].
///
/// Each column is obtained by perturbing one component by
/// `h = eps * max(|x_i|, 1)`, either single sided `(f(x+h) - f(x)) / h`
/// or double sided `(f(x+h) - f(x-h)) / 2h`.
///
/// [SystemType::SecondOrder] systems are exploited: the upper half of
/// ∂f/∂x is `[0 I]` and the upper half of ∂f/∂u is zero, only
/// the lower half gets differentiated.
pub struct SystemLinearizer<S, const N: usize, const M: usize>
where
    S: ControlledSystem<N, M>,
{
    system: S,
    double_sided: bool,
    second_order: bool,
}

impl<S, const N: usize, const M: usize> SystemLinearizer<S, N, M>
where
    S: ControlledSystem<N, M>,
{
    /// Builds a new [SystemLinearizer] wrapping this [ControlledSystem].
    pub fn new(system: S, double_sided: bool) -> Self {
        let second_order = match system.system_type() {
            SystemType::SecondOrder if N % 2 == 0 => true,
            SystemType::SecondOrder => {
                warn!(
                    "second order system with odd state dimension ({}): differentiating all rows",
                    N
                );
                false
            },
            SystemType::General => false,
        };
        Self {
            system,
            double_sided,
            second_order,
        }
    }

    /// True when double sided differences are used
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    /// Wrapped [ControlledSystem]
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Rows that need to be differentiated
    fn first_row(&self) -> usize {
        if self.second_order {
            N / 2
        } else {
            0
        }
    }

    fn step(&self, value: f64) -> f64 {
        NUMDIFF_EPSILON * value.abs().max(1.0)
    }

    /// Finite difference of f along one perturbation, evaluated by `eval(delta)`.
    fn difference<F>(
        &mut self,
        h: f64,
        f0: Option<&SVector<f64, N>>,
        mut eval: F,
    ) -> SVector<f64, N>
    where
        F: FnMut(&mut S, f64) -> SVector<f64, N>,
    {
        let f_plus = eval(&mut self.system, h);
        match f0 {
            Some(f0) => (f_plus - f0) / h,
            None => {
                let f_minus = eval(&mut self.system, -h);
                (f_plus - f_minus) / (2.0 * h)
            },
        }
    }
}

impl<S, const N: usize, const M: usize> LinearSystem<N, M> for SystemLinearizer<S, N, M>
where
    S: ControlledSystem<N, M>,
{
    fn derivative_state(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<SMatrix<f64, N, N>, Error> {
        let first_row = self.first_row();
        let mut a = SMatrix::<f64, N, N>::zeros();

        let f0 = if self.double_sided {
            None
        } else {
            Some(self.system.compute_dynamics(state, t, control))
        };

        // second order: columns of positions and velocities both need
        // the lower rows, the upper rows are known
        for i in 0..N {
            let h = self.step(state[i]);
            let column = self.difference(h, f0.as_ref(), |system, delta| {
                let mut x = *state;
                x[i] += delta;
                system.compute_dynamics(&x, t, control)
            });
            a.view_mut((first_row, i), (N - first_row, 1))
                .copy_from(&column.rows(first_row, N - first_row));
        }

        if self.second_order {
            let half = N / 2;
            for i in 0..half {
                a[(i, half + i)] = 1.0;
            }
        }

        Ok(a)
    }

    fn derivative_control(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<SMatrix<f64, N, M>, Error> {
        let first_row = self.first_row();
        let mut b = SMatrix::<f64, N, M>::zeros();

        let f0 = if self.double_sided {
            None
        } else {
            Some(self.system.compute_dynamics(state, t, control))
        };

        for j in 0..M {
            let h = self.step(control[j]);
            let column = self.difference(h, f0.as_ref(), |system, delta| {
                let mut u = *control;
                u[j] += delta;
                system.compute_dynamics(state, t, &u)
            });
            b.view_mut((first_row, j), (N - first_row, 1))
                .copy_from(&column.rows(first_row, N - first_row));
        }

        Ok(b)
    }
}
