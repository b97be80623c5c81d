use log::debug;
use nalgebra::SVector;

use crate::{
    cfg::{Config, IntegratorType},
    constants::{
        MAX_INTEGRATION_STEPS, MIN_INTEGRATION_STEP, STEP_SAFETY_FACTOR, STEP_SCALING_BOUNDS,
    },
    error::Error,
    system::ControlledSystem,
    utils::is_finite,
};

/// Dormand Prince 5(4) tableau
const DOPRI_C: [f64; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const DOPRI_A: [[f64; 6]; 6] = [
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// 4th order (embedded) weights, the 5th order weights being the last row of [DOPRI_A].
const DOPRI_B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Integrates [ControlledSystem]s over one control interval,
/// with zero order hold on the control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    /// Scheme
    pub kind: IntegratorType,
    /// (initial) step size [s]
    pub dt_sim: f64,
    /// Absolute error tolerance, adaptive scheme only
    pub abs_err_tol: f64,
    /// Relative error tolerance, adaptive scheme only
    pub rel_err_tol: f64,
}

impl Integrator {
    /// Builds a fixed step [Integrator]
    pub fn fixed_step(kind: IntegratorType, dt_sim: f64) -> Self {
        Self {
            kind,
            dt_sim,
            abs_err_tol: 1.0E-8,
            rel_err_tol: 1.0E-8,
        }
    }

    /// Builds the [Integrator] described by [Config]
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            kind: cfg.integrator,
            dt_sim: cfg.dt_sim,
            abs_err_tol: cfg.abs_err_tol,
            rel_err_tol: cfg.rel_err_tol,
        }
    }

    /// Integrates the system from `state` at `t0`, over `duration` [s],
    /// holding `control`. Returns the final state.
    pub fn integrate<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        state: &SVector<f64, N>,
        t0: f64,
        duration: f64,
        control: &SVector<f64, M>,
    ) -> Result<SVector<f64, N>, Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        match self.kind {
            IntegratorType::Euler | IntegratorType::RK4 => {
                self.integrate_fixed_step(system, state, t0, duration, control)
            },
            IntegratorType::RK45 => self.integrate_adaptive(system, state, t0, duration, control),
        }
    }

    fn integrate_fixed_step<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        state: &SVector<f64, N>,
        t0: f64,
        duration: f64,
        control: &SVector<f64, M>,
    ) -> Result<SVector<f64, N>, Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        // tolerate rounding: dt = n * dt_sim
        let steps = ((duration / self.dt_sim) - 1.0E-9).ceil().max(1.0) as usize;
        let h = duration / steps as f64;

        let mut x = *state;

        for i in 0..steps {
            let t = t0 + i as f64 * h;

            x = match self.kind {
                IntegratorType::Euler => x + system.compute_dynamics(&x, t, control) * h,
                _ => {
                    let k1 = system.compute_dynamics(&x, t, control);
                    let k2 = system.compute_dynamics(&(x + k1 * (h / 2.0)), t + h / 2.0, control);
                    let k3 = system.compute_dynamics(&(x + k2 * (h / 2.0)), t + h / 2.0, control);
                    let k4 = system.compute_dynamics(&(x + k3 * h), t + h, control);
                    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
                },
            };

            if !is_finite(&x) {
                return Err(Error::NumericalDivergence(t + h));
            }
        }

        Ok(x)
    }

    /// Single Dormand Prince step: returns 5th order solution and error estimate.
    fn dopri_step<S, const N: usize, const M: usize>(
        system: &mut S,
        x: &SVector<f64, N>,
        t: f64,
        h: f64,
        control: &SVector<f64, M>,
    ) -> (SVector<f64, N>, SVector<f64, N>)
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        let mut k = [SVector::<f64, N>::zeros(); 7];
        k[0] = system.compute_dynamics(x, t, control);

        for stage in 0..6 {
            let mut xi = *x;
            for (j, a) in DOPRI_A[stage].iter().enumerate().take(stage + 1) {
                xi += k[j] * (h * a);
            }
            k[stage + 1] = system.compute_dynamics(&xi, t + DOPRI_C[stage] * h, control);
        }

        // FSAL: the 5th order solution is the last stage input
        let mut x5 = *x;
        let mut x4 = *x;
        for j in 0..7 {
            if j < 6 {
                x5 += k[j] * (h * DOPRI_A[5][j]);
            }
            x4 += k[j] * (h * DOPRI_B4[j]);
        }

        (x5, x5 - x4)
    }

    fn integrate_adaptive<S, const N: usize, const M: usize>(
        &self,
        system: &mut S,
        state: &SVector<f64, N>,
        t0: f64,
        duration: f64,
        control: &SVector<f64, M>,
    ) -> Result<SVector<f64, N>, Error>
    where
        S: ControlledSystem<N, M> + ?Sized,
    {
        let t_end = t0 + duration;
        let (min_scale, max_scale) = STEP_SCALING_BOUNDS;

        let mut x = *state;
        let mut t = t0;
        let mut h = self.dt_sim.min(duration);

        for _ in 0..MAX_INTEGRATION_STEPS {
            let remaining = t_end - t;
            if remaining <= duration * 1.0E-12 {
                return Ok(x);
            }

            h = h.min(remaining);

            if h < MIN_INTEGRATION_STEP {
                debug!("rk45: step size collapsed at t={:.6}s", t);
                return Err(Error::NumericalDivergence(t));
            }

            let (x_new, err) = Self::dopri_step(system, &x, t, h, control);

            let err_norm = err
                .iter()
                .zip(x.iter().zip(x_new.iter()))
                .map(|(e, (xi, xn))| {
                    e.abs() / (self.abs_err_tol + self.rel_err_tol * xi.abs().max(xn.abs()))
                })
                .fold(0.0_f64, |max, e| if e.is_nan() { f64::INFINITY } else { max.max(e) });

            if !err_norm.is_finite() || !is_finite(&x_new) {
                h *= min_scale;
                continue;
            }

            if err_norm <= 1.0 {
                t += h;
                x = x_new;
            }

            let scale = if err_norm == 0.0 {
                max_scale
            } else {
                (STEP_SAFETY_FACTOR * err_norm.powf(-0.2)).clamp(min_scale, max_scale)
            };

            h *= scale;
        }

        Err(Error::NumericalDivergence(t))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::SecondOrderSystem;
    use nalgebra::{Vector1, Vector2};

    /// x' = -x
    struct Decay;

    impl ControlledSystem<1, 1> for Decay {
        fn compute_dynamics(
            &mut self,
            state: &SVector<f64, 1>,
            _: f64,
            control: &SVector<f64, 1>,
        ) -> SVector<f64, 1> {
            -state + control
        }
    }

    /// x' = x², escapes to infinity
    struct Blowup;

    impl ControlledSystem<1, 1> for Blowup {
        fn compute_dynamics(
            &mut self,
            state: &SVector<f64, 1>,
            _: f64,
            _: &SVector<f64, 1>,
        ) -> SVector<f64, 1> {
            state.component_mul(state)
        }
    }

    #[test]
    fn exponential_decay() {
        let x0 = Vector1::new(1.0);
        let u = Vector1::new(0.0);
        let expected = (-1.0_f64).exp();

        for (integrator, tol) in [
            (Integrator::fixed_step(IntegratorType::Euler, 1.0E-4), 1.0E-4),
            (Integrator::fixed_step(IntegratorType::RK4, 1.0E-2), 1.0E-9),
            (Integrator::fixed_step(IntegratorType::RK45, 1.0E-2), 1.0E-7),
        ] {
            let x = integrator.integrate(&mut Decay, &x0, 0.0, 1.0, &u).unwrap();
            assert!(
                (x[0] - expected).abs() < tol,
                "{}: {} vs {}",
                integrator.kind,
                x[0],
                expected
            );
        }
    }

    #[test]
    fn zero_order_hold() {
        // free oscillator driven by a constant unit force: x0(t) = 1 - cos(t)
        let mut sys = SecondOrderSystem::default();
        let integrator = Integrator::fixed_step(IntegratorType::RK4, 1.0E-3);
        let x = integrator
            .integrate(&mut sys, &Vector2::zeros(), 0.0, 1.0, &Vector1::new(1.0))
            .unwrap();
        assert!((x[0] - (1.0 - 1.0_f64.cos())).abs() < 1.0E-10);
        assert!((x[1] - 1.0_f64.sin()).abs() < 1.0E-10);
    }

    #[test]
    fn divergence() {
        let x0 = Vector1::new(1.0);
        let u = Vector1::new(0.0);
        // exact solution escapes at t = 1
        for kind in [IntegratorType::Euler, IntegratorType::RK4, IntegratorType::RK45] {
            let integrator = Integrator::fixed_step(kind, 1.0E-2);
            match integrator.integrate(&mut Blowup, &x0, 0.0, 5.0, &u) {
                Err(Error::NumericalDivergence(t)) => assert!(t > 0.0),
                other => panic!("{}: expecting divergence, got {:?}", kind, other),
            }
        }
    }
}
