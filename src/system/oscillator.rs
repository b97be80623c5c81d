use nalgebra::{SVector, Vector1, Vector2};

use crate::system::{ControlledSystem, SystemType};

/// Damped oscillator (spring mass damper), the canonical second order system:
///
/// `x0' = x1`
/// `x1' = -w_n² x0 - 2 zeta w_n x1 + g_dc w_n² u`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondOrderSystem {
    /// Eigen frequency [rad/s]
    pub w_n: f64,
    /// Damping ratio
    pub zeta: f64,
    /// Static (DC) gain
    pub g_dc: f64,
}

impl Default for SecondOrderSystem {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl SecondOrderSystem {
    /// Builds a [SecondOrderSystem] with unitary static gain.
    pub fn new(w_n: f64, zeta: f64) -> Self {
        Self {
            w_n,
            zeta,
            g_dc: 1.0,
        }
    }

    /// Copies and returns [Self] with desired static gain.
    pub fn with_dc_gain(&self, g_dc: f64) -> Self {
        let mut s = *self;
        s.g_dc = g_dc;
        s
    }
}

impl ControlledSystem<2, 1> for SecondOrderSystem {
    fn compute_dynamics(
        &mut self,
        state: &Vector2<f64>,
        _: f64,
        control: &Vector1<f64>,
    ) -> SVector<f64, 2> {
        let w_n2 = self.w_n.powi(2);
        Vector2::new(
            state[1],
            -w_n2 * state[0] - 2.0 * self.zeta * self.w_n * state[1]
                + self.g_dc * w_n2 * control[0],
        )
    }

    fn system_type(&self) -> SystemType {
        SystemType::SecondOrder
    }
}
