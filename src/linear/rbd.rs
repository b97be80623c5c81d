use log::warn;
use nalgebra::{DMatrix, DVector, SMatrix, SVector, Vector3};

use crate::{
    error::Error,
    linear::{kinematics, LinearSystem, SystemLinearizer},
    system::{RigidBodySystem, SystemType},
    utils::spd_solve,
};

/// [LinearSystem] specialized for [RigidBodySystem]s.
///
/// Fixed base systems are differentiated numerically, exactly like
/// [SystemLinearizer] does. Floating base systems get the kinematic
/// (upper) rows of ∂f/∂x replaced by their analytical expression.
/// In both cases, ∂f/∂u is obtained from the joint space inertia matrix:
/// its lower half is `M(q)⁻¹ S^T`.
pub struct RbdLinearizer<R, const N: usize, const M: usize>
where
    R: RigidBodySystem<N, M>,
{
    linearizer: SystemLinearizer<R, N, M>,
    floating_base: bool,
    joints: usize,
    selection_t: DMatrix<f64>,
}

impl<R, const N: usize, const M: usize> RbdLinearizer<R, N, M>
where
    R: RigidBodySystem<N, M>,
{
    /// Builds a new [RbdLinearizer], verifying the dimensions
    /// of the [RigidBodySystem] are consistent.
    pub fn new(system: R, double_sided: bool) -> Result<Self, Error> {
        let floating_base = system.floating_base();
        let joints = system.joints();

        let dofs = joints + if floating_base { 6 } else { 0 };

        if N != 2 * dofs {
            return Err(Error::DimensionMismatch {
                expected: 2 * dofs,
                got: N,
            });
        }

        if M != joints {
            return Err(Error::DimensionMismatch {
                expected: joints,
                got: M,
            });
        }

        let selection = system.selection_matrix();

        if selection.nrows() != M {
            return Err(Error::DimensionMismatch {
                expected: M,
                got: selection.nrows(),
            });
        }

        if selection.ncols() != dofs {
            return Err(Error::DimensionMismatch {
                expected: dofs,
                got: selection.ncols(),
            });
        }

        if !floating_base && system.system_type() != SystemType::SecondOrder {
            warn!("fixed base rigid body should be declared as a second order system");
        }

        Ok(Self {
            linearizer: SystemLinearizer::new(system, double_sided),
            floating_base,
            joints,
            selection_t: selection.transpose(),
        })
    }

    /// Wrapped [RigidBodySystem]
    pub fn system(&self) -> &R {
        self.linearizer.system()
    }

    pub fn floating_base(&self) -> bool {
        self.floating_base
    }

    /// Overwrites the kinematic rows of ∂f/∂x:
    /// `θ' = H(θ) ω`, `p' = R(θ) v` and `q' = qd`.
    fn floating_base_kinematics(&self, a: &mut SMatrix<f64, N, N>, state: &SVector<f64, N>) {
        let half = N / 2;

        let euler = Vector3::new(state[0], state[1], state[2]);
        let omega = Vector3::new(state[half], state[half + 1], state[half + 2]);
        let velocity = Vector3::new(state[half + 3], state[half + 4], state[half + 5]);

        a.rows_mut(0, half).fill(0.0);

        let jac = kinematics::euler_rates_jacobian(&euler, &omega);
        a.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&jac.fixed_view::<3, 3>(0, 0));
        a.fixed_view_mut::<3, 3>(0, half)
            .copy_from(&jac.fixed_view::<3, 3>(0, 3));

        a.fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&kinematics::rotated_velocity_jacobian(&euler, &velocity));
        a.fixed_view_mut::<3, 3>(3, half + 3)
            .copy_from(&kinematics::rotation_matrix_xyz(&euler));

        for j in 0..self.joints {
            a[(6 + j, half + 6 + j)] = 1.0;
        }
    }
}

impl<R, const N: usize, const M: usize> LinearSystem<N, M> for RbdLinearizer<R, N, M>
where
    R: RigidBodySystem<N, M>,
{
    fn derivative_state(
        &mut self,
        state: &SVector<f64, N>,
        control: &SVector<f64, M>,
        t: f64,
    ) -> Result<SMatrix<f64, N, N>, Error> {
        let mut a = self.linearizer.derivative_state(state, control, t)?;
        if self.floating_base {
            self.floating_base_kinematics(&mut a, state);
        }
        Ok(a)
    }

    fn derivative_control(
        &mut self,
        state: &SVector<f64, N>,
        _: &SVector<f64, M>,
        _: f64,
    ) -> Result<SMatrix<f64, N, M>, Error> {
        let half = N / 2;

        let positions = DVector::from_column_slice(&state.as_slice()[..half]);
        let mass = self.linearizer.system().mass_matrix(&positions);

        if mass.nrows() != half || mass.ncols() != half {
            return Err(Error::DimensionMismatch {
                expected: half,
                got: mass.nrows(),
            });
        }

        let minv_st =
            spd_solve(mass, &self.selection_t).ok_or(Error::MassMatrixNotPositiveDefinite)?;

        let mut b = SMatrix::<f64, N, M>::zeros();
        b.view_mut((half, 0), (half, M)).copy_from(&minv_st);
        Ok(b)
    }
}
