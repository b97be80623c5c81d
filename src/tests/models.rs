//! Systems used by the test scenarios
use std::sync::Arc;

use nalgebra::{
    DMatrix, DVector, Matrix1, Matrix2, SMatrix, SVector, Vector1, Vector2, Vector3, Vector4,
};

use crate::{
    linear::kinematics::{body_rates_to_euler_rates, rotation_matrix_xyz},
    prelude::{
        system_factory, ControlledSystem, CostFunction, Error, LinearSystem, OptConProblem,
        QuadraticCost, QuadraticModel, RigidBodySystem, SecondOrderSystem, SystemType,
    },
};

/// Unstable nonlinear scalar system `x' = (1 + x) x + u`
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarSystem {}

impl ControlledSystem<1, 1> for ScalarSystem {
    fn compute_dynamics(&mut self, x: &Vector1<f64>, _: f64, u: &Vector1<f64>) -> Vector1<f64> {
        Vector1::new((1.0 + x[0]) * x[0] + u[0])
    }
}

/// Analytical linearization of [ScalarSystem]
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarLinearSystem {}

impl LinearSystem<1, 1> for ScalarLinearSystem {
    fn derivative_state(
        &mut self,
        x: &Vector1<f64>,
        _: &Vector1<f64>,
        _: f64,
    ) -> Result<Matrix1<f64>, Error> {
        Ok(Matrix1::new(1.0 + 2.0 * x[0]))
    }

    fn derivative_control(
        &mut self,
        _: &Vector1<f64>,
        _: &Vector1<f64>,
        _: f64,
    ) -> Result<Matrix1<f64>, Error> {
        Ok(Matrix1::new(1.0))
    }
}

/// Linearization of [ScalarSystem] with a wrong sign control derivative:
/// every update it leads to points uphill.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlippedLinearSystem {}

impl LinearSystem<1, 1> for FlippedLinearSystem {
    fn derivative_state(
        &mut self,
        x: &Vector1<f64>,
        _: &Vector1<f64>,
        _: f64,
    ) -> Result<Matrix1<f64>, Error> {
        Ok(Matrix1::new(1.0 + 2.0 * x[0]))
    }

    fn derivative_control(
        &mut self,
        _: &Vector1<f64>,
        _: &Vector1<f64>,
        _: f64,
    ) -> Result<Matrix1<f64>, Error> {
        Ok(Matrix1::new(-1.0))
    }
}

/// Stable scalar system `x' = -x + u` whose actuator breaks down
/// (non finite rate) past `limit`.
#[derive(Debug, Clone, Copy)]
pub struct FragileSystem {
    pub limit: f64,
}

impl ControlledSystem<1, 1> for FragileSystem {
    fn compute_dynamics(&mut self, x: &Vector1<f64>, _: f64, u: &Vector1<f64>) -> Vector1<f64> {
        if u[0].abs() > self.limit {
            Vector1::new(f64::NAN)
        } else {
            Vector1::new(-x[0] + u[0])
        }
    }
}

/// Steers [FragileSystem] (without actuator limit) from the origin to x=1.
pub fn fragile_problem() -> OptConProblem<1, 1> {
    let cost = QuadraticCost::<1, 1>::new(Matrix1::zeros(), Matrix1::new(0.1))
        .with_terminal(Vector1::new(1.0), Matrix1::new(10.0));

    OptConProblem::with_numdiff(
        Vector1::zeros(),
        system_factory(|| FragileSystem {
            limit: f64::INFINITY,
        }),
        Arc::new(cost),
    )
}

/// Spring mass problem: reach x=1 at rest, from the origin.
pub fn oscillator_problem() -> OptConProblem<2, 1> {
    let cost = QuadraticCost::<2, 1>::new(Matrix2::identity() * 0.1, Matrix1::new(0.1))
        .with_terminal(Vector2::new(1.0, 0.0), Matrix2::identity() * 100.0);

    OptConProblem::with_numdiff(
        Vector2::zeros(),
        system_factory(SecondOrderSystem::default),
        Arc::new(cost),
    )
}

/// Planar arm made of two links, point masses at the end of each link.
/// Fixed base, gravity along -y, both joints actuated.
#[derive(Debug, Clone, Copy)]
pub struct TwoLinkArm {
    pub masses: (f64, f64),
    pub lengths: (f64, f64),
    pub gravity: f64,
}

impl Default for TwoLinkArm {
    fn default() -> Self {
        Self {
            masses: (1.0, 0.5),
            lengths: (0.6, 0.4),
            gravity: 9.81,
        }
    }
}

impl TwoLinkArm {
    fn inertia(&self, q2: f64) -> Matrix2<f64> {
        let (m1, m2) = self.masses;
        let (l1, l2) = self.lengths;
        let c2 = q2.cos();
        let m12 = m2 * l2 * l2 + m2 * l1 * l2 * c2;
        Matrix2::new(
            (m1 + m2) * l1 * l1 + m2 * l2 * l2 + 2.0 * m2 * l1 * l2 * c2,
            m12,
            m12,
            m2 * l2 * l2,
        )
    }
}

impl ControlledSystem<4, 2> for TwoLinkArm {
    fn compute_dynamics(&mut self, x: &Vector4<f64>, _: f64, u: &Vector2<f64>) -> Vector4<f64> {
        let (m1, m2) = self.masses;
        let (l1, l2) = self.lengths;
        let (q1, q2, qd1, qd2) = (x[0], x[1], x[2], x[3]);

        let h = m2 * l1 * l2 * q2.sin();
        let coriolis = Vector2::new(-h * (2.0 * qd1 * qd2 + qd2 * qd2), h * qd1 * qd1);

        let g = self.gravity;
        let gravity = Vector2::new(
            (m1 + m2) * g * l1 * q1.cos() + m2 * g * l2 * (q1 + q2).cos(),
            m2 * g * l2 * (q1 + q2).cos(),
        );

        let qdd = self
            .inertia(q2)
            .cholesky()
            .expect("arm inertia is positive definite")
            .solve(&(u - coriolis - gravity));

        Vector4::new(qd1, qd2, qdd[0], qdd[1])
    }

    fn system_type(&self) -> SystemType {
        SystemType::SecondOrder
    }
}

impl RigidBodySystem<4, 2> for TwoLinkArm {
    fn floating_base(&self) -> bool {
        false
    }

    fn joints(&self) -> usize {
        2
    }

    fn mass_matrix(&self, q: &DVector<f64>) -> DMatrix<f64> {
        let inertia = self.inertia(q[1]);
        DMatrix::from_fn(2, 2, |i, j| inertia[(i, j)])
    }
}

/// Free floating rigid body carrying one prismatic (spring loaded) joint,
/// decoupled from the base dynamics. Positions: `[θ, p, q]`,
/// velocities `[ω, v, qd]` (ω and v in the base frame).
#[derive(Debug, Clone, Copy)]
pub struct FloatingBody {
    pub inertia: Vector3<f64>,
    pub mass: f64,
    pub joint_mass: f64,
    pub joint_stiffness: f64,
    pub joint_damping: f64,
}

impl Default for FloatingBody {
    fn default() -> Self {
        Self {
            inertia: Vector3::new(0.2, 0.3, 0.4),
            mass: 2.0,
            joint_mass: 0.5,
            joint_stiffness: 4.0,
            joint_damping: 0.1,
        }
    }
}

impl ControlledSystem<14, 1> for FloatingBody {
    fn compute_dynamics(
        &mut self,
        x: &SVector<f64, 14>,
        _: f64,
        u: &Vector1<f64>,
    ) -> SVector<f64, 14> {
        let euler = Vector3::new(x[0], x[1], x[2]);
        let omega = Vector3::new(x[7], x[8], x[9]);
        let v = Vector3::new(x[10], x[11], x[12]);
        let (q, qd) = (x[6], x[13]);

        let rot = rotation_matrix_xyz(&euler);
        let j = SMatrix::<f64, 3, 3>::from_diagonal(&self.inertia);

        let euler_rates = body_rates_to_euler_rates(&euler) * omega;
        let p_dot = rot * v;

        let omega_dot = (-omega.cross(&(j * omega))).component_div(&self.inertia);
        let v_dot = -omega.cross(&v) + rot.transpose() * Vector3::new(0.0, 0.0, -9.81);
        let qdd =
            (u[0] - self.joint_damping * qd - self.joint_stiffness * q) / self.joint_mass;

        let mut dx = SVector::<f64, 14>::zeros();
        dx.fixed_rows_mut::<3>(0).copy_from(&euler_rates);
        dx.fixed_rows_mut::<3>(3).copy_from(&p_dot);
        dx[6] = qd;
        dx.fixed_rows_mut::<3>(7).copy_from(&omega_dot);
        dx.fixed_rows_mut::<3>(10).copy_from(&v_dot);
        dx[13] = qdd;
        dx
    }
}

impl RigidBodySystem<14, 1> for FloatingBody {
    fn floating_base(&self) -> bool {
        true
    }

    fn joints(&self) -> usize {
        1
    }

    fn mass_matrix(&self, _: &DVector<f64>) -> DMatrix<f64> {
        let mut diagonal = DVector::<f64>::zeros(7);
        for i in 0..3 {
            diagonal[i] = self.inertia[i];
            diagonal[3 + i] = self.mass;
        }
        diagonal[6] = self.joint_mass;
        DMatrix::from_diagonal(&diagonal)
    }
}

/// Actuated pendulum `I q'' = u - m g l sin(q)`, whose inertia and
/// number of declared joints may be corrupted.
#[derive(Debug, Clone, Copy)]
pub struct Pendulum {
    pub inertia: f64,
    pub joints: usize,
}

impl Default for Pendulum {
    fn default() -> Self {
        Self {
            inertia: 0.5,
            joints: 1,
        }
    }
}

impl ControlledSystem<2, 1> for Pendulum {
    fn compute_dynamics(&mut self, x: &Vector2<f64>, _: f64, u: &Vector1<f64>) -> Vector2<f64> {
        Vector2::new(x[1], (u[0] - 0.5 * 9.81 * x[0].sin()) / self.inertia)
    }

    fn system_type(&self) -> SystemType {
        SystemType::SecondOrder
    }
}

impl RigidBodySystem<2, 1> for Pendulum {
    fn floating_base(&self) -> bool {
        false
    }

    fn joints(&self) -> usize {
        self.joints
    }

    fn mass_matrix(&self, _: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_element(1, 1, self.inertia)
    }
}

/// [QuadraticCost] whose control hessian model is corrupted (concave)
#[derive(Debug, Clone)]
pub struct ConcaveCost {
    pub inner: QuadraticCost<2, 1>,
}

impl CostFunction<2, 1> for ConcaveCost {
    fn intermediate_cost(&self, x: &Vector2<f64>, u: &Vector1<f64>, t: f64) -> f64 {
        self.inner.intermediate_cost(x, u, t)
    }

    fn terminal_cost(&self, x: &Vector2<f64>, t: f64) -> f64 {
        self.inner.terminal_cost(x, t)
    }

    fn intermediate_model(
        &self,
        x: &Vector2<f64>,
        u: &Vector1<f64>,
        t: f64,
    ) -> QuadraticModel<2, 1> {
        let mut model = self.inner.intermediate_model(x, u, t);
        model.r = Matrix1::new(-1.0E15);
        model
    }

    fn terminal_model(&self, x: &Vector2<f64>, t: f64) -> QuadraticModel<2, 1> {
        self.inner.terminal_model(x, t)
    }
}
