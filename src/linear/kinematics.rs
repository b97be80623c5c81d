//! Floating base kinematics, orientation expressed as Euler angles
//! (XYZ convention, intrinsic): `R = Rx(a) Ry(b) Rz(c)`.
use nalgebra::{Matrix3, Rotation3, SMatrix, Vector3};

/// Base to world rotation matrix
pub fn rotation_matrix_xyz(euler: &Vector3<f64>) -> Matrix3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), euler[0]);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), euler[1]);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), euler[2]);
    (rx * ry * rz).into_inner()
}

/// E(θ): maps Euler angle rates to the body angular velocity (base frame).
pub fn euler_rates_to_body_rates(euler: &Vector3<f64>) -> Matrix3<f64> {
    let (sb, cb) = euler[1].sin_cos();
    let (sc, cc) = euler[2].sin_cos();
    Matrix3::new(cc * cb, sc, 0.0, -sc * cb, cc, 0.0, sb, 0.0, 1.0)
}

/// H(θ) = E(θ)⁻¹: maps the body angular velocity to Euler angle rates.
/// Singular for b = ±π/2.
pub fn body_rates_to_euler_rates(euler: &Vector3<f64>) -> Matrix3<f64> {
    let (sb, cb) = euler[1].sin_cos();
    let (sc, cc) = euler[2].sin_cos();
    let tb = sb / cb;
    Matrix3::new(
        cc / cb,
        -sc / cb,
        0.0,
        sc,
        cc,
        0.0,
        -tb * cc,
        tb * sc,
        1.0,
    )
}

/// Jacobian of the Euler angle rates `H(θ) ω` with respect to `[θ, ω]` (3x6).
pub fn euler_rates_jacobian(euler: &Vector3<f64>, omega: &Vector3<f64>) -> SMatrix<f64, 3, 6> {
    let (sb, cb) = euler[1].sin_cos();
    let (sc, cc) = euler[2].sin_cos();
    let tb = sb / cb;
    let cb2 = cb * cb;

    let g = cc * omega[0] - sc * omega[1];
    let f = sc * omega[0] + cc * omega[1];

    let mut jac = SMatrix::<f64, 3, 6>::zeros();

    // ∂/∂θ (does not depend on a)
    jac[(0, 1)] = g * sb / cb2;
    jac[(0, 2)] = -f / cb;
    jac[(1, 2)] = g;
    jac[(2, 1)] = -g / cb2;
    jac[(2, 2)] = tb * f;

    // ∂/∂ω
    jac.fixed_view_mut::<3, 3>(0, 3)
        .copy_from(&body_rates_to_euler_rates(euler));

    jac
}

/// Jacobian of the world frame velocity `R(θ) v` with respect to θ,
/// v being expressed in the base frame.
pub fn rotated_velocity_jacobian(euler: &Vector3<f64>, v: &Vector3<f64>) -> Matrix3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), euler[0]);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), euler[1]);

    let rv = rotation_matrix_xyz(euler) * v;

    let axis_b = rx * Vector3::y();
    let axis_c = rx * ry * Vector3::z();

    Matrix3::from_columns(&[Vector3::x().cross(&rv), axis_b.cross(&rv), axis_c.cross(&rv)])
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    const H: f64 = 1.0E-6;

    fn numdiff<F: Fn(&Vector3<f64>) -> Vector3<f64>>(f: F, x: &Vector3<f64>) -> Matrix3<f64> {
        let mut jac = Matrix3::zeros();
        for i in 0..3 {
            let mut xp = *x;
            let mut xm = *x;
            xp[i] += H;
            xm[i] -= H;
            jac.set_column(i, &((f(&xp) - f(&xm)) / (2.0 * H)));
        }
        jac
    }

    #[rstest]
    #[case(Vector3::new(0.0, 0.0, 0.0))]
    #[case(Vector3::new(0.3, -0.7, 1.2))]
    #[case(Vector3::new(-2.0, 1.1, -0.4))]
    fn rotation_composition(#[case] euler: Vector3<f64>) {
        let r = rotation_matrix_xyz(&euler);
        assert!((r * r.transpose() - Matrix3::identity()).norm() < 1.0E-12);
        assert!((r.determinant() - 1.0).abs() < 1.0E-12);

        assert_eq!(rotation_matrix_xyz(&Vector3::zeros()), Matrix3::identity());
    }

    #[rstest]
    #[case(Vector3::new(0.0, 0.0, 0.0))]
    #[case(Vector3::new(0.3, -0.7, 1.2))]
    #[case(Vector3::new(-2.0, 1.1, -0.4))]
    fn euler_rates_mapping_inverse(#[case] euler: Vector3<f64>) {
        let h = body_rates_to_euler_rates(&euler);
        let e = euler_rates_to_body_rates(&euler);
        assert!((h * e - Matrix3::identity()).norm() < 1.0E-12);
    }

    #[rstest]
    #[case(Vector3::new(0.3, -0.7, 1.2))]
    #[case(Vector3::new(-2.0, 1.1, -0.4))]
    fn body_rates_definition(#[case] euler: Vector3<f64>) {
        // R^T dR/dt = [ω]x, with ω = E θ'
        let rates = Vector3::new(0.4, -1.3, 0.8);
        let omega = euler_rates_to_body_rates(&euler) * rates;

        let r = rotation_matrix_xyz(&euler);
        let r_dot = (rotation_matrix_xyz(&(euler + rates * H))
            - rotation_matrix_xyz(&(euler - rates * H)))
            / (2.0 * H);

        let skew = r.transpose() * r_dot;
        assert!((skew - omega.cross_matrix()).norm() < 1.0E-8);
    }

    #[rstest]
    #[case(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 3.0))]
    #[case(Vector3::new(0.3, -0.7, 1.2), Vector3::new(-0.5, 0.1, 2.0))]
    #[case(Vector3::new(-2.0, 1.1, -0.4), Vector3::new(3.0, -1.0, 0.2))]
    fn analytical_jacobians(#[case] euler: Vector3<f64>, #[case] w: Vector3<f64>) {
        let jac = euler_rates_jacobian(&euler, &w);

        let expected = numdiff(|e| body_rates_to_euler_rates(e) * w, &euler);
        let d_theta = jac.fixed_view::<3, 3>(0, 0).into_owned();
        assert!((d_theta - expected).norm() < 1.0E-7, "{} {}", d_theta, expected);

        let expected = numdiff(|w| body_rates_to_euler_rates(&euler) * w, &w);
        let d_omega = jac.fixed_view::<3, 3>(0, 3).into_owned();
        assert!((d_omega - expected).norm() < 1.0E-7);

        let d_pos = rotated_velocity_jacobian(&euler, &w);
        let expected = numdiff(|e| rotation_matrix_xyz(e) * w, &euler);
        assert!((d_pos - expected).norm() < 1.0E-7, "{} {}", d_pos, expected);
    }
}
