use nalgebra::{SVector, Vector1, Vector2, Vector4};
use rstest::*;

use crate::{
    prelude::{Error, LinearSystem, RbdLinearizer, SystemLinearizer},
    tests::{init_logger, FloatingBody, Pendulum, TwoLinkArm},
};

#[fixture]
fn build_floating_state() -> SVector<f64, 14> {
    SVector::<f64, 14>::from_column_slice(&[
        0.3, -0.4, 0.7, // θ
        1.0, -2.0, 0.5, // p
        0.1, // q
        0.5, -0.2, 0.8, // ω
        1.5, 0.3, -0.7, // v
        -0.3, // qd
    ])
}

#[rstest]
#[case(Vector4::new(0.3, -0.5, 0.1, 0.2), Vector2::new(1.0, -0.5))]
#[case(Vector4::new(-1.2, 1.0, -2.0, 0.7), Vector2::new(0.0, 3.0))]
#[case(Vector4::zeros(), Vector2::zeros())]
fn fixed_base_matches_generic(#[case] x: Vector4<f64>, #[case] u: Vector2<f64>) {
    init_logger();

    let mut rbd = RbdLinearizer::new(TwoLinkArm::default(), true).unwrap();
    let mut generic = SystemLinearizer::new(TwoLinkArm::default(), true);

    assert!(!rbd.floating_base());

    let a_rbd = rbd.derivative_state(&x, &u, 0.0).unwrap();
    let a_gen = generic.derivative_state(&x, &u, 0.0).unwrap();
    assert_eq!(a_rbd, a_gen, "state jacobians should be identical");

    // M(q)⁻¹ vs numerical differentiation
    let b_rbd = rbd.derivative_control(&x, &u, 0.0).unwrap();
    let b_gen = generic.derivative_control(&x, &u, 0.0).unwrap();

    assert!(b_rbd.rows(0, 2).iter().all(|b| *b == 0.0));
    assert!(
        (b_rbd - b_gen).abs().max() < 1.0E-6,
        "control jacobian error: {}",
        (b_rbd - b_gen).abs().max()
    );
}

#[test]
fn floating_base_kinematics() {
    init_logger();

    let x = build_floating_state();
    let u = Vector1::new(0.4);

    let mut rbd = RbdLinearizer::new(FloatingBody::default(), true).unwrap();
    let mut generic = SystemLinearizer::new(FloatingBody::default(), true);

    assert!(rbd.floating_base());

    let a_rbd = rbd.derivative_state(&x, &u, 0.0).unwrap();
    let a_gen = generic.derivative_state(&x, &u, 0.0).unwrap();

    for i in 0..14 {
        for j in 0..14 {
            let err = (a_rbd[(i, j)] - a_gen[(i, j)]).abs();
            assert!(err < 1.0E-6, "A({}, {}): {} vs {}", i, j, a_rbd[(i, j)], a_gen[(i, j)]);
        }
    }

    let b_rbd = rbd.derivative_control(&x, &u, 0.0).unwrap();
    let b_gen = generic.derivative_control(&x, &u, 0.0).unwrap();

    assert!((b_rbd[13] - 2.0).abs() < 1.0E-12, "1 / joint mass");
    assert!((b_rbd - b_gen).abs().max() < 1.0E-6);
}

#[test]
fn mass_matrix_not_positive_definite() {
    init_logger();

    let pendulum = Pendulum {
        inertia: -0.5,
        ..Default::default()
    };

    let mut rbd = RbdLinearizer::new(pendulum, true).unwrap();

    assert_eq!(
        rbd.derivative_control(&Vector2::new(0.1, 0.0), &Vector1::zeros(), 0.0),
        Err(Error::MassMatrixNotPositiveDefinite)
    );

    assert!(rbd.linearize(&Vector2::new(0.1, 0.0), &Vector1::zeros(), 0.0).is_err());
}

#[test]
fn dimension_mismatch() {
    init_logger();

    let pendulum = Pendulum {
        joints: 2,
        ..Default::default()
    };

    assert!(matches!(
        RbdLinearizer::new(pendulum, true),
        Err(Error::DimensionMismatch {
            expected: 4,
            got: 2
        })
    ));
}
