use nalgebra::{DMatrix, SMatrix, SVector};

/// Solves `A X = B` with A symmetric positive definite, by Cholesky factorization.
/// Returns None when A is not positive definite (or dimensions do not match).
/// Only the lower triangle of A is read.
pub fn spd_solve(a: DMatrix<f64>, b: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if a.nrows() != a.ncols() || a.nrows() != b.nrows() {
        return None;
    }
    a.cholesky().map(|chol| chol.solve(b))
}

/// Symmetric part of a square matrix
pub fn symmetrize<const N: usize>(m: &SMatrix<f64, N, N>) -> SMatrix<f64, N, N> {
    (m + m.transpose()) * 0.5
}

/// True if all components are finite
pub fn is_finite<const N: usize>(v: &SVector<f64, N>) -> bool {
    v.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::{Matrix2, Matrix3};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn random_spd<const N: usize>(rng: &mut SmallRng) -> SMatrix<f64, N, N> {
        let a = SMatrix::<f64, N, N>::from_fn(|_, _| rng.random_range(-1.0..1.0));
        a * a.transpose() + SMatrix::<f64, N, N>::identity() * 0.1
    }

    #[test]
    fn cholesky_matches_inverse() {
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..20 {
            let a = random_spd::<9>(&mut rng);
            let a = DMatrix::from_column_slice(9, 9, a.as_slice());
            let b = DMatrix::from_fn(9, 2, |_, _| rng.random_range(-1.0..1.0));

            let x = spd_solve(a.clone(), &b).unwrap();
            let expected = a.try_inverse().unwrap() * b;

            let err = (x - &expected).norm() / expected.norm();
            assert!(err < 1.0E-8, "relative error {}", err);
        }
    }

    #[test]
    fn indefinite() {
        let a = Matrix2::new(1.0, 0.0, 0.0, -1.0);
        let a = DMatrix::from_column_slice(2, 2, a.as_slice());
        assert!(spd_solve(a, &DMatrix::identity(2, 2)).is_none());

        let a = DMatrix::<f64>::identity(3, 3);
        let b = DMatrix::<f64>::zeros(2, 1);
        assert!(spd_solve(a, &b).is_none());
    }

    #[test]
    fn symmetric_part() {
        let m = Matrix3::new(1.0, 2.0, 0.0, 0.0, 1.0, 4.0, 2.0, 0.0, 1.0);
        let s = symmetrize(&m);
        assert_eq!(s, s.transpose());
        assert_eq!(s[(0, 1)], 1.0);
    }
}
