/// Relative perturbation of numerical differentiation: sqrt of the machine epsilon
pub const NUMDIFF_EPSILON: f64 = 1.490_116_119_384_765_6E-8;

/// Smallest step size adaptive integrators may reduce to [s]
pub const MIN_INTEGRATION_STEP: f64 = 1.0E-12;

/// Maximal number of attempted steps of adaptive integrators, per interval
pub const MAX_INTEGRATION_STEPS: usize = 100_000;

/// Adaptive step size: safety factor
pub const STEP_SAFETY_FACTOR: f64 = 0.9;

/// Adaptive step size: min. and max. scaling per step
pub const STEP_SCALING_BOUNDS: (f64, f64) = (0.2, 5.0);
