use crate::cfg::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Optimization algorithm
#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Algorithm {
    /// Iterative Linear Quadratic Gaussian: single shooting.
    /// Each candidate trajectory is obtained by a closed loop rollout
    /// of the nonlinear dynamics, trajectories are always dynamically consistent.
    #[default]
    ILQG,

    /// Gauss-Newton Multiple Shooting: the state trajectory is made
    /// of independent shooting nodes. Defects (gaps) between the nodes
    /// are part of the LQ approximation and closed by the linear update.
    /// Intermediate iterates may not be dynamically consistent.
    GNMS,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ILQG => write!(fmt, "iLQG"),
            Self::GNMS => write!(fmt, "GNMS"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ilqg" | "ilqr" => Ok(Self::ILQG),
            "gnms" => Ok(Self::GNMS),
            _ => Err(Error::UnknownAlgorithm),
        }
    }
}

/// Integration scheme used by the rollouts
#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntegratorType {
    /// Explicit Euler, fixed step
    Euler,
    /// Runge Kutta 4th order, fixed step
    #[default]
    RK4,
    /// Dormand Prince 5(4), adaptive step
    RK45,
}

impl std::fmt::Display for IntegratorType {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Euler => write!(fmt, "Euler"),
            Self::RK4 => write!(fmt, "RK4"),
            Self::RK45 => write!(fmt, "RK45"),
        }
    }
}

impl std::str::FromStr for IntegratorType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "rk4" => Ok(Self::RK4),
            "rk45" | "dopri5" => Ok(Self::RK45),
            _ => Err(Error::UnknownIntegrator),
        }
    }
}

/// Line search acceptance criterion
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AcceptanceCriterion {
    /// Any strict cost decrease is accepted
    #[default]
    SimpleImprovement,
    /// Strict decrease and sufficient decrease with respect to
    /// the cost change predicted by the LQ model
    Armijo,
}

impl std::fmt::Display for AcceptanceCriterion {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::SimpleImprovement => write!(fmt, "simple-improvement"),
            Self::Armijo => write!(fmt, "armijo"),
        }
    }
}

impl std::str::FromStr for AcceptanceCriterion {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "simple-improvement" => Ok(Self::SimpleImprovement),
            "armijo" => Ok(Self::Armijo),
            _ => Err(Error::UnknownAcceptanceCriterion),
        }
    }
}
