use crate::cfg::RegularizationOpts;

/// Levenberg Marquardt like schedule of the control hessian regularization µ:
/// µ grows (faster and faster) on consecutive failures and decays on success,
/// eventually dropping to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Regularization {
    mu: f64,
    delta: f64,
    opts: RegularizationOpts,
}

impl Regularization {
    pub fn new(opts: RegularizationOpts) -> Self {
        Self {
            mu: opts.initial,
            delta: 1.0,
            opts,
        }
    }

    /// Current regularization
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Increases µ, saturating at the ceiling.
    /// Returns false when µ was already saturated.
    pub fn increase(&mut self) -> bool {
        if self.mu >= self.opts.max {
            return false;
        }
        self.delta = (self.delta * self.opts.factor).max(self.opts.factor);
        self.mu = (self.mu * self.delta).max(self.opts.min).min(self.opts.max);
        true
    }

    /// Decreases µ, dropping it entirely below the minimum.
    pub fn decrease(&mut self) {
        self.delta = (self.delta / self.opts.factor).min(1.0 / self.opts.factor);
        let mu = self.mu * self.delta;
        self.mu = if mu > self.opts.min { mu } else { 0.0 };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn schedule() {
        let opts = RegularizationOpts::default();
        let mut reg = Regularization::new(opts);
        assert_eq!(reg.mu(), opts.initial);

        let mut previous = reg.mu();
        let mut attempts = 0;
        while reg.increase() {
            assert!(reg.mu() > previous);
            previous = reg.mu();
            attempts += 1;
            assert!(attempts < 100, "regularization should saturate quickly");
        }
        assert_eq!(reg.mu(), opts.max);

        // decays back to zero
        for _ in 0..100 {
            reg.decrease();
        }
        assert_eq!(reg.mu(), 0.0);

        // and recovers from zero
        assert!(reg.increase());
        assert_eq!(reg.mu(), opts.min);
    }

    #[test]
    fn ceiling_is_reached() {
        let opts = RegularizationOpts {
            initial: 1.0,
            min: 1.0E-6,
            max: 50.0,
            factor: 10.0,
        };

        let mut reg = Regularization::new(opts);

        assert!(reg.increase());
        assert_eq!(reg.mu(), 10.0);

        // 1000 gets clamped, the ceiling itself is usable
        assert!(reg.increase());
        assert_eq!(reg.mu(), 50.0);

        assert!(!reg.increase());
        assert_eq!(reg.mu(), 50.0);
    }
}
