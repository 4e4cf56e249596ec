//! Convergence tracking & tolerance checks for iterative solvers.

/// Stopping criteria & stats.
///
/// A solve has converged once `‖r‖ <= max(atol, rtol · ‖r₀‖)`.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Purely relative criterion, as used by the small dense tests.
    pub fn relative(rtol: T, max_iters: usize) -> Self {
        Self { rtol, atol: T::zero(), max_iters }
    }

    /// Purely absolute criterion.
    pub fn absolute(atol: T, max_iters: usize) -> Self {
        Self { rtol: T::zero(), atol, max_iters }
    }

    pub fn threshold(&self, res0_norm: T) -> T {
        self.atol.max(self.rtol * res0_norm)
    }

    /// Returns (should_stop, stats) given current `res_norm` and iteration `i`.
    pub fn check(
        &self,
        res_norm: T,
        res0_norm: T,
        i: usize,
    ) -> (bool, SolveStats<T>) {
        let converged = res_norm <= self.threshold(res0_norm);
        (
            converged || i >= self.max_iters,
            SolveStats {
                iterations: i,
                final_residual: res_norm,
                converged,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_on_budget_is_not_convergence() {
        let conv = Convergence::relative(1e-8, 3);
        let (stop, stats) = conv.check(1.0, 1.0, 3);
        assert!(stop);
        assert!(!stats.converged);
        let (stop, stats) = conv.check(1e-9, 1.0, 1);
        assert!(stop && stats.converged);
    }

    #[test]
    fn absolute_floor_dominates_tiny_initial_residual() {
        let conv = Convergence { rtol: 1e-12, atol: 1e-10, max_iters: 10 };
        assert_eq!(conv.threshold(1.0), 1e-10);
        assert_eq!(conv.threshold(1e4), 1e-8);
    }
}
