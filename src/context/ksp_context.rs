//! Factory for the Krylov solve of one transport unknown.
//!
//! This module provides the `KspContext` struct, which holds one system matrix together with its
//! set-up preconditioner, the Krylov method to use and the stopping criterion. Contexts are built
//! once after assembly and then solved against many right-hand sides; `solve_context` takes `&self`
//! so that the contexts of different unknowns can be solved from different threads.
//!
//! # Supported Solvers
//! - PCG (symmetric positive definite systems)
//! - BiCGStab (general non-symmetric systems)
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.

use serde::{Deserialize, Serialize};

use crate::context::pc_context::{BoxedPc, PC};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::{BiCgStabSolver, LinearSolver, PcgSolver};
use crate::utils::convergence::{Convergence, SolveStats};

/// Enum representing the available Krylov solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Preconditioned Conjugate Gradient (PCG)
    Pcg,
    /// BiConjugate Gradient Stabilized (BiCGStab)
    Bicgstab,
}

/// Context and configuration for a Krylov subspace solver.
pub struct KspContext {
    /// The type of Krylov solver to use
    pub kind: SolverKind,
    /// The system matrix
    pub a: CsrMatrix<f64>,
    /// Preconditioner, already set up for `a`
    pub pc: BoxedPc,
    /// Stopping criterion
    pub conv: Convergence<f64>,
}

impl KspContext {
    /// Take ownership of `a` and set up `pc` for it.
    pub fn new(kind: SolverKind, a: CsrMatrix<f64>, pc: PC, conv: Convergence<f64>) -> Result<Self, KError> {
        let pc = pc.build(&a)?;
        Ok(Self { kind, a, pc, conv })
    }

    /// Number of rows of the system matrix.
    pub fn n_dofs(&self) -> usize {
        self.a.pattern().n_rows()
    }

    /// Solve `A x = b`; `x` on entry is the initial guess.
    ///
    /// # Returns
    /// * `Ok(SolveStats)` when the solver stopped, converged or not
    /// * `Err(KError)` on breakdown or an indefinite operator
    pub fn solve_context(&self, b: &Vec<f64>, x: &mut Vec<f64>) -> Result<SolveStats<f64>, KError> {
        let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &*self.pc;
        match self.kind {
            SolverKind::Pcg => {
                let mut solver = PcgSolver::new(self.conv.clone());
                solver.solve(&self.a, Some(pc), b, x)
            }
            SolverKind::Bicgstab => {
                let mut solver = BiCgStabSolver::new(self.conv.clone());
                solver.solve(&self.a, Some(pc), b, x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DynamicSparsityPattern;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    /// 1-D Laplacian, tridiag(-1, 2, -1).
    fn laplacian(n: usize) -> CsrMatrix<f64> {
        let mut dsp = DynamicSparsityPattern::new(n);
        for i in 0..n {
            for j in i.saturating_sub(1)..(i + 2).min(n) {
                dsp.add(i, j);
            }
        }
        let mut a = CsrMatrix::new(Arc::new(dsp.compress()));
        for i in 0..n {
            a.add(i, i, 2.0).unwrap();
            if i > 0 {
                a.add(i, i - 1, -1.0).unwrap();
                a.add(i - 1, i, -1.0).unwrap();
            }
        }
        a
    }

    #[test]
    fn pcg_and_bicgstab_agree_on_laplacian() {
        let n = 20;
        let b = vec![1.0; n];
        let conv = Convergence { rtol: 1e-12, atol: 1e-14, max_iters: 200 };
        let mut solutions = Vec::new();
        for kind in [SolverKind::Pcg, SolverKind::Bicgstab] {
            let ksp = KspContext::new(kind, laplacian(n), PC::Ssor { omega: 1.0 }, conv.clone()).unwrap();
            let mut x = vec![0.0; n];
            let stats = ksp.solve_context(&b, &mut x).unwrap();
            assert!(stats.converged, "{kind:?} did not converge: {stats:?}");
            solutions.push(x);
        }
        // exact solution x_i = (i+1)(n-i)/2
        for i in 0..n {
            let exact = ((i + 1) * (n - i)) as f64 / 2.0;
            assert_abs_diff_eq!(solutions[0][i], exact, epsilon = 1e-8);
            assert_abs_diff_eq!(solutions[1][i], exact, epsilon = 1e-8);
        }
    }
}
