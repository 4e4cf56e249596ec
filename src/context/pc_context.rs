//! Preconditioner context and configuration for the per-unknown solves.
//!
//! This module defines the `PC` enum, which selects one of the point-relaxation preconditioners
//! and carries its parameters. A `PC` is turned into a ready-to-apply preconditioner for one
//! system matrix with [`PC::build`].
//!
//! # Example
//!
//! ```rust
//! use saafsn::context::pc_context::PC;
//! let pc = PC::Ssor { omega: 1.0 };
//! assert_eq!(pc.to_string(), "ssor(omega=1)");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{Identity, Jacobi, Preconditioner, Ssor};

/// Boxed preconditioner shared read-only by the solver threads.
pub type BoxedPc = Box<dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> + Send + Sync>;

/// Unified preconditioner selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PC {
    /// No preconditioning.
    None,
    /// Jacobi (diagonal scaling) preconditioner.
    Jacobi,
    /// Symmetric Successive Over-Relaxation (SSOR) preconditioner.
    ///
    /// - `omega`: relaxation factor in (0, 2).
    Ssor { omega: f64 },
}

impl Default for PC {
    fn default() -> Self {
        PC::Ssor { omega: 1.0 }
    }
}

impl PC {
    /// Instantiate and set up the preconditioner for `a`.
    pub fn build(&self, a: &CsrMatrix<f64>) -> Result<BoxedPc, KError> {
        let mut pc: BoxedPc = match *self {
            PC::None => Box::new(Identity),
            PC::Jacobi => Box::new(Jacobi::<f64>::new()),
            PC::Ssor { omega } => {
                if !(omega > 0.0 && omega < 2.0) {
                    return Err(KError::Breakdown("SSOR relaxation factor outside (0, 2)"));
                }
                Box::new(Ssor::new(omega))
            }
        };
        pc.setup(a)?;
        Ok(pc)
    }
}

impl fmt::Display for PC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PC::None => write!(f, "none"),
            PC::Jacobi => write!(f, "jacobi"),
            PC::Ssor { omega } => write!(f, "ssor(omega={omega})"),
        }
    }
}
