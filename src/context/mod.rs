//! Context module for the per-unknown linear solves.
//!
//! Contexts encapsulate algorithm selection, parameter management, and construction of the
//! solver/preconditioner pipeline for one system matrix.
//!
//! Modules:
//! - [`ksp_context`]: the `KspContext` struct, one Krylov solve configuration per matrix.
//! - [`pc_context`]: the `PC` preconditioner selector and its factory.
//!
//! # Example
//! ```rust,ignore
//! use saafsn::context::{KspContext, SolverKind, PC};
//! let ksp = KspContext::new(SolverKind::Pcg, matrix, PC::default(), conv)?;
//! let stats = ksp.solve_context(&rhs, &mut x)?;
//! ```
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::{KspContext, SolverKind};
pub mod pc_context;
pub use pc_context::{BoxedPc, PC};
