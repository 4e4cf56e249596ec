//! Convergence bookkeeping and norms.

pub mod convergence;
pub mod norms;

pub use convergence::{Convergence, SolveStats};
