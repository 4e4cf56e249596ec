//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait and the point-relaxation implementations used by the
//! per-unknown transport solves: Jacobi, SOR sweeps and SSOR.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> { Ok(()) }
}

/// Identity preconditioner, z = r.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<M, T: Copy> Preconditioner<M, Vec<T>> for Identity {
    fn apply(&self, r: &Vec<T>, z: &mut Vec<T>) -> Result<(), KError> {
        z.copy_from_slice(r);
        Ok(())
    }
}

// Submodules for various preconditioners
pub mod jacobi;
pub mod sor;
pub mod ssor;

// Re-exports for convenience
pub use jacobi::Jacobi;
pub use sor::{MatSorType, Sor};
pub use ssor::Ssor;

/// Unified preconditioner selector.
pub use crate::context::pc_context::PC;
