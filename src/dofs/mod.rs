//! Degree-of-freedom numbering, sparsity patterns and constraints.

pub mod constraints;
pub mod handler;

pub use constraints::AffineConstraints;
pub use handler::DofHandler;
