//! Finite-element building blocks: Gauss quadrature, tensor Lagrange bases and the
//! cell/face value tables evaluated from them.

pub mod lagrange;
pub mod quadrature;
pub mod values;

pub use lagrange::{Lagrange1D, TensorLagrange};
pub use quadrature::{gauss_legendre, QGauss};
pub use values::{CellValues, FaceValues};
