//! Core traits and their implementations for dense and vector types.

pub mod traits;
pub mod wrappers;

pub use traits::{Diagonal, InnerProduct, MatVec};
