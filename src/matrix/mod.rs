//! Matrix module: sparsity patterns and CSR matrices.

pub mod sparse;
pub use sparse::{CsrMatrix, DynamicSparsityPattern, SparseMatrix, SparsityPattern};
