//! saafsn: multigroup discrete-ordinates transport in self-adjoint angular flux form
//!
//! This crate discretizes the second-order SAAF transport equation with continuous or
//! discontinuous (interior-penalty) Lagrange elements on structured Cartesian meshes, assembles
//! one sparse system per (direction, group) unknown and solves fixed-source and k-eigenvalue
//! problems by source iteration nested in power iteration. The per-unknown systems are solved
//! with PETSc-style PC/KSP contexts (PCG or BiCGStab, Jacobi or SSOR) over CSR matrices.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod dofs;
pub mod error;
pub mod fe;
pub mod matrix;
pub mod mesh;
pub mod preconditioner;
pub mod solver;
pub mod transport;
pub mod utils;

// Re-exports for convenience
pub use config::{Discretization, PcOptions, ReflectiveMode, TransportConfig};
pub use context::{KspContext, PC, SolverKind};
pub use error::{IterationStage, KError, TransportError};
pub use matrix::{CsrMatrix, DynamicSparsityPattern, SparsityPattern};
pub use mesh::{FaceNeighbor, StructuredMesh};
pub use transport::{AngularQuadrature, IterationHistory, Material, TransportProblem};

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
