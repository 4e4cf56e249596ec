//! SAAF discrete-ordinates transport: unknown numbering, cross sections, assembly of the
//! per-unknown systems, source construction and the source/power iterations.

pub mod assembler;
pub mod index_map;
pub mod interface;
pub mod iteration;
pub mod material;
pub mod penalty;
pub mod problem;
pub mod quadrature;
pub mod reflective;
pub mod setup;
pub mod source;

pub use index_map::IndexMap;
pub use iteration::{GenerationRecord, IterationHistory};
pub use material::{Material, MaterialLibrary};
pub use problem::{SolveReport, TransportProblem};
pub use quadrature::AngularQuadrature;
pub use reflective::{ExplicitReflection, ImplicitReflection, ReflectiveStrategy};
pub use setup::TransportSetup;
