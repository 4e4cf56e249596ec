//! Engine configuration.

pub mod options;
pub use options::{Discretization, PcOptions, ReflectiveMode, TransportConfig};
