use std::fmt;
use thiserror::Error;

// Linear-algebra errors raised by the Krylov solvers and preconditioners.

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
    #[error("indefinite preconditioner detected (beta < 0)")]
    IndefinitePreconditioner,
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("solver breakdown: {0}")]
    Breakdown(&'static str),
    #[error("entry ({row}, {col}) is not in the sparsity pattern")]
    NotInPattern { row: usize, col: usize },
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("preconditioner used before setup")]
    NotSetUp,
}

/// Which level of the two-level iteration gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationStage {
    /// Source iteration over scattering.
    Inner,
    /// Power iteration over fission generations.
    Outer,
}

impl fmt::Display for IterationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationStage::Inner => write!(f, "source iteration"),
            IterationStage::Outer => write!(f, "power iteration"),
        }
    }
}

/// Errors raised by the transport engine.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("boundary {boundary} is not reflective")]
    InvalidBoundary { boundary: usize },
    #[error("size mismatch for {what}: expected {expected}, found {found}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("system matrices are already assembled")]
    AlreadyAssembled,
    #[error("system matrices have not been assembled")]
    NotAssembled,
    #[error("{stage} did not converge after {iterations} iterations (last error {error:e})")]
    NotConverged {
        stage: IterationStage,
        iterations: usize,
        error: f64,
    },
    #[error("assembly failed for unknown {unknown}: {source}")]
    Assembly {
        unknown: usize,
        #[source]
        source: KError,
    },
    #[error("linear solve failed for unknown {unknown}: {source}")]
    LinearSolve {
        unknown: usize,
        #[source]
        source: KError,
    },
    #[error("linear solve for unknown {unknown} stalled after {iterations} iterations (residual {residual:e})")]
    LinearSolveStalled {
        unknown: usize,
        iterations: usize,
        residual: f64,
    },
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
