use crate::preconditioner::Preconditioner;
use crate::preconditioner::sor::{MatSorType, Sor};
use crate::matrix::CsrMatrix;
use crate::error::KError;
use num_traits::Float;

/// Symmetric Successive Over-Relaxation.
/// M = 1/(ω(2−ω)) (D + ωL) D⁻¹ (D + ωU)
#[derive(Debug, Clone)]
pub struct Ssor<T> {
    sweep: Sor<T>,
}

impl<T: Float> Ssor<T> {
    pub fn new(omega: T) -> Self {
        Self { sweep: Sor::new(omega, MatSorType::SYMMETRIC_SWEEP) }
    }

    pub fn omega(&self) -> T {
        self.sweep.omega()
    }
}

impl<T: Float> Preconditioner<CsrMatrix<T>, Vec<T>> for Ssor<T> {
    fn setup(&mut self, a: &CsrMatrix<T>) -> Result<(), KError> {
        self.sweep.setup(a)
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        self.sweep.apply(x, y)
    }
}
