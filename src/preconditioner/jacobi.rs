// Jacobi preconditioner implementation

use crate::preconditioner::Preconditioner;
use crate::core::traits::Diagonal;
use crate::error::KError;
use num_traits::Float;

/// Jacobi preconditioner: M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Float> Jacobi<T> {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }
}

impl<T: num_traits::Float> Default for Jacobi<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Inverse diagonal of `a`, failing on the first zero pivot.
pub(crate) fn inverse_diagonal<M, T>(a: &M) -> Result<Vec<T>, KError>
where
    M: Diagonal<T>,
    T: Float,
{
    a.diagonal()
        .into_iter()
        .enumerate()
        .map(|(i, d)| if d != T::zero() { Ok(T::one() / d) } else { Err(KError::ZeroPivot(i)) })
        .collect()
}

impl<M, T> Preconditioner<M, Vec<T>> for Jacobi<T>
where
    M: Diagonal<T>,
    T: Float + Send + Sync,
{
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        self.inv_diag = inverse_diagonal(a)?;
        Ok(())
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        if self.inv_diag.len() != x.len() {
            return Err(KError::NotSetUp);
        }
        for ((yi, &xi), &di) in y.iter_mut().zip(x).zip(&self.inv_diag) {
            *yi = di * xi;
        }
        Ok(())
    }
}
