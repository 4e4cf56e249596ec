use std::fmt;
use bitflags::bitflags;
use crate::preconditioner::Preconditioner;
use crate::preconditioner::jacobi::inverse_diagonal;
use crate::matrix::CsrMatrix;
use crate::error::KError;
use num_traits::Float;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MatSorType: u32 {
        const APPLY_LOWER              = 0b0001; // forward Gauss–Seidel
        const APPLY_UPPER              = 0b0010; // backward
        const SYMMETRIC_SWEEP          = Self::APPLY_LOWER.bits() | Self::APPLY_UPPER.bits();
    }
}

/// Successive over-relaxation sweeps on a CSR matrix.
///
/// - `APPLY_LOWER`:     z = (D/ω + L)⁻¹ r
/// - `APPLY_UPPER`:     z = (D/ω + U)⁻¹ r
/// - `SYMMETRIC_SWEEP`: z = (2 − ω) (D/ω + U)⁻¹ (D/ω) (D/ω + L)⁻¹ r, the SSOR preconditioner,
///   symmetric positive definite whenever A is and 0 < ω < 2.
#[derive(Debug, Clone)]
pub struct Sor<T> {
    pub sym:      MatSorType,
    pub omega:    T,
    pub inv_diag: Vec<T>,
    pub a:        Option<CsrMatrix<T>>,
}

impl<T: Float> Sor<T> {
    pub fn new(omega: T, sym: MatSorType) -> Self {
        Self { sym, omega, inv_diag: Vec::new(), a: None }
    }
    pub fn omega(&self) -> T { self.omega }

    fn forward(&self, a: &CsrMatrix<T>, r: &[T], y: &mut [T]) {
        for i in 0..r.len() {
            let (cols, vals) = a.row(i);
            let mut sigma = T::zero();
            for (&j, &v) in cols.iter().zip(vals) {
                if j < i {
                    sigma = sigma + v * y[j];
                }
            }
            y[i] = (r[i] - sigma) * self.inv_diag[i] * self.omega;
        }
    }

    fn backward(&self, a: &CsrMatrix<T>, r: &[T], y: &mut [T]) {
        for i in (0..r.len()).rev() {
            let (cols, vals) = a.row(i);
            let mut sigma = T::zero();
            for (&j, &v) in cols.iter().zip(vals) {
                if j > i {
                    sigma = sigma + v * y[j];
                }
            }
            y[i] = (r[i] - sigma) * self.inv_diag[i] * self.omega;
        }
    }
}

impl<T> fmt::Display for Sor<T>
where
    T: Float + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SOR(omega={}, sym={:?})", self.omega, self.sym)
    }
}

impl<T> Preconditioner<CsrMatrix<T>, Vec<T>> for Sor<T>
where
    T: Float,
{
    fn setup(&mut self, a: &CsrMatrix<T>) -> Result<(), KError> {
        self.inv_diag = inverse_diagonal(a)?;
        // shares the value storage, no copy
        self.a = Some(a.clone());
        Ok(())
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        let a = self.a.as_ref().ok_or(KError::NotSetUp)?;
        if self.inv_diag.len() != x.len() {
            return Err(KError::DimensionMismatch { expected: self.inv_diag.len(), found: x.len() });
        }
        if self.sym.contains(MatSorType::SYMMETRIC_SWEEP) {
            let mut tmp = vec![T::zero(); x.len()];
            self.forward(a, x, &mut tmp);
            // scale by D/ω between the sweeps
            for (ti, &di) in tmp.iter_mut().zip(&self.inv_diag) {
                *ti = *ti / (di * self.omega);
            }
            self.backward(a, &tmp, y);
            let scale = T::one() + T::one() - self.omega;
            for yi in y.iter_mut() {
                *yi = *yi * scale;
            }
        } else if self.sym.contains(MatSorType::APPLY_LOWER) {
            self.forward(a, x, y);
        } else if self.sym.contains(MatSorType::APPLY_UPPER) {
            self.backward(a, x, y);
        } else {
            y.copy_from_slice(x);
        }
        Ok(())
    }
}
