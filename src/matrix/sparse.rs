// Sparsity patterns and CSR matrices with in-place block assembly.

use std::collections::BTreeSet;
use std::sync::Arc;

use faer::Mat;
use num_traits::Float;

use crate::core::traits::{Diagonal, MatVec};
use crate::error::KError;

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

/// Row-wise set of couplings, filled before the pattern is frozen.
#[derive(Debug, Clone)]
pub struct DynamicSparsityPattern {
    rows: Vec<BTreeSet<usize>>,
}

impl DynamicSparsityPattern {
    pub fn new(n: usize) -> Self {
        Self { rows: vec![BTreeSet::new(); n] }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn add(&mut self, row: usize, col: usize) {
        self.rows[row].insert(col);
    }

    /// Couple every entry of `rows` with every entry of `cols`.
    pub fn add_entries(&mut self, rows: &[usize], cols: &[usize]) {
        for &i in rows {
            self.rows[i].extend(cols.iter().copied());
        }
    }

    /// Freeze into compressed row storage. Diagonal entries are always present.
    pub fn compress(mut self) -> SparsityPattern {
        let n = self.rows.len();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.insert(i);
            col_idx.extend(row.iter().copied());
            row_ptr.push(col_idx.len());
        }
        SparsityPattern { n, row_ptr, col_idx }
    }
}

/// Frozen square CSR structure, shared by every matrix built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsityPattern {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl SparsityPattern {
    pub fn n_rows(&self) -> usize {
        self.n
    }

    pub fn n_nonzero(&self) -> usize {
        self.col_idx.len()
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Position of `(row, col)` in the value array, if the entry exists.
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row(row)
            .binary_search(&col)
            .ok()
            .map(|offset| start + offset)
    }

    /// Row bandwidth: max |i - j| over stored entries.
    pub fn bandwidth(&self) -> usize {
        (0..self.n)
            .flat_map(|i| self.row(i).iter().map(move |&j| i.abs_diff(j)))
            .max()
            .unwrap_or(0)
    }
}

/// CSR matrix whose structure is fixed by a shared [`SparsityPattern`].
///
/// Clones share their values until one of them is written to.
#[derive(Debug, Clone)]
pub struct CsrMatrix<T> {
    pattern: Arc<SparsityPattern>,
    values: Arc<Vec<T>>,
}

impl<T: Float> CsrMatrix<T> {
    /// Zero matrix on `pattern`.
    pub fn new(pattern: Arc<SparsityPattern>) -> Self {
        let values = Arc::new(vec![T::zero(); pattern.n_nonzero()]);
        Self { pattern, values }
    }

    /// Build a CSR from raw row‐ptr, col‐idx, and values. Column indices must be sorted per row.
    pub fn from_csr(n: usize, row_ptr: Vec<usize>, col_idx: Vec<usize>, values: Vec<T>) -> Self {
        assert_eq!(row_ptr.len(), n + 1, "row_ptr must have n + 1 entries");
        assert_eq!(col_idx.len(), values.len(), "one value per stored column index");
        let pattern = Arc::new(SparsityPattern { n, row_ptr, col_idx });
        Self { pattern, values: Arc::new(values) }
    }

    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let range = self.pattern.row_ptr[i]..self.pattern.row_ptr[i + 1];
        (&self.pattern.col_idx[range.clone()], &self.values[range])
    }

    /// A[row, col] += value.
    pub fn add(&mut self, row: usize, col: usize, value: T) -> Result<(), KError> {
        let pos = self
            .pattern
            .find(row, col)
            .ok_or(KError::NotInPattern { row, col })?;
        let values = Arc::make_mut(&mut self.values);
        values[pos] = values[pos] + value;
        Ok(())
    }

    /// True when both matrices read the same value storage.
    pub fn shares_values_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// Scatter a dense local block: A[rows[i], cols[j]] += local[(i, j)].
    pub fn add_block(&mut self, rows: &[usize], cols: &[usize], local: &Mat<T>) -> Result<(), KError> {
        if local.nrows() != rows.len() {
            return Err(KError::DimensionMismatch { expected: rows.len(), found: local.nrows() });
        }
        if local.ncols() != cols.len() {
            return Err(KError::DimensionMismatch { expected: cols.len(), found: local.ncols() });
        }
        for (i, &gi) in rows.iter().enumerate() {
            for (j, &gj) in cols.iter().enumerate() {
                let v = local[(i, j)];
                if v != T::zero() {
                    self.add(gi, gj, v)?;
                }
            }
        }
        Ok(())
    }

    /// A[row, col], zero when the entry is not stored.
    pub fn get(&self, row: usize, col: usize) -> T {
        self.pattern
            .find(row, col)
            .map(|pos| self.values[pos])
            .unwrap_or_else(T::zero)
    }

    /// Maximum absolute column sum.
    pub fn l1_norm(&self) -> T {
        let mut col_sums = vec![T::zero(); self.pattern.n];
        for (&j, &v) in self.pattern.col_idx.iter().zip(self.values.iter()) {
            col_sums[j] = col_sums[j] + v.abs();
        }
        col_sums.into_iter().fold(T::zero(), T::max)
    }

    /// True when |A[i,j] - A[j,i]| <= tol * max(|A[i,j]|, 1) for every stored entry.
    pub fn is_symmetric(&self, tol: T) -> bool {
        (0..self.pattern.n).all(|i| {
            let (cols, vals) = self.row(i);
            cols.iter().zip(vals).all(|(&j, &v)| {
                let vt = self.get(j, i);
                (v - vt).abs() <= tol * v.abs().max(T::one())
            })
        })
    }
}

impl<T: Float> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.pattern.n
    }
    fn ncols(&self) -> usize {
        self.pattern.n
    }
    fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.pattern.n);
        assert_eq!(y.len(), self.pattern.n);
        for (i, yi) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(i);
            *yi = cols
                .iter()
                .zip(vals)
                .fold(T::zero(), |acc, (&j, &v)| acc + v * x[j]);
        }
    }
}

impl<T: Float> MatVec<Vec<T>> for CsrMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        self.spmv(x, y);
    }
}

impl<T: Float> Diagonal<T> for CsrMatrix<T> {
    fn diagonal(&self) -> Vec<T> {
        (0..self.pattern.n).map(|i| self.get(i, i)).collect()
    }
}
