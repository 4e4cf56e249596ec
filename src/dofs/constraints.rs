//! Homogeneous linear constraints `x_c = Σ w_j x_j` between degrees of freedom.
//!
//! Local contributions touching a constrained dof are redistributed onto the dofs it depends on
//! while copying into the global system; after the solve, `distribute` restores the constrained
//! values. Constrained rows keep only a positive diagonal so the per-unknown matrices stay
//! non-singular.

use std::collections::BTreeMap;

use faer::Mat;

use crate::error::{KError, TransportError};
use crate::matrix::CsrMatrix;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffineConstraints {
    lines: BTreeMap<usize, Vec<(usize, f64)>>,
}

impl AffineConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `dof` to the weighted sum `entries`. Chains of constraints are rejected.
    pub fn add_line(&mut self, dof: usize, entries: Vec<(usize, f64)>) -> Result<(), TransportError> {
        if self.lines.contains_key(&dof) {
            return Err(TransportError::InvalidInput(format!("dof {dof} is already constrained")));
        }
        if let Some(&(j, _)) = entries.iter().find(|(j, _)| *j == dof || self.lines.contains_key(j)) {
            return Err(TransportError::InvalidInput(format!("dof {dof} cannot depend on constrained dof {j}")));
        }
        if self.lines.values().any(|line| line.iter().any(|&(j, _)| j == dof)) {
            return Err(TransportError::InvalidInput(format!("dof {dof} is referenced by another constraint")));
        }
        self.lines.insert(dof, entries);
        Ok(())
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.lines.contains_key(&dof)
    }

    pub fn n_constraints(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Global dofs (with weights) that carry the contributions of `dof`.
    pub fn resolve(&self, dof: usize) -> Vec<(usize, f64)> {
        match self.lines.get(&dof) {
            Some(line) => line.clone(),
            None => vec![(dof, 1.0)],
        }
    }

    /// Add `local` into `matrix` at (`rows`, `cols`), eliminating constrained dofs.
    pub fn distribute_local_to_global(
        &self,
        local: &Mat<f64>,
        rows: &[usize],
        cols: &[usize],
        matrix: &mut CsrMatrix<f64>,
    ) -> Result<(), KError> {
        if self.lines.is_empty() {
            return matrix.add_block(rows, cols, local);
        }
        for (i, &r) in rows.iter().enumerate() {
            let row_targets = self.resolve(r);
            for (j, &c) in cols.iter().enumerate() {
                let v = local[(i, j)];
                if v == 0.0 {
                    continue;
                }
                for &(gr, wr) in &row_targets {
                    for (gc, wc) in self.resolve(c) {
                        matrix.add(gr, gc, wr * wc * v)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Add `local` into `rhs` at `dofs`, eliminating constrained dofs.
    pub fn distribute_local_to_global_vector(&self, local: &[f64], dofs: &[usize], rhs: &mut [f64]) {
        for (&v, &d) in local.iter().zip(dofs) {
            match self.lines.get(&d) {
                Some(line) => {
                    for &(j, w) in line {
                        rhs[j] += w * v;
                    }
                }
                None => rhs[d] += v,
            }
        }
    }

    /// Give every constrained row a diagonal equal to the mean unconstrained diagonal.
    pub fn set_constrained_diagonals(&self, matrix: &mut CsrMatrix<f64>) -> Result<(), KError> {
        if self.lines.is_empty() {
            return Ok(());
        }
        let n = matrix.pattern().n_rows();
        let free: Vec<f64> = (0..n)
            .filter(|i| !self.is_constrained(*i))
            .map(|i| matrix.get(i, i).abs())
            .collect();
        let mean = if free.is_empty() { 1.0 } else { free.iter().sum::<f64>() / free.len() as f64 };
        let mean = if mean > 0.0 { mean } else { 1.0 };
        for &c in self.lines.keys() {
            let current = matrix.get(c, c);
            matrix.add(c, c, mean - current)?;
        }
        Ok(())
    }

    /// Overwrite constrained entries of `x` from the dofs they depend on.
    pub fn distribute(&self, x: &mut [f64]) {
        for (&c, line) in &self.lines {
            x[c] = line.iter().map(|&(j, w)| w * x[j]).sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DynamicSparsityPattern;
    use std::sync::Arc;

    fn full_matrix(n: usize) -> CsrMatrix<f64> {
        let mut dsp = DynamicSparsityPattern::new(n);
        let all: Vec<usize> = (0..n).collect();
        dsp.add_entries(&all, &all);
        CsrMatrix::new(Arc::new(dsp.compress()))
    }

    #[test]
    fn hanging_dof_is_condensed_and_restored() {
        let mut constraints = AffineConstraints::new();
        constraints.add_line(1, vec![(0, 0.5), (2, 0.5)]).unwrap();
        let mut a = full_matrix(3);
        let local = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { -1.0 });
        constraints.distribute_local_to_global(&local, &[0, 1], &[0, 1], &mut a).unwrap();
        // row/col 1 is spread onto 0 and 2 with weight 1/2
        assert_eq!(a.get(0, 0), 2.0 - 0.5 - 0.5 + 0.5);
        assert_eq!(a.get(0, 2), -0.5 + 0.5);
        assert_eq!(a.get(2, 2), 0.5);
        assert_eq!(a.get(1, 1), 0.0);
        constraints.set_constrained_diagonals(&mut a).unwrap();
        assert!(a.get(1, 1) > 0.0);

        let mut rhs = vec![0.0; 3];
        constraints.distribute_local_to_global_vector(&[1.0, 4.0], &[0, 1], &mut rhs);
        assert_eq!(rhs, vec![3.0, 0.0, 2.0]);

        let mut x = vec![1.0, 99.0, 3.0];
        constraints.distribute(&mut x);
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn chained_lines_are_rejected() {
        let mut constraints = AffineConstraints::new();
        constraints.add_line(1, vec![(0, 1.0)]).unwrap();
        assert!(constraints.add_line(2, vec![(1, 1.0)]).is_err());
        assert!(constraints.add_line(0, vec![(3, 1.0)]).is_err());
        assert!(constraints.add_line(1, vec![(3, 1.0)]).is_err());
        assert_eq!(constraints.n_constraints(), 1);
    }
}
