//! Tensor-product Lagrange elements on the unit hyper-cube.

use crate::error::TransportError;

/// 1-D Lagrange polynomials of degree `p` on equispaced nodes of `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Lagrange1D {
    nodes: Vec<f64>,
}

impl Lagrange1D {
    pub fn new(p: usize) -> Self {
        let nodes = (0..=p).map(|i| i as f64 / p as f64).collect();
        Self { nodes }
    }

    pub fn degree(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn value(&self, i: usize, x: f64) -> f64 {
        let xi = self.nodes[i];
        self.nodes
            .iter()
            .enumerate()
            .filter(|&(m, _)| m != i)
            .map(|(_, &xm)| (x - xm) / (xi - xm))
            .product()
    }

    pub fn derivative(&self, i: usize, x: f64) -> f64 {
        let xi = self.nodes[i];
        let mut sum = 0.0;
        for (k, &xk) in self.nodes.iter().enumerate() {
            if k == i {
                continue;
            }
            let mut term = 1.0 / (xi - xk);
            for (m, &xm) in self.nodes.iter().enumerate() {
                if m != i && m != k {
                    term *= (x - xm) / (xi - xm);
                }
            }
            sum += term;
        }
        sum
    }
}

/// `Q_p` element: products of 1-D Lagrange polynomials, local index with x fastest.
#[derive(Debug, Clone)]
pub struct TensorLagrange<const DIM: usize> {
    basis: Lagrange1D,
}

impl<const DIM: usize> TensorLagrange<DIM> {
    pub fn new(p: usize) -> Result<Self, TransportError> {
        if p == 0 {
            return Err(TransportError::InvalidInput("Lagrange elements need degree >= 1".into()));
        }
        Ok(Self { basis: Lagrange1D::new(p) })
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn dofs_per_cell(&self) -> usize {
        (self.degree() + 1).pow(DIM as u32)
    }

    /// Per-axis node indices of local shape function `i`.
    pub fn node_multi_index(&self, i: usize) -> [usize; DIM] {
        let n = self.degree() + 1;
        let mut idx = [0; DIM];
        let mut rest = i;
        for c in idx.iter_mut() {
            *c = rest % n;
            rest /= n;
        }
        idx
    }

    /// Support point of shape function `i` in unit-cell coordinates.
    pub fn unit_support_point(&self, i: usize) -> [f64; DIM] {
        self.node_multi_index(i).map(|k| self.basis.nodes()[k])
    }

    pub fn shape_value(&self, i: usize, x: &[f64; DIM]) -> f64 {
        let idx = self.node_multi_index(i);
        (0..DIM).map(|a| self.basis.value(idx[a], x[a])).product()
    }

    /// Gradient with respect to unit-cell coordinates.
    pub fn shape_grad(&self, i: usize, x: &[f64; DIM]) -> [f64; DIM] {
        let idx = self.node_multi_index(i);
        let mut grad = [0.0; DIM];
        for (a, g) in grad.iter_mut().enumerate() {
            *g = (0..DIM)
                .map(|b| if a == b { self.basis.derivative(idx[b], x[b]) } else { self.basis.value(idx[b], x[b]) })
                .product();
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::Rng;

    #[test]
    fn partition_of_unity_and_zero_gradient_sum() {
        let mut rng = rand::thread_rng();
        for p in 1..=3 {
            let fe = TensorLagrange::<2>::new(p).unwrap();
            for _ in 0..10 {
                let x = [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)];
                let sum: f64 = (0..fe.dofs_per_cell()).map(|i| fe.shape_value(i, &x)).sum();
                assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
                for a in 0..2 {
                    let g: f64 = (0..fe.dofs_per_cell()).map(|i| fe.shape_grad(i, &x)[a]).sum();
                    assert_abs_diff_eq!(g, 0.0, epsilon = 1e-11);
                }
            }
        }
    }

    #[test]
    fn kronecker_property_at_support_points() {
        let fe = TensorLagrange::<3>::new(2).unwrap();
        assert_eq!(fe.dofs_per_cell(), 27);
        for i in 0..27 {
            let x = fe.unit_support_point(i);
            for j in 0..27 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(fe.shape_value(j, &x), expected, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let basis = Lagrange1D::new(3);
        let h = 1e-6;
        for i in 0..4 {
            let fd = (basis.value(i, 0.3 + h) - basis.value(i, 0.3 - h)) / (2.0 * h);
            assert_abs_diff_eq!(basis.derivative(i, 0.3), fd, epsilon = 1e-6);
        }
        assert!(TensorLagrange::<1>::new(0).is_err());
    }
}
