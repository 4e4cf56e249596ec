//! Discrete-ordinate direction sets.
//!
//! In 1-D a direction is the cosine `μ` with the x axis, in 2-D the projection of a unit vector
//! of the upper hemisphere onto the xy-plane, in 3-D the unit vector itself. Weights of the
//! built-in sets sum to 4π.

use std::f64::consts::PI;

use crate::error::TransportError;
use crate::fe::gauss_legendre;

#[derive(Debug, Clone, PartialEq)]
pub struct AngularQuadrature<const DIM: usize> {
    directions: Vec<[f64; DIM]>,
    weights: Vec<f64>,
    tensor_norms: Vec<f64>,
}

impl<const DIM: usize> AngularQuadrature<DIM> {
    /// Caller-supplied directions and weights.
    pub fn new(directions: Vec<[f64; DIM]>, weights: Vec<f64>) -> Result<Self, TransportError> {
        if directions.is_empty() {
            return Err(TransportError::InvalidInput("empty direction set".into()));
        }
        if weights.len() != directions.len() {
            return Err(TransportError::SizeMismatch {
                what: "quadrature weights",
                expected: directions.len(),
                found: weights.len(),
            });
        }
        for (d, omega) in directions.iter().enumerate() {
            let len2: f64 = omega.iter().map(|x| x * x).sum();
            if !(len2 > 0.0 && len2 <= 1.0 + 1e-12) {
                return Err(TransportError::InvalidInput(format!(
                    "direction {d} has length {} outside (0, 1]",
                    len2.sqrt()
                )));
            }
        }
        if let Some(w) = weights.iter().find(|w| !(**w > 0.0)) {
            return Err(TransportError::InvalidInput(format!("non-positive quadrature weight {w}")));
        }
        // ‖Ω Ωᵀ‖_F = |Ω|²
        let tensor_norms = directions.iter().map(|o| o.iter().map(|x| x * x).sum()).collect();
        Ok(Self { directions, weights, tensor_norms })
    }

    /// Replace the per-direction stabilization factors.
    pub fn with_tensor_norms(mut self, tensor_norms: Vec<f64>) -> Result<Self, TransportError> {
        if tensor_norms.len() != self.directions.len() {
            return Err(TransportError::SizeMismatch {
                what: "tensor norms",
                expected: self.directions.len(),
                found: tensor_norms.len(),
            });
        }
        self.tensor_norms = tensor_norms;
        Ok(self)
    }

    pub fn n_dir(&self) -> usize {
        self.directions.len()
    }

    pub fn direction(&self, d: usize) -> [f64; DIM] {
        self.directions[d]
    }

    pub fn weight(&self, d: usize) -> f64 {
        self.weights[d]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn tensor_norm(&self, d: usize) -> f64 {
        self.tensor_norms[d]
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl AngularQuadrature<1> {
    /// Gauss–Legendre S_n slab set; `n` even.
    pub fn gauss_legendre_slab(n: usize) -> Result<Self, TransportError> {
        if n == 0 || n % 2 == 1 {
            return Err(TransportError::InvalidInput(format!("S_n order must be even, got {n}")));
        }
        let (mu, w) = gauss_legendre(n);
        Self::new(mu.into_iter().map(|m| [m]).collect(), w.into_iter().map(|w| 2.0 * PI * w).collect())
    }
}

impl AngularQuadrature<2> {
    /// Gauss–Legendre in the polar cosine times uniform azimuth, upper hemisphere only.
    pub fn product_xy(n_polar: usize, n_azi: usize) -> Result<Self, TransportError> {
        if n_polar == 0 || n_azi == 0 || n_azi % 2 != 0 {
            return Err(TransportError::InvalidInput(format!(
                "product set needs n_polar > 0 and even n_azi, got ({n_polar}, {n_azi})"
            )));
        }
        let (mu, w) = gauss_legendre(2 * n_polar);
        let mut directions = Vec::with_capacity(n_polar * n_azi);
        let mut weights = Vec::with_capacity(n_polar * n_azi);
        for (&m, &wm) in mu.iter().zip(&w).filter(|(m, _)| **m > 0.0) {
            let sin_theta = (1.0 - m * m).sqrt();
            for j in 0..n_azi {
                let phi = (j as f64 + 0.5) * 2.0 * PI / n_azi as f64;
                directions.push([sin_theta * phi.cos(), sin_theta * phi.sin()]);
                weights.push(2.0 * wm * 2.0 * PI / n_azi as f64);
            }
        }
        Self::new(directions, weights)
    }
}

impl AngularQuadrature<3> {
    /// Gauss–Legendre in the polar cosine times uniform azimuth over the full sphere.
    pub fn product(n_polar: usize, n_azi: usize) -> Result<Self, TransportError> {
        if n_polar == 0 || n_polar % 2 == 1 || n_azi == 0 || n_azi % 2 != 0 {
            return Err(TransportError::InvalidInput(format!(
                "product set needs even n_polar and even n_azi, got ({n_polar}, {n_azi})"
            )));
        }
        let (mu, w) = gauss_legendre(n_polar);
        let mut directions = Vec::with_capacity(n_polar * n_azi);
        let mut weights = Vec::with_capacity(n_polar * n_azi);
        for (&m, &wm) in mu.iter().zip(&w) {
            let sin_theta = (1.0 - m * m).sqrt();
            for j in 0..n_azi {
                let phi = (j as f64 + 0.5) * 2.0 * PI / n_azi as f64;
                directions.push([sin_theta * phi.cos(), sin_theta * phi.sin(), m]);
                weights.push(wm * 2.0 * PI / n_azi as f64);
            }
        }
        Self::new(directions, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn built_in_sets_integrate_the_sphere() {
        let s8 = AngularQuadrature::<1>::gauss_legendre_slab(8).unwrap();
        assert_relative_eq!(s8.total_weight(), 4.0 * PI, epsilon = 1e-13);
        let xy = AngularQuadrature::<2>::product_xy(3, 8).unwrap();
        assert_eq!(xy.n_dir(), 24);
        assert_relative_eq!(xy.total_weight(), 4.0 * PI, epsilon = 1e-13);
        let full = AngularQuadrature::<3>::product(4, 4).unwrap();
        assert_relative_eq!(full.total_weight(), 4.0 * PI, epsilon = 1e-13);
        for d in 0..full.n_dir() {
            assert_relative_eq!(full.tensor_norm(d), 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn second_moment_of_slab_set() {
        // ∫ μ² dΩ = 4π/3
        let s4 = AngularQuadrature::<1>::gauss_legendre_slab(4).unwrap();
        let m2: f64 = (0..4).map(|d| s4.weight(d) * s4.direction(d)[0].powi(2)).sum();
        assert_relative_eq!(m2, 4.0 * PI / 3.0, epsilon = 1e-13);
    }

    #[test]
    fn bad_sets_are_rejected() {
        assert!(AngularQuadrature::<1>::gauss_legendre_slab(3).is_err());
        assert!(AngularQuadrature::<2>::product_xy(2, 5).is_err());
        assert!(AngularQuadrature::<1>::new(vec![[1.5]], vec![1.0]).is_err());
        assert!(AngularQuadrature::<1>::new(vec![[0.5]], vec![1.0, 2.0]).is_err());
        assert!(AngularQuadrature::<1>::new(vec![[0.5]], vec![0.0]).is_err());
        let q = AngularQuadrature::<1>::new(vec![[1.0]], vec![1.0]).unwrap();
        assert!(q.with_tensor_norms(vec![1.0, 2.0]).is_err());
    }
}
