//! Gauss–Legendre rules for cell and face integration.

use std::f64::consts::PI;

/// `n`-point Gauss–Legendre nodes and weights on `[-1, 1]`, nodes ascending.
///
/// Nodes are the roots of `P_n`, found by Newton iteration from the Chebyshev guesses.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];
    for i in 0..n.div_ceil(2) {
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, d) = legendre_with_derivative(n, z);
            let dz = p / d;
            z -= dz;
            if dz.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre_with_derivative(n, z);
        let weight = 2.0 / ((1.0 - z * z) * dp * dp);
        x[i] = -z;
        x[n - 1 - i] = z;
        w[i] = weight;
        w[n - 1 - i] = weight;
    }
    if n % 2 == 1 {
        x[n / 2] = 0.0;
    }
    (x, w)
}

/// `P_n(z)` and `P_n'(z)` by the three-term recurrence.
fn legendre_with_derivative(n: usize, z: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = z;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * z * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    let d = n as f64 * (z * p1 - p0) / (z * z - 1.0);
    (p1, d)
}

/// Tensor-product Gauss rule on the unit hyper-cube `[0, 1]^DIM`, x fastest.
#[derive(Debug, Clone)]
pub struct QGauss<const DIM: usize> {
    points: Vec<[f64; DIM]>,
    weights: Vec<f64>,
}

impl<const DIM: usize> QGauss<DIM> {
    pub fn new(n_per_axis: usize) -> Self {
        let (x, w) = unit_interval_rule(n_per_axis);
        let n_points = n_per_axis.pow(DIM as u32);
        let mut points = Vec::with_capacity(n_points);
        let mut weights = Vec::with_capacity(n_points);
        for q in 0..n_points {
            let mut pt = [0.0; DIM];
            let mut weight = 1.0;
            let mut rest = q;
            for c in pt.iter_mut() {
                let i = rest % n_per_axis;
                rest /= n_per_axis;
                *c = x[i];
                weight *= w[i];
            }
            points.push(pt);
            weights.push(weight);
        }
        Self { points, weights }
    }

    /// Rule of `n_per_axis` points on each tangential axis of face `face` of the unit cell,
    /// embedded in cell coordinates. Points of faces `f` and `f ^ 1` share tangential positions.
    pub fn face(n_per_axis: usize, face: usize) -> Self {
        let (x, w) = unit_interval_rule(n_per_axis);
        let normal_axis = face / 2;
        let fixed = if face % 2 == 0 { 0.0 } else { 1.0 };
        let n_points = n_per_axis.pow(DIM as u32 - 1);
        let mut points = Vec::with_capacity(n_points);
        let mut weights = Vec::with_capacity(n_points);
        for q in 0..n_points {
            let mut pt = [0.0; DIM];
            let mut weight = 1.0;
            let mut rest = q;
            for (axis, c) in pt.iter_mut().enumerate() {
                if axis == normal_axis {
                    *c = fixed;
                    continue;
                }
                let i = rest % n_per_axis;
                rest /= n_per_axis;
                *c = x[i];
                weight *= w[i];
            }
            points.push(pt);
            weights.push(weight);
        }
        Self { points, weights }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, q: usize) -> [f64; DIM] {
        self.points[q]
    }

    pub fn weight(&self, q: usize) -> f64 {
        self.weights[q]
    }
}

fn unit_interval_rule(n: usize) -> (Vec<f64>, Vec<f64>) {
    let (x, w) = gauss_legendre(n);
    (
        x.iter().map(|xi| 0.5 * (xi + 1.0)).collect(),
        w.iter().map(|wi| 0.5 * wi).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rule_is_exact_to_degree_2n_minus_1() {
        for n in 1..8 {
            let (x, w) = gauss_legendre(n);
            assert_abs_diff_eq!(w.iter().sum::<f64>(), 2.0, epsilon = 1e-13);
            for deg in 0..(2 * n) {
                let quad: f64 = x.iter().zip(&w).map(|(xi, wi)| wi * xi.powi(deg as i32)).sum();
                let exact = if deg % 2 == 1 { 0.0 } else { 2.0 / (deg as f64 + 1.0) };
                assert_abs_diff_eq!(quad, exact, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn nodes_are_symmetric_and_sorted() {
        let (x, _) = gauss_legendre(6);
        for i in 0..6 {
            assert_abs_diff_eq!(x[i], -x[5 - i], epsilon = 1e-15);
        }
        assert!(x.windows(2).all(|p| p[0] < p[1]));
    }

    #[test]
    fn tensor_and_face_rules() {
        let q = QGauss::<2>::new(3);
        assert_eq!(q.size(), 9);
        let integral: f64 = (0..q.size()).map(|i| q.weight(i) * q.point(i)[0] * q.point(i)[1].powi(2)).sum();
        assert_abs_diff_eq!(integral, 1.0 / 6.0, epsilon = 1e-14);
        let f2 = QGauss::<2>::face(3, 2);
        let f3 = QGauss::<2>::face(3, 3);
        for i in 0..3 {
            assert_eq!(f2.point(i)[1], 0.0);
            assert_eq!(f3.point(i)[1], 1.0);
            assert_eq!(f2.point(i)[0], f3.point(i)[0]);
        }
        let point_face = QGauss::<1>::face(2, 1);
        assert_eq!(point_face.size(), 1);
        assert_eq!(point_face.point(0), [1.0]);
        assert_eq!(point_face.weight(0), 1.0);
    }
}
