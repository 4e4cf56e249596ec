//! Shape values, gradients and `JxW` at quadrature points of one (any) mesh cell.
//!
//! The mesh is uniform, so mapping the unit cell to a real cell is a per-axis scaling by the
//! cell size `h`: gradients scale by `1/h` and weights by the cell (or face) measure.

use faer::Mat;

use crate::fe::lagrange::TensorLagrange;
use crate::fe::quadrature::QGauss;

#[derive(Debug, Clone)]
pub struct CellValues<const DIM: usize> {
    values: Vec<Vec<f64>>,
    grads: Vec<Vec<[f64; DIM]>>,
    jxw: Vec<f64>,
}

impl<const DIM: usize> CellValues<DIM> {
    pub fn new(fe: &TensorLagrange<DIM>, quad: &QGauss<DIM>, h: [f64; DIM]) -> Self {
        let measure: f64 = h.iter().product();
        let n = fe.dofs_per_cell();
        let mut values = Vec::with_capacity(quad.size());
        let mut grads = Vec::with_capacity(quad.size());
        let mut jxw = Vec::with_capacity(quad.size());
        for q in 0..quad.size() {
            let x = quad.point(q);
            values.push((0..n).map(|i| fe.shape_value(i, &x)).collect());
            grads.push((0..n).map(|i| scale_gradient(fe.shape_grad(i, &x), &h)).collect());
            jxw.push(quad.weight(q) * measure);
        }
        Self { values, grads, jxw }
    }

    pub fn n_quadrature_points(&self) -> usize {
        self.jxw.len()
    }

    pub fn dofs_per_cell(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub fn shape_value(&self, i: usize, q: usize) -> f64 {
        self.values[q][i]
    }

    pub fn shape_grad(&self, i: usize, q: usize) -> [f64; DIM] {
        self.grads[q][i]
    }

    #[allow(non_snake_case)]
    pub fn JxW(&self, q: usize) -> f64 {
        self.jxw[q]
    }

    /// `∫ φ_i φ_j`
    pub fn mass_matrix(&self) -> Mat<f64> {
        let n = self.dofs_per_cell();
        Mat::from_fn(n, n, |i, j| {
            (0..self.n_quadrature_points())
                .map(|q| self.values[q][i] * self.values[q][j] * self.jxw[q])
                .sum::<f64>()
        })
    }

    /// `∫ (Ω·∇φ_i)(Ω·∇φ_j)`
    pub fn streaming_matrix(&self, omega: &[f64; DIM]) -> Mat<f64> {
        let n = self.dofs_per_cell();
        let projected: Vec<Vec<f64>> = self
            .grads
            .iter()
            .map(|row| row.iter().map(|g| dot(omega, g)).collect())
            .collect();
        Mat::from_fn(n, n, |i, j| {
            (0..self.n_quadrature_points())
                .map(|q| projected[q][i] * projected[q][j] * self.jxw[q])
                .sum::<f64>()
        })
    }

    /// `∫ φ_i`
    pub fn shape_integrals(&self) -> Vec<f64> {
        (0..self.dofs_per_cell())
            .map(|i| (0..self.n_quadrature_points()).map(|q| self.values[q][i] * self.jxw[q]).sum::<f64>())
            .collect()
    }
}

/// Traces of the shape functions on each of the `2·DIM` faces.
#[derive(Debug, Clone)]
pub struct FaceValues<const DIM: usize> {
    faces: Vec<CellValues<DIM>>,
}

impl<const DIM: usize> FaceValues<DIM> {
    pub fn new(fe: &TensorLagrange<DIM>, n_points_per_axis: usize, h: [f64; DIM]) -> Self {
        let faces = (0..2 * DIM)
            .map(|f| {
                let quad = QGauss::<DIM>::face(n_points_per_axis, f);
                let mut values = CellValues::new(fe, &quad, h);
                // the face measure drops the normal extent
                let normal_extent = h[f / 2];
                for w in values.jxw.iter_mut() {
                    *w /= normal_extent;
                }
                values
            })
            .collect();
        Self { faces }
    }

    pub fn face(&self, face: usize) -> &CellValues<DIM> {
        &self.faces[face]
    }

    pub fn n_quadrature_points(&self) -> usize {
        self.faces[0].n_quadrature_points()
    }

    /// `∫_f φ_i φ_j`
    pub fn mass_matrix(&self, face: usize) -> Mat<f64> {
        self.faces[face].mass_matrix()
    }

    /// `∫_f φ_i (b·∇φ_j)`
    pub fn value_gradient_matrix(&self, face: usize, b: &[f64; DIM]) -> Mat<f64> {
        let fv = &self.faces[face];
        let n = fv.dofs_per_cell();
        Mat::from_fn(n, n, |i, j| {
            (0..fv.n_quadrature_points())
                .map(|q| fv.shape_value(i, q) * dot(b, &fv.shape_grad(j, q)) * fv.JxW(q))
                .sum::<f64>()
        })
    }
}

pub fn dot<const DIM: usize>(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn scale_gradient<const DIM: usize>(mut g: [f64; DIM], h: &[f64; DIM]) -> [f64; DIM] {
    for (gi, hi) in g.iter_mut().zip(h) {
        *gi /= hi;
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mass_matrix_sums_to_cell_measure() {
        let fe = TensorLagrange::<2>::new(2).unwrap();
        let cv = CellValues::new(&fe, &QGauss::new(3), [0.5, 0.25]);
        let m = cv.mass_matrix();
        let mut total = 0.0;
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                total += m[(i, j)];
                assert_abs_diff_eq!(m[(i, j)], m[(j, i)], epsilon = 1e-15);
            }
        }
        assert_abs_diff_eq!(total, 0.125, epsilon = 1e-14);
        assert_abs_diff_eq!(cv.shape_integrals().iter().sum::<f64>(), 0.125, epsilon = 1e-14);
    }

    #[test]
    fn linear_streaming_matrix_in_1d() {
        let fe = TensorLagrange::<1>::new(1).unwrap();
        let cv = CellValues::new(&fe, &QGauss::new(2), [0.5]);
        let s = cv.streaming_matrix(&[0.5]);
        // (μ²/h) [[1, -1], [-1, 1]]
        assert_abs_diff_eq!(s[(0, 0)], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(s[(0, 1)], -0.5, epsilon = 1e-14);
    }

    #[test]
    fn face_traces() {
        let fe = TensorLagrange::<2>::new(1).unwrap();
        let fv = FaceValues::new(&fe, 2, [2.0, 1.0]);
        // face 0 is x = 0 with length 1; only nodes 0 and 2 live there
        let m = fv.mass_matrix(0);
        assert_abs_diff_eq!(m[(0, 0)], 1.0 / 3.0, epsilon = 1e-14);
        assert_abs_diff_eq!(m[(0, 2)], 1.0 / 6.0, epsilon = 1e-14);
        assert_abs_diff_eq!(m[(1, 1)], 0.0, epsilon = 1e-14);
        // face 3 is y = 1 with length 2
        let m3 = fv.mass_matrix(3);
        let total: f64 = (0..4).flat_map(|i| (0..4).map(move |j| (i, j))).map(|(i, j)| m3[(i, j)]).sum();
        assert_abs_diff_eq!(total, 2.0, epsilon = 1e-14);
        // ∫_{x=0} φ_0 ∂x φ_0 = -(1/h_x) ∫ φ_0² along the face
        let g = fv.value_gradient_matrix(0, &[1.0, 0.0]);
        assert_abs_diff_eq!(g[(0, 0)], -0.5 / 3.0, epsilon = 1e-14);
    }
}
