//! Symmetric interior-penalty coupling across interior faces.
//!
//! With "plus" the trace of the current cell, "minus" the trace of the neighbor, `n` the outward
//! normal of the current cell and `{w} = (w⁺ + w⁻)/2`, each interior face contributes
//!
//! ```text
//! σ_e [[v]][[u]] − [[v]] (n·Ω) {(1/σt) Ω·∇u} − (n·Ω) {(1/σt) Ω·∇v} [[u]]
//! ```
//!
//! to the bilinear form, every average gradient scaled by its own side's `1/σt`. The shape
//! products behind the four blocks only depend on the face and the direction, so they are
//! computed on first use and kept; `σ_e` and `1/σt` are applied per face.

use std::sync::OnceLock;

use faer::Mat;

use crate::fe::values::{dot, FaceValues};
use crate::mesh::StructuredMesh;

/// Reference face integrals for one (face, direction) pair, `0.5 (n·Ω)` folded in.
///
/// `vv_xy(i, j) = ∫ v^x_i u^y_j`, `vg_xy(i, j) = ∫ v^x_i · 0.5 (n·Ω) (Ω·∇u^y_j)`.
#[derive(Debug, Clone)]
pub struct FaceTables {
    vv_pp: Mat<f64>,
    vv_pn: Mat<f64>,
    vv_nn: Mat<f64>,
    vg_pp: Mat<f64>,
    vg_pn: Mat<f64>,
    vg_np: Mat<f64>,
    vg_nn: Mat<f64>,
}

impl FaceTables {
    fn new<const DIM: usize>(faces: &FaceValues<DIM>, face: usize, omega: &[f64; DIM]) -> Self {
        let plus = faces.face(face);
        let minus = faces.face(face ^ 1);
        let n = StructuredMesh::<DIM>::normal(face);
        let half_n_dot = 0.5 * dot(&n, omega);
        let n_dofs = plus.dofs_per_cell();
        let n_q = plus.n_quadrature_points();
        let values = |side: usize, i: usize, q: usize| if side == 0 { plus.shape_value(i, q) } else { minus.shape_value(i, q) };
        let proj_grad = |side: usize, i: usize, q: usize| {
            let g = if side == 0 { plus.shape_grad(i, q) } else { minus.shape_grad(i, q) };
            half_n_dot * dot(omega, &g)
        };
        let vv = |x: usize, y: usize| {
            Mat::from_fn(n_dofs, n_dofs, |i, j| {
                (0..n_q).map(|q| values(x, i, q) * values(y, j, q) * plus.JxW(q)).sum::<f64>()
            })
        };
        let vg = |x: usize, y: usize| {
            Mat::from_fn(n_dofs, n_dofs, |i, j| {
                (0..n_q).map(|q| values(x, i, q) * proj_grad(y, j, q) * plus.JxW(q)).sum::<f64>()
            })
        };
        Self {
            vv_pp: vv(0, 0),
            vv_pn: vv(0, 1),
            vv_nn: vv(1, 1),
            vg_pp: vg(0, 0),
            vg_pn: vg(0, 1),
            vg_np: vg(1, 0),
            vg_nn: vg(1, 1),
        }
    }
}

/// Local matrices for (current, current), (current, neighbor), (neighbor, current) and
/// (neighbor, neighbor).
#[derive(Debug, Clone)]
pub struct InterfaceBlocks {
    pub pp: Mat<f64>,
    pub pn: Mat<f64>,
    pub np: Mat<f64>,
    pub nn: Mat<f64>,
}

impl InterfaceBlocks {
    /// `inv_sigma_plus`/`inv_sigma_minus` are the `1/σt` of the current and neighbor cells.
    pub fn new(t: &FaceTables, sigma_e: f64, inv_sigma_plus: f64, inv_sigma_minus: f64) -> Self {
        let n = t.vv_pp.nrows();
        let (sp, sm) = (inv_sigma_plus, inv_sigma_minus);
        Self {
            pp: Mat::from_fn(n, n, |i, j| sigma_e * t.vv_pp[(i, j)] - sp * (t.vg_pp[(i, j)] + t.vg_pp[(j, i)])),
            pn: Mat::from_fn(n, n, |i, j| -sigma_e * t.vv_pn[(i, j)] - sm * t.vg_pn[(i, j)] + sp * t.vg_np[(j, i)]),
            np: Mat::from_fn(n, n, |i, j| -sigma_e * t.vv_pn[(j, i)] + sp * t.vg_np[(i, j)] - sm * t.vg_pn[(j, i)]),
            nn: Mat::from_fn(n, n, |i, j| sigma_e * t.vv_nn[(i, j)] + sm * (t.vg_nn[(i, j)] + t.vg_nn[(j, i)])),
        }
    }
}

/// Lazily filled `FaceTables` for every (face, direction).
#[derive(Debug)]
pub struct InterfaceTables<const DIM: usize> {
    directions: Vec<[f64; DIM]>,
    cache: Vec<OnceLock<FaceTables>>,
}

impl<const DIM: usize> InterfaceTables<DIM> {
    pub fn new(directions: Vec<[f64; DIM]>) -> Self {
        let cache = (0..2 * DIM * directions.len()).map(|_| OnceLock::new()).collect();
        Self { directions, cache }
    }

    pub fn tables(&self, faces: &FaceValues<DIM>, face: usize, direction: usize) -> &FaceTables {
        self.cache[face * self.directions.len() + direction]
            .get_or_init(|| FaceTables::new(faces, face, &self.directions[direction]))
    }

    /// Number of (face, direction) tables computed so far.
    pub fn n_cached(&self) -> usize {
        self.cache.iter().filter(|c| c.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fe::TensorLagrange;
    use approx::assert_abs_diff_eq;

    fn faces_2d(p: usize) -> FaceValues<2> {
        let fe = TensorLagrange::<2>::new(p).unwrap();
        FaceValues::new(&fe, p + 1, [0.5, 0.25])
    }

    #[test]
    fn blocks_form_a_symmetric_coupling() {
        let faces = faces_2d(2);
        let omega = [0.6, -0.3];
        let tables = InterfaceTables::new(vec![omega]);
        for face in [0, 2] {
            let b = InterfaceBlocks::new(tables.tables(&faces, face, 0), 3.0, 0.5, 2.0);
            let n = b.pp.nrows();
            for i in 0..n {
                for j in 0..n {
                    assert_abs_diff_eq!(b.pp[(i, j)], b.pp[(j, i)], epsilon = 1e-13);
                    assert_abs_diff_eq!(b.nn[(i, j)], b.nn[(j, i)], epsilon = 1e-13);
                    assert_abs_diff_eq!(b.pn[(i, j)], b.np[(j, i)], epsilon = 1e-13);
                }
            }
        }
        assert_eq!(tables.n_cached(), 2);
    }

    #[test]
    fn jump_of_a_continuous_constant_vanishes() {
        // u = 1 on both sides: [[u]] = 0, ∇u = 0, so every row of the coupling sums to zero
        let faces = faces_2d(1);
        let tables = InterfaceTables::new(vec![[0.3, 0.8]]);
        let b = InterfaceBlocks::new(tables.tables(&faces, 0, 0), 5.0, 1.0, 1.0);
        for i in 0..4 {
            let row: f64 = (0..4).map(|j| b.pp[(i, j)] + b.pn[(i, j)]).sum();
            assert_abs_diff_eq!(row, 0.0, epsilon = 1e-13);
        }
    }
}
