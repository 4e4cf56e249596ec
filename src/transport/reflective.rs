//! Reflective boundary treatments.
//!
//! On a specular face the SAAF boundary term `−∫ (n·Ω_d) v (1/σt) Ω_d·∇ψ_d` is replaced by its
//! mirror image `−∫ (n·Ω_d) v (1/σt) Ω_r·∇ψ_r`, `r` the reflected direction. Two strategies:
//!
//! - [`ImplicitReflection`] moves it to the right-hand side using the previous inner iterate of
//!   `ψ_r`. The lag is kept as a known approximation of the coupled system.
//! - [`ExplicitReflection`] approximates `ψ_r` by the unknown itself and keeps the term in the
//!   matrix, which makes the matrix non-symmetric.

use std::sync::OnceLock;

use faer::Mat;

use crate::config::ReflectiveMode;
use crate::context::SolverKind;
use crate::fe::FaceValues;

/// One reflective boundary face seen from unknown `(d, g)`.
pub struct ReflectiveFace<'a, const DIM: usize> {
    pub faces: &'a FaceValues<DIM>,
    pub face: usize,
    /// Reflected direction `r`.
    pub reflected: usize,
    /// `(n·Ω_d) / σt`
    pub coupling: f64,
}

pub trait ReflectiveStrategy<const DIM: usize>: Send + Sync {
    fn mode(&self) -> ReflectiveMode;

    /// Krylov method able to handle the matrices this strategy produces.
    fn solver_kind(&self) -> SolverKind;

    /// Matrix contribution of a reflective face.
    fn add_face_matrix(&self, _face: &ReflectiveFace<'_, DIM>, _local: &mut Mat<f64>) {}

    /// Right-hand-side contribution of a reflective face; `psi_reflected` holds the cell's
    /// dof values of `ψ_r`.
    fn add_face_source(&self, _face: &ReflectiveFace<'_, DIM>, _psi_reflected: &[f64], _local: &mut [f64]) {}
}

/// Build the strategy selected by `mode`.
pub fn make_strategy<const DIM: usize>(
    mode: ReflectiveMode,
    directions: Vec<[f64; DIM]>,
) -> Box<dyn ReflectiveStrategy<DIM>> {
    match mode {
        ReflectiveMode::Implicit => Box::new(ImplicitReflection { gradients: GradientTables::new(directions) }),
        ReflectiveMode::Explicit => Box::new(ExplicitReflection { gradients: GradientTables::new(directions) }),
    }
}

/// `∫_f φ_i (Ω_r·∇φ_j)` per (face, direction), computed on first use.
struct GradientTables<const DIM: usize> {
    directions: Vec<[f64; DIM]>,
    cache: Vec<OnceLock<Mat<f64>>>,
}

impl<const DIM: usize> GradientTables<DIM> {
    fn new(directions: Vec<[f64; DIM]>) -> Self {
        let cache = (0..2 * DIM * directions.len()).map(|_| OnceLock::new()).collect();
        Self { directions, cache }
    }

    fn get(&self, faces: &FaceValues<DIM>, face: usize, r: usize) -> &Mat<f64> {
        self.cache[face * self.directions.len() + r]
            .get_or_init(|| faces.value_gradient_matrix(face, &self.directions[r]))
    }
}

pub struct ImplicitReflection<const DIM: usize> {
    gradients: GradientTables<DIM>,
}

impl<const DIM: usize> ReflectiveStrategy<DIM> for ImplicitReflection<DIM> {
    fn mode(&self) -> ReflectiveMode {
        ReflectiveMode::Implicit
    }

    fn solver_kind(&self) -> SolverKind {
        SolverKind::Pcg
    }

    fn add_face_source(&self, face: &ReflectiveFace<'_, DIM>, psi_reflected: &[f64], local: &mut [f64]) {
        let g = self.gradients.get(face.faces, face.face, face.reflected);
        for (i, out) in local.iter_mut().enumerate() {
            let grad: f64 = psi_reflected.iter().enumerate().map(|(j, psi)| g[(i, j)] * psi).sum();
            *out += face.coupling * grad;
        }
    }
}

pub struct ExplicitReflection<const DIM: usize> {
    gradients: GradientTables<DIM>,
}

impl<const DIM: usize> ReflectiveStrategy<DIM> for ExplicitReflection<DIM> {
    fn mode(&self) -> ReflectiveMode {
        ReflectiveMode::Explicit
    }

    fn solver_kind(&self) -> SolverKind {
        SolverKind::Bicgstab
    }

    fn add_face_matrix(&self, face: &ReflectiveFace<'_, DIM>, local: &mut Mat<f64>) {
        let g = self.gradients.get(face.faces, face.face, face.reflected);
        for i in 0..local.nrows() {
            for j in 0..local.ncols() {
                local[(i, j)] -= face.coupling * g[(i, j)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fe::TensorLagrange;
    use approx::assert_abs_diff_eq;

    #[test]
    fn explicit_matrix_term_matches_implicit_source() {
        let fe = TensorLagrange::<1>::new(2).unwrap();
        let faces = FaceValues::new(&fe, 3, [0.5]);
        let dirs = vec![[-0.7], [0.7]];
        let implicit = make_strategy(ReflectiveMode::Implicit, dirs.clone());
        let explicit = make_strategy(ReflectiveMode::Explicit, dirs);
        assert_eq!(implicit.solver_kind(), SolverKind::Pcg);
        assert_eq!(explicit.mode(), ReflectiveMode::Explicit);

        // face 0, incoming direction 1 (n·Ω = -0.7) reflected into direction 0
        let face = ReflectiveFace { faces: &faces, face: 0, reflected: 0, coupling: -0.7 / 2.0 };
        let psi = [1.0, 0.5, 0.25];
        let mut rhs = vec![0.0; 3];
        implicit.add_face_source(&face, &psi, &mut rhs);
        let mut m = Mat::<f64>::zeros(3, 3);
        explicit.add_face_matrix(&face, &mut m);
        // moving the matrix term to the right-hand side gives the implicit source
        for i in 0..3 {
            let lhs: f64 = (0..3).map(|j| m[(i, j)] * psi[j]).sum();
            assert_abs_diff_eq!(-lhs, rhs[i], epsilon = 1e-14);
        }
        // only the node on x = 0 sees the face
        assert_abs_diff_eq!(rhs[1], 0.0, epsilon = 1e-14);
        assert!(rhs[0].abs() > 0.0);
        // the explicit strategy adds no source, the implicit one no matrix term
        let mut untouched = vec![0.0; 3];
        explicit.add_face_source(&face, &psi, &mut untouched);
        assert_eq!(untouched, vec![0.0; 3]);
    }
}
