//! Right-hand sides: the per-group fixed (or fission) source and the per-unknown source that
//! adds in-scattering, boundary inflow and lagged reflective terms to it.
//!
//! Volumetric sources are expanded in the finite-element basis of the fluxes, so their
//! contribution on a cell is the local mass matrix applied to the cell values of
//! `Σ_gin c(gin) φ_gin`.

use faer::Mat;

use crate::fe::values::dot;
use crate::mesh::{FaceNeighbor, StructuredMesh};
use crate::transport::reflective::{ReflectiveFace, ReflectiveStrategy};
use crate::transport::setup::TransportSetup;

/// Volumetric source densities below this are treated as absent.
const SOURCE_FLOOR: f64 = 1e-13;

/// `y += M · x` for a dense local matrix.
fn add_mass_times(mass: &Mat<f64>, x: &[f64], y: &mut [f64]) {
    for (i, yi) in y.iter_mut().enumerate() {
        *yi += (0..x.len()).map(|j| mass[(i, j)] * x[j]).sum::<f64>();
    }
}

/// Combine `Σ_gin coef(gin) φ_gin` on the dofs of `cell`; `None` when every coefficient is zero.
fn combined_cell_flux<const DIM: usize, F>(
    setup: &TransportSetup<DIM>,
    phi: &[Vec<f64>],
    cell: usize,
    coef: F,
) -> Option<Vec<f64>>
where
    F: Fn(usize) -> f64,
{
    let dofs = setup.dof_handler.cell_dofs(cell);
    let mut combined = vec![0.0; dofs.len()];
    let mut any = false;
    for (g_in, phi_in) in phi.iter().enumerate() {
        let c = coef(g_in);
        if c == 0.0 {
            continue;
        }
        any = true;
        for (out, &dof) in combined.iter_mut().zip(dofs) {
            *out += c * phi_in[dof];
        }
    }
    any.then_some(combined)
}

/// Overwrite `fixed[g]` for every group.
///
/// Fixed-source mode integrates the material source `q(m, g)` per steradian. Eigenvalue mode
/// integrates the fission source `Σ_gin χνσf(m, gin→g) φ_gin / k` per steradian over fissile
/// cells.
pub fn generate_fixed_source<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    eigen: bool,
    k_eff: f64,
    phi: &[Vec<f64>],
    fixed: &mut [Vec<f64>],
) {
    let lib = &setup.materials;
    let forms = &setup.forms;
    for (g, rhs) in fixed.iter_mut().enumerate() {
        rhs.iter_mut().for_each(|v| *v = 0.0);
        for c in 0..setup.mesh.n_cells() {
            let m = setup.mesh.material_id(c);
            let dofs = setup.dof_handler.cell_dofs(c);
            let mut local = vec![0.0; dofs.len()];
            if eigen {
                if !lib.is_fissile(m) {
                    continue;
                }
                let Some(flux) = combined_cell_flux(setup, phi, c, |g_in| lib.chi_nu_sigma_f_per_ster(m, g_in, g) / k_eff)
                else {
                    continue;
                };
                add_mass_times(&forms.mass, &flux, &mut local);
            } else {
                let q = lib.q_per_ster(m, g);
                if q <= SOURCE_FLOOR {
                    continue;
                }
                for (out, s) in local.iter_mut().zip(&forms.shape_integrals) {
                    *out = q * s;
                }
            }
            setup.constraints.distribute_local_to_global_vector(&local, dofs, rhs);
        }
    }
}

/// Overwrite `out` with the full right-hand side of unknown `k`.
///
/// `psi` holds the angular fluxes of every unknown from the previous inner iterate; it is only
/// read by strategies that put the reflective boundary term on the right-hand side.
#[allow(clippy::too_many_arguments)]
pub fn generate_ho_source<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    reflective: &dyn ReflectiveStrategy<DIM>,
    k: usize,
    fixed: &[f64],
    boundary_rhs: &[f64],
    phi: &[Vec<f64>],
    psi: &[&[f64]],
    out: &mut [f64],
) {
    let d = setup.index_map.direction_of(k);
    let g = setup.index_map.group_of(k);
    let omega = setup.quadrature.direction(d);
    let lib = &setup.materials;

    for ((o, f), b) in out.iter_mut().zip(fixed).zip(boundary_rhs) {
        *o = f + b;
    }

    for c in 0..setup.mesh.n_cells() {
        let m = setup.mesh.material_id(c);
        let dofs = setup.dof_handler.cell_dofs(c);
        let mut local = vec![0.0; dofs.len()];
        let mut touched = false;

        if let Some(flux) = combined_cell_flux(setup, phi, c, |g_in| lib.sigma_s_per_ster(m, g_in, g)) {
            add_mass_times(&setup.forms.mass, &flux, &mut local);
            touched = true;
        }

        for face in 0..StructuredMesh::<DIM>::FACES_PER_CELL {
            let FaceNeighbor::Boundary(b) = setup.mesh.neighbor(c, face) else {
                continue;
            };
            if !setup.index_map.is_reflective(b) {
                continue;
            }
            // every boundary in the reflective map has a partner for every direction
            let Ok(r) = setup.index_map.reflected_direction_of(b, d) else {
                continue;
            };
            let n_dot = dot(&StructuredMesh::<DIM>::normal(face), &omega);
            let rf = ReflectiveFace {
                faces: &setup.face_values,
                face,
                reflected: r,
                coupling: n_dot * lib.inv_sigma_t(m, g),
            };
            let psi_r = setup.cell_values_of(psi[setup.index_map.index_of(r, g)], c);
            reflective.add_face_source(&rf, &psi_r, &mut local);
            touched = true;
        }

        if touched {
            setup.constraints.distribute_local_to_global_vector(&local, dofs, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::transport::material::Material;
    use crate::transport::quadrature::AngularQuadrature;
    use crate::transport::reflective::make_strategy;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn slab(material: Material, eigen: bool) -> TransportSetup<1> {
        let mesh = StructuredMesh::<1>::new([0.0], [2.0], [4]).unwrap();
        let quad = AngularQuadrature::<1>::gauss_legendre_slab(4).unwrap();
        let config = TransportConfig { eigen, ..Default::default() };
        TransportSetup::new(mesh, vec![material], quad, config).unwrap()
    }

    #[test]
    fn fixed_source_integrates_to_q_times_volume() {
        let setup = slab(Material::new(vec![1.0, 1.0]).with_fixed_source(vec![4.0 * PI, 0.0]), false);
        let mut fixed = vec![vec![1.0; setup.n_dofs()]; 2];
        generate_fixed_source(&setup, false, 1.0, &[], &mut fixed);
        assert_relative_eq!(fixed[0].iter().sum::<f64>(), 2.0, epsilon = 1e-12);
        assert!(fixed[1].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn fission_source_scales_with_inverse_k() {
        let mat = Material::new(vec![1.0, 2.0])
            .with_fission_transfer(vec![0.5, 1.0], vec![vec![0.0, 4.0 * PI], vec![0.0, 0.0]]);
        let setup = slab(mat, true);
        let phi = vec![vec![1.0; setup.n_dofs()], vec![3.0; setup.n_dofs()]];
        let mut fixed = vec![vec![0.0; setup.n_dofs()]; 2];
        generate_fixed_source(&setup, true, 2.0, &phi, &mut fixed);
        // only the 0 -> 1 transfer is non-zero
        assert!(fixed[0].iter().all(|&v| v == 0.0));
        assert_relative_eq!(fixed[1].iter().sum::<f64>(), 2.0 * 1.0 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn scattering_adds_to_fixed_and_boundary_terms() {
        let mat = Material::new(vec![1.0]).with_scattering(vec![vec![0.5 * 4.0 * PI]]);
        let setup = slab(mat, false);
        let strategy = make_strategy(setup.config.reflective_mode, vec![[0.5]; setup.quadrature.n_dir()]);
        let n = setup.n_dofs();
        let fixed = vec![1.0; n];
        let boundary = vec![0.5; n];
        let phi = vec![vec![2.0; n]];
        let zeros = vec![0.0; n];
        let psi: Vec<&[f64]> = (0..setup.index_map.n_total()).map(|_| zeros.as_slice()).collect();
        let mut out = vec![0.0; n];
        generate_ho_source(&setup, strategy.as_ref(), 0, &fixed, &boundary, &phi, &psi, &mut out);
        let expected = n as f64 * 1.5 + 0.5 * 2.0 * 2.0;
        assert_relative_eq!(out.iter().sum::<f64>(), expected, epsilon = 1e-12);
    }
}
