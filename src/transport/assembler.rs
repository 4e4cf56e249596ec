//! Per-unknown bilinear forms and static boundary sources.
//!
//! For unknown `k = (d, g)` every cell of material `m` contributes
//! `∫ (Ω_d·∇φ_i)(1/σt)(Ω_d·∇φ_j) + σt φ_i φ_j`; vacuum faces add `∫ |n·Ω_d| φ_i φ_j`,
//! reflective faces whatever the reflective strategy puts in the matrix, and for DFEM every
//! interior face (visited once, from the cell with the larger index) adds the interior-penalty
//! blocks. Each matrix is finished before the next unknown is started.

use faer::Mat;
use log::debug;

use crate::error::{KError, TransportError};
use crate::fe::values::dot;
use crate::matrix::CsrMatrix;
use crate::mesh::{FaceNeighbor, StructuredMesh};
use crate::transport::interface::InterfaceBlocks;
use crate::transport::penalty::penalty_coefficient;
use crate::transport::reflective::{ReflectiveFace, ReflectiveStrategy};
use crate::transport::setup::TransportSetup;

/// System matrix of unknown `k`.
pub fn assemble_unknown<const DIM: usize>(
    setup: &TransportSetup<DIM>,
    reflective: &dyn ReflectiveStrategy<DIM>,
    k: usize,
) -> Result<CsrMatrix<f64>, TransportError> {
    let wrap = |source: KError| TransportError::Assembly { unknown: k, source };
    let d = setup.index_map.direction_of(k);
    let g = setup.index_map.group_of(k);
    let omega = setup.quadrature.direction(d);
    let forms = &setup.forms;
    let n = setup.dof_handler.dofs_per_cell();
    let mut matrix = CsrMatrix::new(setup.pattern.clone());

    for c in 0..setup.mesh.n_cells() {
        let m = setup.mesh.material_id(c);
        let sigma_t = setup.materials.sigma_t(m, g);
        let inv_sigma_t = setup.materials.inv_sigma_t(m, g);
        let mut local = Mat::from_fn(n, n, |i, j| {
            sigma_t * forms.mass[(i, j)] + inv_sigma_t * forms.streaming[d][(i, j)]
        });
        let cell_dofs = setup.dof_handler.cell_dofs(c);

        for face in 0..StructuredMesh::<DIM>::FACES_PER_CELL {
            match setup.mesh.neighbor(c, face) {
                FaceNeighbor::Boundary(b) => {
                    let n_dot = dot(&StructuredMesh::<DIM>::normal(face), &omega);
                    if setup.index_map.is_reflective(b) {
                        let reflected = setup.index_map.reflected_direction_of(b, d)?;
                        let rf = ReflectiveFace {
                            faces: &setup.face_values,
                            face,
                            reflected,
                            coupling: n_dot * inv_sigma_t,
                        };
                        reflective.add_face_matrix(&rf, &mut local);
                    } else {
                        let abs_n_dot = n_dot.abs();
                        for i in 0..n {
                            for j in 0..n {
                                local[(i, j)] += abs_n_dot * forms.face_mass[face][(i, j)];
                            }
                        }
                    }
                }
                FaceNeighbor::Interior(nb) if setup.is_discontinuous() && nb < c => {
                    let m_nb = setup.mesh.material_id(nb);
                    let sigma_e = penalty_coefficient(
                        setup.tensor_norms[d],
                        setup.mean_free_paths[m][g],
                        setup.mean_free_paths[m_nb][g],
                    );
                    let tables = setup.interface.tables(&setup.face_values, face, d);
                    let blocks = InterfaceBlocks::new(tables, sigma_e, inv_sigma_t, setup.materials.inv_sigma_t(m_nb, g));
                    for i in 0..n {
                        for j in 0..n {
                            local[(i, j)] += blocks.pp[(i, j)];
                        }
                    }
                    let nb_dofs = setup.dof_handler.cell_dofs(nb);
                    let constraints = &setup.constraints;
                    constraints.distribute_local_to_global(&blocks.pn, cell_dofs, nb_dofs, &mut matrix).map_err(wrap)?;
                    constraints.distribute_local_to_global(&blocks.np, nb_dofs, cell_dofs, &mut matrix).map_err(wrap)?;
                    constraints.distribute_local_to_global(&blocks.nn, nb_dofs, nb_dofs, &mut matrix).map_err(wrap)?;
                }
                FaceNeighbor::Interior(_) => {}
            }
        }
        setup
            .constraints
            .distribute_local_to_global(&local, cell_dofs, cell_dofs, &mut matrix)
            .map_err(wrap)?;
    }
    setup.constraints.set_constrained_diagonals(&mut matrix).map_err(wrap)?;
    debug!("assembled unknown {k} (direction {d}, group {g}): |A|_1 = {:.6e}", matrix.l1_norm());
    Ok(matrix)
}

/// Inflow `2 ∫_f |n·Ω_d| φ_i ψ_inc(b, g)` on vacuum faces with a prescribed incident flux.
pub fn assemble_boundary_rhs<const DIM: usize>(setup: &TransportSetup<DIM>, k: usize) -> Vec<f64> {
    let d = setup.index_map.direction_of(k);
    let g = setup.index_map.group_of(k);
    let omega = setup.quadrature.direction(d);
    let mut rhs = vec![0.0; setup.n_dofs()];
    if setup.config.incident_flux.is_empty() {
        return rhs;
    }
    for c in 0..setup.mesh.n_cells() {
        for face in 0..StructuredMesh::<DIM>::FACES_PER_CELL {
            let FaceNeighbor::Boundary(b) = setup.mesh.neighbor(c, face) else {
                continue;
            };
            let Some(psi_inc) = setup.config.incident_flux.get(&b) else {
                continue;
            };
            let n_dot = dot(&StructuredMesh::<DIM>::normal(face), &omega);
            if n_dot >= 0.0 || psi_inc[g] == 0.0 {
                continue;
            }
            let scale = 2.0 * n_dot.abs() * psi_inc[g];
            let local: Vec<f64> = setup.forms.face_integrals[face].iter().map(|s| scale * s).collect();
            setup
                .constraints
                .distribute_local_to_global_vector(&local, setup.dof_handler.cell_dofs(c), &mut rhs);
        }
    }
    rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Discretization, ReflectiveMode, TransportConfig};
    use crate::transport::material::Material;
    use crate::transport::quadrature::AngularQuadrature;
    use crate::transport::reflective::make_strategy;

    fn setup_1d(discretization: Discretization, reflective: Vec<usize>) -> TransportSetup<1> {
        let mesh = StructuredMesh::<1>::new([0.0], [1.0], [4]).unwrap();
        let quad = AngularQuadrature::<1>::gauss_legendre_slab(2).unwrap();
        let config = TransportConfig { discretization, reflective_boundaries: reflective, ..Default::default() };
        TransportSetup::new(mesh, vec![Material::new(vec![2.0])], quad, config).unwrap()
    }

    fn directions(setup: &TransportSetup<1>) -> Vec<[f64; 1]> {
        (0..setup.quadrature.n_dir()).map(|d| setup.quadrature.direction(d)).collect()
    }

    #[test]
    fn matrices_are_symmetric_with_implicit_reflection() {
        for disc in [Discretization::Dfem, Discretization::Cfem] {
            let setup = setup_1d(disc, vec![0]);
            let strategy = make_strategy(setup.config.reflective_mode, directions(&setup));
            for k in 0..setup.index_map.n_total() {
                let a = assemble_unknown(&setup, strategy.as_ref(), k).unwrap();
                assert!(a.is_symmetric(1e-12), "{disc:?} unknown {k}");
            }
        }
    }

    #[test]
    fn explicit_reflection_breaks_symmetry() {
        let mut setup = setup_1d(Discretization::Dfem, vec![0]);
        setup.config.reflective_mode = ReflectiveMode::Explicit;
        let strategy = make_strategy(setup.config.reflective_mode, directions(&setup));
        let a = assemble_unknown(&setup, strategy.as_ref(), 0).unwrap();
        assert!(!a.is_symmetric(1e-12));
        // only the first cell touches boundary 0
        let b = assemble_unknown(&setup, make_strategy(ReflectiveMode::Implicit, directions(&setup)).as_ref(), 0).unwrap();
        for row in 2..setup.n_dofs() {
            for col in 0..setup.n_dofs() {
                assert_eq!(a.get(row, col), b.get(row, col));
            }
        }
    }

    #[test]
    fn interior_faces_are_visited_once() {
        let setup = setup_1d(Discretization::Dfem, vec![]);
        let strategy = make_strategy(setup.config.reflective_mode, directions(&setup));
        let a = assemble_unknown(&setup, strategy.as_ref(), 0).unwrap();
        // constant vectors are in the kernel of the streaming and jump terms, so A·1 only sees
        // collision and the two vacuum faces
        let ones = vec![1.0; setup.n_dofs()];
        let mut y = vec![0.0; setup.n_dofs()];
        crate::core::traits::MatVec::matvec(&a, &ones, &mut y);
        let total: f64 = y.iter().sum();
        let mu = 1.0 / 3f64.sqrt();
        assert!((total - (2.0 * 1.0 + 2.0 * mu)).abs() < 1e-12, "total = {total}");
        assert_eq!(setup.interface.n_cached(), 1);
    }

    #[test]
    fn incident_flux_enters_only_for_incoming_directions() {
        let mesh = StructuredMesh::<1>::new([0.0], [1.0], [2]).unwrap();
        let quad = AngularQuadrature::<1>::gauss_legendre_slab(2).unwrap();
        let mut config = TransportConfig::default();
        config.incident_flux.insert(0, vec![3.0]);
        let setup = TransportSetup::new(mesh, vec![Material::new(vec![1.0])], quad, config).unwrap();
        // direction 0 has μ < 0 and leaves through x = 0
        assert!(assemble_boundary_rhs(&setup, 0).iter().all(|&v| v == 0.0));
        let rhs = assemble_boundary_rhs(&setup, 1);
        let mu = 1.0 / 3f64.sqrt();
        assert!((rhs[0] - 2.0 * mu * 3.0).abs() < 1e-14);
        assert!(rhs[1..].iter().all(|&v| v == 0.0));
    }
}
