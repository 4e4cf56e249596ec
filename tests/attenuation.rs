//! Pure-absorber slab driven by a unit incident flux on its left face.
//!
//! With a single direction `μ = 1` the angular flux is `exp(−σt x)`; the DFEM solution at the
//! support points converges to it under refinement.

use saafsn::{AngularQuadrature, Discretization, Material, StructuredMesh, TransportConfig, TransportProblem};

fn max_nodal_error(n_cells: usize, discretization: Discretization) -> f64 {
    let mesh = StructuredMesh::<1>::new([0.0], [1.0], [n_cells]).unwrap();
    let quad = AngularQuadrature::<1>::new(vec![[1.0]], vec![1.0]).unwrap();
    let mut config = TransportConfig { discretization, ..Default::default() };
    config.incident_flux.insert(0, vec![1.0]);
    let mut problem = TransportProblem::new(mesh, vec![Material::new(vec![1.0])], quad, config).unwrap();
    problem.assemble().unwrap();
    problem.solve().unwrap();

    let psi = problem.angular_flux(0, 0).unwrap();
    let phi = problem.scalar_flux(0).unwrap();
    problem
        .support_points()
        .iter()
        .zip(psi)
        .zip(phi)
        .map(|((x, psi), phi)| {
            // unit weight, so the scalar flux is the angular flux
            assert_eq!(psi, phi);
            (psi - (-x[0]).exp()).abs()
        })
        .fold(0.0, f64::max)
}

#[test]
fn dfem_matches_exponential_attenuation() {
    let coarse = max_nodal_error(2, Discretization::Dfem);
    let fine = max_nodal_error(64, Discretization::Dfem);
    assert!(coarse < 2e-2, "coarse error {coarse}");
    assert!(fine < 1e-4, "fine error {fine}");
    assert!(fine < coarse / 100.0);
}

#[test]
fn cfem_matches_exponential_attenuation() {
    let fine = max_nodal_error(64, Discretization::Cfem);
    assert!(fine < 1e-3, "fine error {fine}");
}

#[test]
fn source_free_slab_converges_in_two_sweeps() {
    let mesh = StructuredMesh::<1>::new([0.0], [1.0], [8]).unwrap();
    let quad = AngularQuadrature::<1>::new(vec![[1.0]], vec![1.0]).unwrap();
    let mut config = TransportConfig::default();
    config.incident_flux.insert(0, vec![1.0]);
    let mut problem = TransportProblem::new(mesh, vec![Material::new(vec![1.0])], quad, config).unwrap();
    problem.run().unwrap();
    // without scattering the second sweep reproduces the first
    let errors = &problem.history().inner_errors;
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[1], 0.0);
}
