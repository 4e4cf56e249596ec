//! The transport problem: owns the discretization, one linear system per (direction, group)
//! unknown and the iteration state.
//!
//! ```text
//! new ──► assemble ──► solve / solve_with ──► scalar_flux, angular_flux, k_eff, history
//! ```

use log::info;
use serde::Serialize;

use crate::config::TransportConfig;
use crate::context::KspContext;
use crate::dofs::DofHandler;
use crate::error::TransportError;
use crate::mesh::StructuredMesh;
use crate::parallel::WorkerPool;
use crate::transport::assembler::{assemble_boundary_rhs, assemble_unknown};
use crate::transport::iteration::{
    IterationHistory, SolverState, UnknownSystem, power_iteration, renormalize, source_iteration,
};
use crate::transport::material::Material;
use crate::transport::quadrature::AngularQuadrature;
use crate::transport::reflective::{ReflectiveStrategy, make_strategy};
use crate::transport::setup::TransportSetup;
use crate::transport::source::generate_fixed_source;
use crate::utils::convergence::Convergence;

/// Summary of a finished solve, serializable to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport<'a> {
    pub dimension: usize,
    pub n_cells: usize,
    pub n_dofs: usize,
    pub n_directions: usize,
    pub n_groups: usize,
    pub eigen: bool,
    pub k_eff: Option<f64>,
    pub history: &'a IterationHistory,
}

pub struct TransportProblem<const DIM: usize> {
    setup: TransportSetup<DIM>,
    reflective: Box<dyn ReflectiveStrategy<DIM>>,
    pool: WorkerPool,
    systems: Vec<UnknownSystem>,
    state: SolverState,
    solved_eigen: Option<bool>,
}

impl<const DIM: usize> TransportProblem<DIM> {
    pub fn new(
        mesh: StructuredMesh<DIM>,
        materials: Vec<Material>,
        quadrature: AngularQuadrature<DIM>,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let pool = WorkerPool::new(config.threads)?;
        let setup = TransportSetup::new(mesh, materials, quadrature, config)?;
        let directions = (0..setup.quadrature.n_dir()).map(|d| setup.quadrature.direction(d)).collect();
        let reflective = make_strategy(setup.config.reflective_mode, directions);
        let state = SolverState::new(setup.n_group(), setup.index_map.n_total(), setup.n_dofs());
        Ok(Self { setup, reflective, pool, systems: Vec::new(), state, solved_eigen: None })
    }

    /// Build the matrix, preconditioner and boundary source of every unknown.
    pub fn assemble(&mut self) -> Result<(), TransportError> {
        if !self.systems.is_empty() {
            return Err(TransportError::AlreadyAssembled);
        }
        let setup = &self.setup;
        let n_dofs = setup.n_dofs();
        let linear = &setup.config.linear;
        let conv = Convergence {
            rtol: linear.rel_tol,
            atol: linear.abs_tol_per_dof * n_dofs as f64,
            max_iters: linear.max_iters.unwrap_or(10 * n_dofs + 100),
        };
        let kind = self.reflective.solver_kind();
        let mut systems = Vec::with_capacity(setup.index_map.n_total());
        for k in 0..setup.index_map.n_total() {
            let a = assemble_unknown(setup, self.reflective.as_ref(), k)?;
            let ksp = KspContext::new(kind, a, linear.pc, conv.clone())
                .map_err(|source| TransportError::LinearSolve { unknown: k, source })?;
            systems.push(UnknownSystem {
                ksp,
                angular_flux: vec![0.0; n_dofs],
                rhs: vec![0.0; n_dofs],
                boundary_rhs: assemble_boundary_rhs(setup, k),
            });
        }
        info!(
            "assembled {} systems of size {n_dofs} ({:?} solves, {} preconditioner, {:?})",
            systems.len(),
            kind,
            linear.pc,
            self.pool
        );
        self.systems = systems;
        Ok(())
    }

    pub fn is_assembled(&self) -> bool {
        !self.systems.is_empty()
    }

    /// Solve the problem kind selected by the configuration.
    pub fn solve(&mut self) -> Result<(), TransportError> {
        self.solve_with(self.setup.config.eigen)
    }

    /// Fixed-source solve (`eigen == false`) or power iteration.
    pub fn solve_with(&mut self, eigen: bool) -> Result<(), TransportError> {
        if !self.is_assembled() {
            return Err(TransportError::NotAssembled);
        }
        if eigen && !self.setup.materials.any_fissile() {
            return Err(TransportError::InvalidInput("eigenvalue problem without fissile material".into()));
        }
        self.state.history = IterationHistory::default();
        self.solved_eigen = None;
        if eigen {
            power_iteration(&self.setup, self.reflective.as_ref(), &self.pool, &mut self.systems, &mut self.state)?;
        } else {
            let state = &mut self.state;
            generate_fixed_source(&self.setup, false, 1.0, &state.scalar_flux, &mut state.fixed_rhs);
            let iterations =
                source_iteration(&self.setup, self.reflective.as_ref(), &self.pool, &mut self.systems, state)?;
            info!("fixed-source solve converged in {iterations} source iterations");
        }
        self.solved_eigen = Some(eigen);
        Ok(())
    }

    /// Assemble if needed, then solve.
    pub fn run(&mut self) -> Result<(), TransportError> {
        if !self.is_assembled() {
            self.assemble()?;
        }
        self.solve()
    }

    /// `None` for a group the problem does not have.
    pub fn scalar_flux(&self, group: usize) -> Option<&[f64]> {
        self.state.scalar_flux.get(group).map(Vec::as_slice)
    }

    /// Replace the scalar flux of `group`, e.g. to seed a source iteration.
    pub fn set_scalar_flux(&mut self, group: usize, values: Vec<f64>) -> Result<(), TransportError> {
        let expected = self.setup.n_dofs();
        if group >= self.setup.n_group() {
            return Err(TransportError::InvalidInput(format!("group {group} out of range")));
        }
        if values.len() != expected {
            return Err(TransportError::SizeMismatch { what: "scalar flux", expected, found: values.len() });
        }
        self.state.scalar_flux[group] = values;
        Ok(())
    }

    pub fn angular_flux(&self, direction: usize, group: usize) -> Option<&[f64]> {
        let k = self.setup.index_map.try_index_of(direction, group)?;
        self.systems.get(k).map(|s| s.angular_flux.as_slice())
    }

    /// Eigenvalue of the last power iteration, `None` after a fixed-source solve.
    pub fn k_eff(&self) -> Option<f64> {
        (self.solved_eigen == Some(true)).then_some(self.state.k_eff)
    }

    /// Divide the fluxes by the L1 norm of the first group; returns the divisor.
    pub fn renormalize(&mut self) -> f64 {
        renormalize(&mut self.state, &mut self.systems)
    }

    pub fn history(&self) -> &IterationHistory {
        &self.state.history
    }

    pub fn dof_handler(&self) -> &DofHandler<DIM> {
        &self.setup.dof_handler
    }

    pub fn setup(&self) -> &TransportSetup<DIM> {
        &self.setup
    }

    pub fn support_points(&self) -> Vec<[f64; DIM]> {
        self.setup.dof_handler.support_points(&self.setup.mesh, &self.setup.fe)
    }

    /// System matrix of unknown `k`, once assembled.
    pub fn system_matrix(&self, k: usize) -> Option<&crate::matrix::CsrMatrix<f64>> {
        self.systems.get(k).map(|s| &s.ksp.a)
    }

    pub fn report(&self) -> Result<String, TransportError> {
        let report = SolveReport {
            dimension: DIM,
            n_cells: self.setup.mesh.n_cells(),
            n_dofs: self.setup.n_dofs(),
            n_directions: self.setup.index_map.n_dir(),
            n_groups: self.setup.n_group(),
            eigen: self.solved_eigen == Some(true),
            k_eff: self.k_eff(),
            history: &self.state.history,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab() -> TransportProblem<1> {
        let mesh = StructuredMesh::<1>::new([0.0], [1.0], [3]).unwrap();
        let quad = AngularQuadrature::<1>::gauss_legendre_slab(2).unwrap();
        let config = TransportConfig { threads: Some(1), ..Default::default() };
        TransportProblem::new(mesh, vec![Material::new(vec![1.0]).with_fixed_source(vec![1.0])], quad, config).unwrap()
    }

    #[test]
    fn second_assembly_is_rejected() {
        let mut problem = slab();
        problem.assemble().unwrap();
        assert!(matches!(problem.assemble(), Err(TransportError::AlreadyAssembled)));
    }

    #[test]
    fn solve_requires_assembly() {
        let mut problem = slab();
        assert!(matches!(problem.solve(), Err(TransportError::NotAssembled)));
        assert!(problem.angular_flux(0, 0).is_none());
    }

    #[test]
    fn flux_accessors_reject_out_of_range_indices() {
        let mut problem = slab();
        problem.run().unwrap();
        // two directions, one group: (2, 0) must not alias unknown 2 of another group
        assert!(problem.angular_flux(1, 0).is_some());
        assert!(problem.angular_flux(2, 0).is_none());
        assert!(problem.angular_flux(0, 1).is_none());
        assert_eq!(problem.scalar_flux(0).map(<[f64]>::len), Some(6));
        assert!(problem.scalar_flux(1).is_none());
    }

    #[test]
    fn eigen_solve_without_fission_is_rejected() {
        let mut problem = slab();
        problem.assemble().unwrap();
        assert!(matches!(problem.solve_with(true), Err(TransportError::InvalidInput(_))));
    }

    #[test]
    fn scalar_flux_length_is_checked() {
        let mut problem = slab();
        let err = problem.set_scalar_flux(0, vec![1.0; 2]).unwrap_err();
        assert!(matches!(err, TransportError::SizeMismatch { expected: 6, found: 2, .. }));
    }

    #[test]
    fn report_serializes_history() {
        let mut problem = slab();
        problem.run().unwrap();
        assert!(problem.k_eff().is_none());
        let json = problem.report().unwrap();
        assert!(json.contains("\"inner_errors\""));
        assert!(json.contains("\"n_dofs\": 6"));
    }
}
