//! Immutable discretization data shared by assembly, source construction and the iterations.

use std::sync::Arc;

use faer::Mat;
use log::info;

use crate::config::{Discretization, TransportConfig};
use crate::dofs::{AffineConstraints, DofHandler};
use crate::error::TransportError;
use crate::fe::{CellValues, FaceValues, QGauss, TensorLagrange};
use crate::matrix::SparsityPattern;
use crate::mesh::StructuredMesh;
use crate::transport::index_map::IndexMap;
use crate::transport::interface::InterfaceTables;
use crate::transport::material::{Material, MaterialLibrary};
use crate::transport::penalty::{characteristic_length, mean_free_paths};
use crate::transport::quadrature::AngularQuadrature;

/// Cell and face matrices that are the same for every (congruent) cell.
#[derive(Debug, Clone)]
pub struct LocalForms {
    /// `∫ φ_i φ_j`
    pub mass: Mat<f64>,
    /// `∫ (Ω_d·∇φ_i)(Ω_d·∇φ_j)` per direction
    pub streaming: Vec<Mat<f64>>,
    /// `∫_f φ_i φ_j` per face
    pub face_mass: Vec<Mat<f64>>,
    /// `∫_f φ_i` per face
    pub face_integrals: Vec<Vec<f64>>,
    /// `∫ φ_i`
    pub shape_integrals: Vec<f64>,
}

pub struct TransportSetup<const DIM: usize> {
    pub mesh: StructuredMesh<DIM>,
    pub materials: MaterialLibrary,
    pub quadrature: AngularQuadrature<DIM>,
    pub config: TransportConfig,
    pub fe: TensorLagrange<DIM>,
    pub cell_values: CellValues<DIM>,
    pub face_values: FaceValues<DIM>,
    pub dof_handler: DofHandler<DIM>,
    pub constraints: AffineConstraints,
    pub index_map: IndexMap,
    pub forms: LocalForms,
    pub interface: InterfaceTables<DIM>,
    /// Penalty-scaled `‖Ω Ωᵀ‖_F` per direction.
    pub tensor_norms: Vec<f64>,
    /// Mean free paths per material and group over the face length.
    pub mean_free_paths: Vec<Vec<f64>>,
    pub pattern: Arc<SparsityPattern>,
}

impl<const DIM: usize> TransportSetup<DIM> {
    pub fn new(
        mesh: StructuredMesh<DIM>,
        materials: Vec<Material>,
        quadrature: AngularQuadrature<DIM>,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        config.validate()?;
        let materials = MaterialLibrary::new(materials, quadrature.total_weight())?;
        if let Some(&m) = mesh.material_ids().iter().find(|&&m| m >= materials.n_materials()) {
            return Err(TransportError::InvalidInput(format!(
                "mesh uses material {m} but only {} are defined",
                materials.n_materials()
            )));
        }
        let n_faces = StructuredMesh::<DIM>::FACES_PER_CELL;
        for &b in config.reflective_boundaries.iter().chain(config.incident_flux.keys()) {
            if b >= n_faces {
                return Err(TransportError::InvalidInput(format!("boundary id {b} does not exist in {DIM} dimensions")));
            }
        }
        for psi in config.incident_flux.values() {
            if psi.len() != materials.n_group() {
                return Err(TransportError::SizeMismatch {
                    what: "incident flux groups",
                    expected: materials.n_group(),
                    found: psi.len(),
                });
            }
        }
        if config.eigen && !materials.any_fissile() {
            return Err(TransportError::InvalidInput("eigenvalue problem without fissile material".into()));
        }

        let p = config.p_order;
        let fe = TensorLagrange::<DIM>::new(p)?;
        let h = mesh.cell_size();
        let cell_values = CellValues::new(&fe, &QGauss::new(p + 1), h);
        let face_values = FaceValues::new(&fe, p + 1, h);
        let dof_handler = DofHandler::distribute(&mesh, &fe, config.discretization);
        let constraints = AffineConstraints::new();
        let pattern = Arc::new(dof_handler.make_sparsity_pattern(&mesh, &constraints));

        let index_map = IndexMap::new(quadrature.n_dir(), materials.n_group())
            .with_reflections(&quadrature, &config.reflective_boundaries)?;

        let directions: Vec<[f64; DIM]> = (0..quadrature.n_dir()).map(|d| quadrature.direction(d)).collect();
        let forms = LocalForms {
            mass: cell_values.mass_matrix(),
            streaming: directions.iter().map(|o| cell_values.streaming_matrix(o)).collect(),
            face_mass: (0..n_faces).map(|f| face_values.mass_matrix(f)).collect(),
            face_integrals: (0..n_faces).map(|f| face_values.face(f).shape_integrals()).collect(),
            shape_integrals: cell_values.shape_integrals(),
        };
        let scale = config.penalty_scale();
        let tensor_norms = (0..quadrature.n_dir()).map(|d| scale * quadrature.tensor_norm(d)).collect();
        let length = characteristic_length(DIM, mesh.diameter());
        let mfp = (0..materials.n_materials())
            .map(|m| mean_free_paths(&materials, m, length))
            .collect();

        info!(
            "{DIM}-D {:?} setup: {} cells, {} dofs, {} directions x {} groups = {} unknowns",
            config.discretization,
            mesh.n_cells(),
            dof_handler.n_dofs(),
            quadrature.n_dir(),
            materials.n_group(),
            index_map.n_total()
        );

        Ok(Self {
            interface: InterfaceTables::new(directions),
            mesh,
            materials,
            quadrature,
            config,
            fe,
            cell_values,
            face_values,
            dof_handler,
            constraints,
            index_map,
            forms,
            tensor_norms,
            mean_free_paths: mfp,
            pattern,
        })
    }

    pub fn n_dofs(&self) -> usize {
        self.dof_handler.n_dofs()
    }

    pub fn n_group(&self) -> usize {
        self.materials.n_group()
    }

    pub fn is_discontinuous(&self) -> bool {
        self.config.discretization == Discretization::Dfem
    }

    /// `Σ_c weight(c) ∫_c u_h`; cells of zero weight are skipped.
    pub fn integrate<F>(&self, u: &[f64], mut weight: F) -> f64
    where
        F: FnMut(usize) -> f64,
    {
        let mut total = 0.0;
        for c in 0..self.mesh.n_cells() {
            let w = weight(c);
            if w == 0.0 {
                continue;
            }
            let cell_integral: f64 = self
                .dof_handler
                .cell_dofs(c)
                .iter()
                .zip(&self.forms.shape_integrals)
                .map(|(&dof, s)| u[dof] * s)
                .sum();
            total += w * cell_integral;
        }
        total
    }

    /// Values of `u` on the dofs of `cell`.
    pub fn cell_values_of(&self, u: &[f64], cell: usize) -> Vec<f64> {
        self.dof_handler.cell_dofs(cell).iter().map(|&d| u[d]).collect()
    }
}
