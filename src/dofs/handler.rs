//! Degree-of-freedom numbering for continuous and discontinuous Lagrange spaces.

use crate::config::Discretization;
use crate::dofs::constraints::AffineConstraints;
use crate::fe::TensorLagrange;
use crate::matrix::{DynamicSparsityPattern, SparsityPattern};
use crate::mesh::{FaceNeighbor, StructuredMesh};

/// Cell → global dof map.
///
/// DFEM gives every cell its own block `c · dofs_per_cell ..`. CFEM numbers the nodes of the global
/// lattice of `cells · p + 1` points per axis lexicographically, so neighboring cells share the
/// nodes on their common face.
#[derive(Debug, Clone)]
pub struct DofHandler<const DIM: usize> {
    discretization: Discretization,
    dofs_per_cell: usize,
    n_dofs: usize,
    cell_dofs: Vec<usize>,
}

impl<const DIM: usize> DofHandler<DIM> {
    pub fn distribute(mesh: &StructuredMesh<DIM>, fe: &TensorLagrange<DIM>, discretization: Discretization) -> Self {
        let dofs_per_cell = fe.dofs_per_cell();
        let n_cells = mesh.n_cells();
        let mut cell_dofs = Vec::with_capacity(n_cells * dofs_per_cell);
        let n_dofs = match discretization {
            Discretization::Dfem => {
                cell_dofs.extend(0..n_cells * dofs_per_cell);
                n_cells * dofs_per_cell
            }
            Discretization::Cfem => {
                let p = fe.degree();
                let nodes_per_axis = mesh.cells_per_axis().map(|n| n * p + 1);
                for c in 0..n_cells {
                    let cell_idx = mesh.cell_multi_index(c);
                    for i in 0..dofs_per_cell {
                        let local = fe.node_multi_index(i);
                        let mut global = 0;
                        let mut stride = 1;
                        for axis in 0..DIM {
                            global += (cell_idx[axis] * p + local[axis]) * stride;
                            stride *= nodes_per_axis[axis];
                        }
                        cell_dofs.push(global);
                    }
                }
                nodes_per_axis.iter().product()
            }
        };
        Self { discretization, dofs_per_cell, n_dofs, cell_dofs }
    }

    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    pub fn dofs_per_cell(&self) -> usize {
        self.dofs_per_cell
    }

    pub fn discretization(&self) -> Discretization {
        self.discretization
    }

    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        &self.cell_dofs[cell * self.dofs_per_cell..(cell + 1) * self.dofs_per_cell]
    }

    /// Real-space location of every dof.
    pub fn support_points(&self, mesh: &StructuredMesh<DIM>, fe: &TensorLagrange<DIM>) -> Vec<[f64; DIM]> {
        let h = mesh.cell_size();
        let mut points = vec![[0.0; DIM]; self.n_dofs];
        for c in 0..mesh.n_cells() {
            let origin = mesh.cell_origin(c);
            for (i, &dof) in self.cell_dofs(c).iter().enumerate() {
                let unit = fe.unit_support_point(i);
                for axis in 0..DIM {
                    points[dof][axis] = origin[axis] + unit[axis] * h[axis];
                }
            }
        }
        points
    }

    /// Couplings of the cell matrices, plus the face-neighbor blocks for DFEM.
    pub fn make_sparsity_pattern(&self, mesh: &StructuredMesh<DIM>, constraints: &AffineConstraints) -> SparsityPattern {
        let mut dsp = DynamicSparsityPattern::new(self.n_dofs);
        let expand = |dofs: &[usize]| -> Vec<usize> {
            let mut out: Vec<usize> = dofs
                .iter()
                .flat_map(|&d| constraints.resolve(d).into_iter().map(|(j, _)| j))
                .collect();
            out.sort_unstable();
            out.dedup();
            out
        };
        for c in 0..mesh.n_cells() {
            let own = expand(self.cell_dofs(c));
            dsp.add_entries(&own, &own);
            if self.discretization == Discretization::Dfem {
                for face in 0..StructuredMesh::<DIM>::FACES_PER_CELL {
                    if let FaceNeighbor::Interior(nb) = mesh.neighbor(c, face) {
                        let other = expand(self.cell_dofs(nb));
                        dsp.add_entries(&own, &other);
                    }
                }
            }
        }
        dsp.compress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dof_counts() {
        let mesh = StructuredMesh::<2>::new([0.0, 0.0], [1.0, 1.0], [3, 2]).unwrap();
        let fe = TensorLagrange::<2>::new(2).unwrap();
        let dg = DofHandler::distribute(&mesh, &fe, Discretization::Dfem);
        let cg = DofHandler::distribute(&mesh, &fe, Discretization::Cfem);
        assert_eq!(dg.n_dofs(), 6 * 9);
        assert_eq!(cg.n_dofs(), 7 * 5);
        // cells 0 and 1 share the three nodes on x = 1/3
        let left = cg.cell_dofs(0);
        let right = cg.cell_dofs(1);
        assert_eq!([left[2], left[5], left[8]], [right[0], right[3], right[6]]);
    }

    #[test]
    fn support_points_follow_the_lattice() {
        let mesh = StructuredMesh::<1>::new([0.0], [2.0], [2]).unwrap();
        let fe = TensorLagrange::<1>::new(2).unwrap();
        let cg = DofHandler::distribute(&mesh, &fe, Discretization::Cfem);
        let pts = cg.support_points(&mesh, &fe);
        assert_eq!(pts, vec![[0.0], [0.5], [1.0], [1.5], [2.0]]);
    }

    #[test]
    fn flux_pattern_couples_face_neighbors() {
        let mesh = StructuredMesh::<1>::new([0.0], [1.0], [3]).unwrap();
        let fe = TensorLagrange::<1>::new(1).unwrap();
        let constraints = AffineConstraints::new();
        let dg = DofHandler::distribute(&mesh, &fe, Discretization::Dfem);
        let pattern = dg.make_sparsity_pattern(&mesh, &constraints);
        // middle cell couples to both neighbors: 2 + 2 + 2 entries per row
        assert_eq!(pattern.row(2).len(), 6);
        assert_eq!(pattern.row(0).len(), 4);
        let cg = DofHandler::distribute(&mesh, &fe, Discretization::Cfem);
        assert_eq!(cg.make_sparsity_pattern(&mesh, &constraints).n_nonzero(), 4 + 3 + 3);
    }
}
