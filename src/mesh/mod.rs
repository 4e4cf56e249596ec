//! Structured Cartesian meshes in 1, 2 or 3 dimensions.
//!
//! Cells are numbered lexicographically with x running fastest. Face `f` of a cell lies on axis
//! `f / 2`, on the low side when `f` is even and on the high side when odd, so the matching face
//! of the neighbor across face `f` is `f ^ 1`. Boundary faces carry the boundary id `f`:
//! `0/1` low/high x, `2/3` low/high y, `4/5` low/high z.
//!
//! All cells of a mesh are congruent, which lets the finite-element tables be computed once.

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredMesh<const DIM: usize> {
    lower: [f64; DIM],
    upper: [f64; DIM],
    cells_per_axis: [usize; DIM],
    material_ids: Vec<usize>,
}

/// What lies across one face of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceNeighbor {
    Interior(usize),
    Boundary(usize),
}

impl<const DIM: usize> StructuredMesh<DIM> {
    pub const FACES_PER_CELL: usize = 2 * DIM;

    /// Box `[lower, upper]` split into `cells_per_axis` cells, all of material 0.
    pub fn new(lower: [f64; DIM], upper: [f64; DIM], cells_per_axis: [usize; DIM]) -> Result<Self, TransportError> {
        if DIM == 0 || DIM > 3 {
            return Err(TransportError::InvalidInput(format!("unsupported dimension {DIM}")));
        }
        for axis in 0..DIM {
            if !(upper[axis] > lower[axis]) {
                return Err(TransportError::InvalidInput(format!(
                    "empty extent on axis {axis}: [{}, {}]",
                    lower[axis], upper[axis]
                )));
            }
            if cells_per_axis[axis] == 0 {
                return Err(TransportError::InvalidInput(format!("no cells on axis {axis}")));
            }
        }
        let n_cells = cells_per_axis.iter().product();
        Ok(Self { lower, upper, cells_per_axis, material_ids: vec![0; n_cells] })
    }

    /// Assign materials from a coarse layout: `ids` holds one material per coarse block of a
    /// `blocks` grid (x fastest), and every cell takes the id of the block containing its center.
    pub fn set_material_layout(&mut self, blocks: [usize; DIM], ids: &[usize]) -> Result<(), TransportError> {
        let n_blocks: usize = blocks.iter().product();
        if ids.len() != n_blocks {
            return Err(TransportError::SizeMismatch { what: "material layout", expected: n_blocks, found: ids.len() });
        }
        if blocks.contains(&0) {
            return Err(TransportError::InvalidInput("material layout has an empty axis".into()));
        }
        for c in 0..self.n_cells() {
            let idx = self.cell_multi_index(c);
            let mut block = 0;
            let mut stride = 1;
            for axis in 0..DIM {
                // integer arithmetic on doubled coordinates keeps centers off block edges
                let b = ((2 * idx[axis] + 1) * blocks[axis]) / (2 * self.cells_per_axis[axis]);
                block += b * stride;
                stride *= blocks[axis];
            }
            self.material_ids[c] = ids[block];
        }
        Ok(())
    }

    /// Per-cell material ids, x fastest.
    pub fn set_material_ids(&mut self, ids: Vec<usize>) -> Result<(), TransportError> {
        if ids.len() != self.n_cells() {
            return Err(TransportError::SizeMismatch { what: "material ids", expected: self.n_cells(), found: ids.len() });
        }
        self.material_ids = ids;
        Ok(())
    }

    /// Bisect every cell `times` times along each axis; children inherit the parent's material.
    pub fn refine_global(&mut self, times: usize) {
        for _ in 0..times {
            let old_cells = self.cells_per_axis;
            let old_ids = std::mem::take(&mut self.material_ids);
            for n in self.cells_per_axis.iter_mut() {
                *n *= 2;
            }
            let n_new: usize = self.cells_per_axis.iter().product();
            self.material_ids = (0..n_new)
                .map(|c| {
                    let idx = self.cell_multi_index(c);
                    let mut parent = 0;
                    let mut stride = 1;
                    for axis in 0..DIM {
                        parent += (idx[axis] / 2) * stride;
                        stride *= old_cells[axis];
                    }
                    old_ids[parent]
                })
                .collect();
        }
    }

    pub fn n_cells(&self) -> usize {
        self.material_ids.len()
    }

    pub fn cells_per_axis(&self) -> [usize; DIM] {
        self.cells_per_axis
    }

    pub fn lower(&self) -> [f64; DIM] {
        self.lower
    }

    pub fn upper(&self) -> [f64; DIM] {
        self.upper
    }

    pub fn material_id(&self, cell: usize) -> usize {
        self.material_ids[cell]
    }

    pub fn material_ids(&self) -> &[usize] {
        &self.material_ids
    }

    pub fn cell_multi_index(&self, cell: usize) -> [usize; DIM] {
        let mut idx = [0; DIM];
        let mut rest = cell;
        for axis in 0..DIM {
            idx[axis] = rest % self.cells_per_axis[axis];
            rest /= self.cells_per_axis[axis];
        }
        idx
    }

    pub fn cell_index(&self, idx: [usize; DIM]) -> usize {
        let mut cell = 0;
        let mut stride = 1;
        for axis in 0..DIM {
            cell += idx[axis] * stride;
            stride *= self.cells_per_axis[axis];
        }
        cell
    }

    /// Edge lengths shared by every cell.
    pub fn cell_size(&self) -> [f64; DIM] {
        let mut h = [0.0; DIM];
        for axis in 0..DIM {
            h[axis] = (self.upper[axis] - self.lower[axis]) / self.cells_per_axis[axis] as f64;
        }
        h
    }

    /// Length of the cell diagonal.
    pub fn diameter(&self) -> f64 {
        self.cell_size().iter().map(|h| h * h).sum::<f64>().sqrt()
    }

    /// Lowest corner of `cell`.
    pub fn cell_origin(&self, cell: usize) -> [f64; DIM] {
        let idx = self.cell_multi_index(cell);
        let h = self.cell_size();
        let mut x = [0.0; DIM];
        for axis in 0..DIM {
            x[axis] = self.lower[axis] + idx[axis] as f64 * h[axis];
        }
        x
    }

    pub fn neighbor(&self, cell: usize, face: usize) -> FaceNeighbor {
        let axis = face / 2;
        let mut idx = self.cell_multi_index(cell);
        if face % 2 == 0 {
            if idx[axis] == 0 {
                return FaceNeighbor::Boundary(face);
            }
            idx[axis] -= 1;
        } else {
            if idx[axis] + 1 == self.cells_per_axis[axis] {
                return FaceNeighbor::Boundary(face);
            }
            idx[axis] += 1;
        }
        FaceNeighbor::Interior(self.cell_index(idx))
    }

    /// Outward unit normal of face `face`.
    pub fn normal(face: usize) -> [f64; DIM] {
        let mut n = [0.0; DIM];
        n[face / 2] = if face % 2 == 0 { -1.0 } else { 1.0 };
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_and_boundary_ids_2d() {
        let mesh = StructuredMesh::<2>::new([0.0, 0.0], [3.0, 2.0], [3, 2]).unwrap();
        assert_eq!(mesh.n_cells(), 6);
        assert_eq!(mesh.cell_multi_index(4), [1, 1]);
        assert_eq!(mesh.neighbor(4, 0), FaceNeighbor::Interior(3));
        assert_eq!(mesh.neighbor(4, 1), FaceNeighbor::Interior(5));
        assert_eq!(mesh.neighbor(4, 2), FaceNeighbor::Interior(1));
        assert_eq!(mesh.neighbor(4, 3), FaceNeighbor::Boundary(3));
        assert_eq!(mesh.neighbor(0, 0), FaceNeighbor::Boundary(0));
        assert_eq!(StructuredMesh::<2>::normal(2), [0.0, -1.0]);
        assert_eq!(mesh.cell_origin(5), [2.0, 1.0]);
    }

    #[test]
    fn refinement_keeps_material_layout() {
        let mut mesh = StructuredMesh::<1>::new([0.0], [2.0], [2]).unwrap();
        mesh.set_material_layout([2], &[0, 1]).unwrap();
        mesh.refine_global(2);
        assert_eq!(mesh.n_cells(), 8);
        assert_eq!(mesh.material_ids(), &[0, 0, 0, 0, 1, 1, 1, 1]);
        assert!((mesh.diameter() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn layout_on_finer_mesh() {
        let mut mesh = StructuredMesh::<2>::new([0.0, 0.0], [1.0, 1.0], [4, 4]).unwrap();
        mesh.set_material_layout([2, 1], &[3, 7]).unwrap();
        assert_eq!(mesh.material_id(mesh.cell_index([1, 3])), 3);
        assert_eq!(mesh.material_id(mesh.cell_index([2, 0])), 7);
        assert!(mesh.set_material_layout([2, 2], &[0]).is_err());
    }
}
