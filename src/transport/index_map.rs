//! (direction, group) ⇄ unknown bijection and the reflective direction pairing.

use std::collections::BTreeMap;

use log::debug;

use crate::error::TransportError;
use crate::fe::values::dot;
use crate::mesh::StructuredMesh;
use crate::transport::quadrature::AngularQuadrature;

const REFLECTION_TOL: f64 = 1e-10;

/// Group-major numbering: `k = g · n_dir + d`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMap {
    n_dir: usize,
    n_group: usize,
    /// boundary id → reflected direction of every direction
    reflections: BTreeMap<usize, Vec<usize>>,
}

impl IndexMap {
    pub fn new(n_dir: usize, n_group: usize) -> Self {
        Self { n_dir, n_group, reflections: BTreeMap::new() }
    }

    /// Pair every direction with its mirror image `d − 2(n·d)n` on each reflective boundary.
    pub fn with_reflections<const DIM: usize>(
        mut self,
        quadrature: &AngularQuadrature<DIM>,
        boundaries: &[usize],
    ) -> Result<Self, TransportError> {
        for &b in boundaries {
            if b >= StructuredMesh::<DIM>::FACES_PER_CELL {
                return Err(TransportError::InvalidInput(format!(
                    "boundary id {b} does not exist in {DIM} dimensions"
                )));
            }
            let n = StructuredMesh::<DIM>::normal(b);
            let mut map = Vec::with_capacity(self.n_dir);
            for d in 0..self.n_dir {
                let omega = quadrature.direction(d);
                let n_dot = dot(&omega, &n);
                let mut target = omega;
                for (t, ni) in target.iter_mut().zip(&n) {
                    *t -= 2.0 * n_dot * ni;
                }
                let r = (0..self.n_dir)
                    .find(|&r| {
                        quadrature
                            .direction(r)
                            .iter()
                            .zip(&target)
                            .all(|(x, y)| (x - y).abs() < REFLECTION_TOL)
                    })
                    .ok_or_else(|| {
                        TransportError::InvalidInput(format!(
                            "direction {d} has no reflection on boundary {b} in the quadrature set"
                        ))
                    })?;
                map.push(r);
            }
            debug!("reflective boundary {b}: {map:?}");
            self.reflections.insert(b, map);
        }
        Ok(self)
    }

    #[inline]
    pub fn index_of(&self, direction: usize, group: usize) -> usize {
        debug_assert!(direction < self.n_dir && group < self.n_group);
        group * self.n_dir + direction
    }

    /// `None` when either index lies outside the map.
    #[inline]
    pub fn try_index_of(&self, direction: usize, group: usize) -> Option<usize> {
        (direction < self.n_dir && group < self.n_group).then(|| self.index_of(direction, group))
    }

    #[inline]
    pub fn direction_of(&self, unknown: usize) -> usize {
        unknown % self.n_dir
    }

    #[inline]
    pub fn group_of(&self, unknown: usize) -> usize {
        unknown / self.n_dir
    }

    pub fn n_dir(&self) -> usize {
        self.n_dir
    }

    pub fn n_group(&self) -> usize {
        self.n_group
    }

    /// `n_dir · n_group`
    pub fn n_total(&self) -> usize {
        self.n_dir * self.n_group
    }

    pub fn is_reflective(&self, boundary: usize) -> bool {
        self.reflections.contains_key(&boundary)
    }

    pub fn reflected_direction_of(&self, boundary: usize, direction: usize) -> Result<usize, TransportError> {
        self.reflections
            .get(&boundary)
            .map(|map| map[direction])
            .ok_or(TransportError::InvalidBoundary { boundary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_numbering_is_a_bijection() {
        let map = IndexMap::new(8, 3);
        let mut seen = vec![false; map.n_total()];
        for g in 0..3 {
            for d in 0..8 {
                let k = map.index_of(d, g);
                assert_eq!(map.direction_of(k), d);
                assert_eq!(map.group_of(k), g);
                assert!(!seen[k]);
                seen[k] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn out_of_range_pairs_have_no_unknown() {
        let map = IndexMap::new(4, 2);
        assert_eq!(map.try_index_of(3, 1), Some(7));
        // (4, 0) would alias (0, 1) under the raw formula
        assert_eq!(map.try_index_of(4, 0), None);
        assert_eq!(map.try_index_of(0, 2), None);
    }

    #[test]
    fn reflection_is_an_involution() {
        let quad = AngularQuadrature::<2>::product_xy(2, 4).unwrap();
        let map = IndexMap::new(quad.n_dir(), 1).with_reflections(&quad, &[0, 1, 2, 3]).unwrap();
        for b in 0..4 {
            for d in 0..quad.n_dir() {
                let r = map.reflected_direction_of(b, d).unwrap();
                assert_ne!(r, d);
                assert_eq!(map.reflected_direction_of(b, r).unwrap(), d);
            }
        }
    }

    #[test]
    fn non_reflective_boundary_is_rejected() {
        let quad = AngularQuadrature::<1>::gauss_legendre_slab(4).unwrap();
        let map = IndexMap::new(4, 2).with_reflections(&quad, &[0]).unwrap();
        assert_eq!(map.reflected_direction_of(0, 0).unwrap(), 3);
        assert!(matches!(
            map.reflected_direction_of(1, 0),
            Err(TransportError::InvalidBoundary { boundary: 1 })
        ));
        assert!(IndexMap::new(4, 1).with_reflections(&quad, &[2]).is_err());
    }

    #[test]
    fn asymmetric_set_has_no_reflection() {
        let quad = AngularQuadrature::<1>::new(vec![[0.5], [-0.3]], vec![1.0, 1.0]).unwrap();
        assert!(IndexMap::new(2, 1).with_reflections(&quad, &[0]).is_err());
    }
}
