//! Interior-penalty coefficient for the discontinuous discretization.

use crate::transport::material::MaterialLibrary;

/// Lower bound of the penalty, keeping the form coercive in optically thin cells.
pub const PENALTY_FLOOR: f64 = 0.25;

/// Face-appropriate length of a cell: the diameter in 1-D, `diameter/√2` otherwise.
pub fn characteristic_length(dim: usize, diameter: f64) -> f64 {
    if dim == 1 { diameter } else { diameter / std::f64::consts::SQRT_2 }
}

/// `σt(m, g) · length` for every group.
pub fn mean_free_paths(materials: &MaterialLibrary, material: usize, length: f64) -> Vec<f64> {
    (0..materials.n_group())
        .map(|g| materials.sigma_t(material, g) * length)
        .collect()
}

/// `max(0.25, τ/mfp_a + τ/mfp_b)`; a side whose mean free path is zero or not finite adds nothing.
pub fn penalty_coefficient(tensor_norm: f64, mfp_a: f64, mfp_b: f64) -> f64 {
    let term = |mfp: f64| if mfp > 0.0 && mfp.is_finite() { tensor_norm / mfp } else { 0.0 };
    let sigma = term(mfp_a) + term(mfp_b);
    if sigma.is_finite() { sigma.max(PENALTY_FLOOR) } else { PENALTY_FLOOR }
}
