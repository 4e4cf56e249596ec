//! Vector norms used by the iteration convergence checks.

/// ‖x‖₁
pub fn l1_norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v.abs()).sum()
}

/// ‖new − old‖₁ / ‖new‖₁, or the absolute difference when `new` vanishes.
pub fn relative_l1_difference(new: &[f64], old: &[f64]) -> f64 {
    debug_assert_eq!(new.len(), old.len());
    let diff: f64 = new.iter().zip(old).map(|(a, b)| (a - b).abs()).sum();
    let norm = l1_norm(new);
    if norm > 0.0 { diff / norm } else { diff }
}

/// Largest per-group relative difference between two sets of group vectors.
pub fn max_relative_l1_difference(new: &[Vec<f64>], old: &[Vec<f64>]) -> f64 {
    new.iter()
        .zip(old)
        .map(|(n, o)| relative_l1_difference(n, o))
        .fold(0.0, f64::max)
}
