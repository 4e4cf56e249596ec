//! Core linear-algebra traits shared by the solvers, preconditioners and assemblers.

/// Matrix–vector product: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
    /// Compute ‖x‖₁.
    fn l1_norm(&self, x: &V) -> Self::Scalar;
}

/// Access to the main diagonal, used by point-relaxation preconditioners.
pub trait Diagonal<T> {
    fn diagonal(&self) -> Vec<T>;
}
