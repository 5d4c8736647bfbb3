//! Kernel trait definition

/// Kernel function trait
///
/// A kernel function K(x, y) is expected to produce a positive semi-definite
/// Gram matrix; the solvers assume it but never verify it.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[f64], y: &[f64]) -> f64;

    /// K(x, x)
    fn compute_diag(&self, x: &[f64]) -> f64 {
        self.compute(x, x)
    }
}
