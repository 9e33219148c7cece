//! Core traits for linear algebra operations
//!
//! This module defines the fundamental abstractions used throughout the solver library:
//! - [`RealField`]: Trait for the real scalar types the block solvers work with
//! - [`LinearOperator`]: Trait for matrix-like objects that can perform matrix-vector products
//! - [`Preconditioner`]: Trait for preconditioning operations

use ndarray::Array1;
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::Debug;

/// Trait for scalar types that can be used in the block linear algebra.
///
/// Implemented for every real float type satisfying the bounds, which in
/// practice means `f64` (the default for the transport solvers) and `f32`.
pub trait RealField:
    Float + NumAssign + FromPrimitive + ToPrimitive + Send + Sync + Debug + 'static
{
    /// Convert an `f64` constant into this scalar type
    #[inline]
    fn constant(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::zero)
    }
}

impl<T> RealField for T where
    T: Float + NumAssign + FromPrimitive + ToPrimitive + Send + Sync + Debug + 'static
{
}

/// Trait for linear operators (matrices) that can perform matrix-vector products.
///
/// This abstraction lets the Krylov solvers work with the block sparse matrix
/// and with test operators interchangeably.
pub trait LinearOperator<T: RealField>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner M approximates A^(-1), so that M*A is better conditioned
/// than A alone. It never modifies A or the right-hand side.
pub trait Preconditioner<T: RealField>: Send + Sync {
    /// Apply the preconditioner: y = M * r
    ///
    /// This should approximate solving A * y = r
    fn apply(&self, r: &Array1<T>) -> Array1<T>;
}

/// Identity preconditioner (no preconditioning)
#[derive(Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl<T: RealField> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        r.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_real_field_constant() {
        let x: f64 = RealField::constant(0.25);
        assert_relative_eq!(x, 0.25);
        let y: f32 = RealField::constant(1.5);
        assert_relative_eq!(y, 1.5_f32);
    }

    #[test]
    fn test_identity_preconditioner() {
        let precond = IdentityPreconditioner;
        let r = Array1::from_vec(vec![1.0_f64, -2.0, 3.5]);
        let y = precond.apply(&r);
        assert_eq!(r, y);
    }
}
