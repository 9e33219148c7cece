//! Vector kernels shared by the iterative solvers
//!
//! Plain Rust loops over `ndarray` storage; the block systems solved here are
//! small enough per partition that BLAS dispatch does not pay for itself.

use crate::traits::RealField;
use ndarray::Array1;

/// Compute inner product (x, y) = Σ x_i * y_i
#[inline]
pub fn inner_product<T: RealField>(x: &Array1<T>, y: &Array1<T>) -> T {
    assert_eq!(
        x.len(),
        y.len(),
        "Vector lengths must match for inner product"
    );
    let mut sum = T::zero();
    for (xi, yi) in x.iter().zip(y.iter()) {
        sum += *xi * *yi;
    }
    sum
}

/// Compute vector 2-norm: ||x||_2 = sqrt(Σ x_i^2)
#[inline]
pub fn vector_norm<T: RealField>(x: &Array1<T>) -> T {
    vector_norm_sqr(x).sqrt()
}

/// Compute vector norm squared: ||x||_2^2 = Σ x_i^2
#[inline]
pub fn vector_norm_sqr<T: RealField>(x: &Array1<T>) -> T {
    let mut sum = T::zero();
    for xi in x.iter() {
        sum += *xi * *xi;
    }
    sum
}

/// Compute axpy: y = α * x + y
#[inline]
pub fn axpy<T: RealField>(alpha: T, x: &Array1<T>, y: &mut Array1<T>) {
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * *xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_inner_product() {
        let x = array![1.0_f64, 2.0, 3.0];
        let y = array![4.0_f64, -5.0, 6.0];
        assert_relative_eq!(inner_product(&x, &y), 12.0);
    }

    #[test]
    fn test_vector_norm() {
        let x = array![3.0_f64, 4.0];
        assert_relative_eq!(vector_norm(&x), 5.0);
        assert_relative_eq!(vector_norm_sqr(&x), 25.0);
    }

    #[test]
    fn test_axpy() {
        let x = array![1.0_f64, 2.0];
        let mut y = array![10.0_f64, 20.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, array![12.0, 24.0]);
    }
}
