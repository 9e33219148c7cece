//! Dense LU factorization of small matrix blocks
//!
//! The blocks of a block sparse matrix are `n_var × n_var` with `n_var` in the
//! low single digits, stored row-major in flat slices. Elimination uses row
//! partial pivoting. Rows are only swapped when the candidate pivot is strictly
//! larger in magnitude, so a diagonal block (the unit block left by a pinned
//! Dirichlet row, possibly scaled) is factorized without any swap and maps a
//! zero right-hand side to an exactly zero solution.

use crate::traits::RealField;
use thiserror::Error;

/// Errors that can occur during block factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Block is singular: zero pivot in row {row}")]
    SingularPivot { row: usize },
    #[error("Block dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// LU factorization of one dense block
///
/// `P B = L U`: L is unit lower triangular and stored below the diagonal of
/// `lu`, U is stored on and above it. `perm[i]` is the original row that
/// ended up in row `i`.
#[derive(Debug, Clone)]
pub struct BlockLu<T: RealField> {
    lu: Vec<T>,
    perm: Vec<usize>,
    n: usize,
}

impl<T: RealField> BlockLu<T> {
    /// Factorize a row-major `n × n` block
    pub fn factorize(block: &[T], n: usize) -> Result<Self, BlockError> {
        if block.len() != n * n {
            return Err(BlockError::DimensionMismatch {
                expected: n * n,
                got: block.len(),
            });
        }

        let mut lu = block.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut pivot_row = k;
            for i in (k + 1)..n {
                if lu[i * n + k].abs() > lu[pivot_row * n + k].abs() {
                    pivot_row = i;
                }
            }
            if pivot_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, pivot_row * n + j);
                }
                perm.swap(k, pivot_row);
            }

            let pivot = lu[k * n + k];
            if pivot.abs() < T::min_positive_value() || !pivot.is_finite() {
                return Err(BlockError::SingularPivot { row: k });
            }

            for i in (k + 1)..n {
                let mult = lu[i * n + k] / pivot;
                lu[i * n + k] = mult;

                for j in (k + 1)..n {
                    let update = mult * lu[k * n + j];
                    lu[i * n + j] -= update;
                }
            }
        }

        Ok(Self { lu, perm, n })
    }

    /// Block dimension
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `B x = rhs` in place
    pub fn solve_in_place(&self, rhs: &mut [T]) {
        let n = self.n;
        assert_eq!(rhs.len(), n, "Right-hand side size mismatch");

        if self.perm.iter().enumerate().any(|(i, &p)| i != p) {
            let permuted: Vec<T> = self.perm.iter().map(|&p| rhs[p]).collect();
            rhs.copy_from_slice(&permuted);
        }

        // Forward substitution: Ly = b (L has unit diagonal)
        for i in 0..n {
            let mut sum = rhs[i];
            for j in 0..i {
                sum -= self.lu[i * n + j] * rhs[j];
            }
            rhs[i] = sum;
        }

        // Backward substitution: Ux = y
        for i in (0..n).rev() {
            let mut sum = rhs[i];
            for j in (i + 1)..n {
                sum -= self.lu[i * n + j] * rhs[j];
            }
            rhs[i] = sum / self.lu[i * n + i];
        }
    }

    /// Explicit inverse of the factorized block, row-major
    pub fn inverse(&self) -> Vec<T> {
        let n = self.n;
        let mut inv = vec![T::zero(); n * n];
        let mut column = vec![T::zero(); n];

        for col in 0..n {
            column.iter_mut().for_each(|c| *c = T::zero());
            column[col] = T::one();
            self.solve_in_place(&mut column);
            for row in 0..n {
                inv[row * n + col] = column[row];
            }
        }

        inv
    }
}

/// y = B * x
#[inline]
pub fn block_matvec<T: RealField>(block: &[T], x: &[T], y: &mut [T], n: usize) {
    for i in 0..n {
        let mut sum = T::zero();
        for j in 0..n {
            sum += block[i * n + j] * x[j];
        }
        y[i] = sum;
    }
}

/// y += B * x
#[inline]
pub fn block_matvec_add<T: RealField>(block: &[T], x: &[T], y: &mut [T], n: usize) {
    for i in 0..n {
        let mut sum = T::zero();
        for j in 0..n {
            sum += block[i * n + j] * x[j];
        }
        y[i] += sum;
    }
}

/// y -= B * x
#[inline]
pub fn block_matvec_sub<T: RealField>(block: &[T], x: &[T], y: &mut [T], n: usize) {
    for i in 0..n {
        let mut sum = T::zero();
        for j in 0..n {
            sum += block[i * n + j] * x[j];
        }
        y[i] -= sum;
    }
}

/// C = A * B for row-major `n × n` blocks
pub fn block_matmul<T: RealField>(a: &[T], b: &[T], n: usize) -> Vec<T> {
    let mut c = vec![T::zero(); n * n];
    for i in 0..n {
        for k in 0..n {
            let a_ik = a[i * n + k];
            for j in 0..n {
                c[i * n + j] += a_ik * b[k * n + j];
            }
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_block_solve() {
        let a = [4.0_f64, 1.0, 1.0, 3.0];
        let lu = BlockLu::factorize(&a, 2).expect("Factorization should succeed");

        let mut x = [1.0, 2.0];
        lu.solve_in_place(&mut x);

        let mut ax = [0.0; 2];
        block_matvec(&a, &x, &mut ax, 2);
        assert_relative_eq!(ax[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ax[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_block_inverse() {
        let a = [4.0_f64, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        let inv = BlockLu::factorize(&a, 3)
            .expect("Factorization should succeed")
            .inverse();
        let product = block_matmul(&a, &inv, 3);

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[i * 3 + j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_pinned_row_stays_exactly_zero() {
        // Row 0 is a unit row, as left behind by a Dirichlet row deletion
        let a = [1.0_f64, 0.0, 0.7, 2.5];
        let lu = BlockLu::factorize(&a, 2).expect("Factorization should succeed");

        let mut x = [0.0, 3.0];
        lu.solve_in_place(&mut x);
        assert_eq!(x[0], 0.0);

        let inv = lu.inverse();
        assert_eq!(inv[0], 1.0);
        assert_eq!(inv[1], 0.0);
    }

    #[test]
    fn test_permutation_block_needs_row_swap() {
        let a = [0.0_f64, 1.0, 1.0, 0.0];
        let lu = BlockLu::factorize(&a, 2).expect("Factorization should succeed");

        let mut x = [1.0, 2.0];
        lu.solve_in_place(&mut x);
        assert_eq!(x, [2.0, 1.0]);
        assert_eq!(lu.inverse(), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_small_leading_pivot() {
        // Without the swap the 1e-12 pivot amplifies rounding by 1e12
        let a = [1e-12_f64, 1.0, 1.0, 1.0];
        let lu = BlockLu::factorize(&a, 2).expect("Factorization should succeed");
        let mut x = [1.0, 2.0];
        lu.solve_in_place(&mut x);

        let mut ax = [0.0; 2];
        block_matvec(&a, &x, &mut ax, 2);
        assert_relative_eq!(ax[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ax[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scaled_unit_block_has_no_swap() {
        let a = [2.0_f64, 0.0, 0.0, 2.0];
        let lu = BlockLu::factorize(&a, 2).expect("Factorization should succeed");
        let mut x = [0.0, 3.0];
        lu.solve_in_place(&mut x);
        assert_eq!(x, [0.0, 1.5]);
    }

    #[test]
    fn test_singular_block() {
        let a = [1.0_f64, 2.0, 2.0, 4.0];
        let result = BlockLu::factorize(&a, 2);
        assert_eq!(result.unwrap_err(), BlockError::SingularPivot { row: 1 });
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = [1.0_f64, 2.0, 3.0];
        assert!(matches!(
            BlockLu::factorize(&a, 2),
            Err(BlockError::DimensionMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_matvec_add_sub() {
        let b = [1.0_f64, 2.0, 3.0, 4.0];
        let x = [1.0, 1.0];
        let mut y = [10.0, 10.0];
        block_matvec_add(&b, &x, &mut y, 2);
        assert_eq!(y, [13.0, 17.0]);
        block_matvec_sub(&b, &x, &mut y, 2);
        assert_eq!(y, [10.0, 10.0]);
    }
}
