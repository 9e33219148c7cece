//! LU-SGS (lower-upper symmetric Gauss-Seidel) preconditioner
//!
//! One symmetric block Gauss-Seidel pass with a zero starting guess:
//!
//! - forward:  (D + L) y = r
//! - backward: (D + U) z = D y
//!
//! Only domain rows and domain neighbours take part; halo entries of the
//! output are zero. The inverted diagonal blocks cached on the matrix by
//! [`BlockSparseMatrix::build_jacobi_preconditioner`] are reused.

use crate::direct::block_matvec_sub;
use crate::sparse::BlockSparseMatrix;
use crate::traits::{Preconditioner, RealField};
use ndarray::Array1;

/// Apply one forward/backward LU-SGS pass: `out ≈ A⁻¹ r`
///
/// `r` and `out` span all points, halo included.
pub fn lu_sgs_sweep<T: RealField>(matrix: &BlockSparseMatrix<T>, r: &[T], out: &mut [T]) {
    let n = matrix.n_var();
    let n_domain = matrix.n_points_domain();
    assert_eq!(r.len(), matrix.n_points() * n, "Residual size mismatch");
    assert_eq!(out.len(), r.len(), "Output size mismatch");

    out.iter_mut().for_each(|v| *v = T::zero());
    let mut work = vec![T::zero(); n];

    // Forward: y_i = D_i⁻¹ (r_i - Σ_{j<i} A_ij y_j)
    for row in 0..n_domain {
        work.copy_from_slice(&r[row * n..(row + 1) * n]);
        for idx in matrix.row_range(row) {
            let col = matrix.col_index(idx);
            if col < row {
                block_matvec_sub(matrix.block_values(idx), &out[col * n..(col + 1) * n], &mut work, n);
            }
        }
        matrix.apply_inverse_diagonal(row, &work, &mut out[row * n..(row + 1) * n]);
    }

    // Backward: z_i = y_i - D_i⁻¹ Σ_{j>i} A_ij z_j
    let mut correction = vec![T::zero(); n];
    for row in (0..n_domain).rev() {
        work.iter_mut().for_each(|v| *v = T::zero());
        let mut coupled = false;
        for idx in matrix.row_range(row) {
            let col = matrix.col_index(idx);
            if col > row && col < n_domain {
                block_matvec_sub(matrix.block_values(idx), &out[col * n..(col + 1) * n], &mut work, n);
                coupled = true;
            }
        }
        if coupled {
            matrix.apply_inverse_diagonal(row, &work, &mut correction);
            for (dst, c) in out[row * n..(row + 1) * n].iter_mut().zip(correction.iter()) {
                *dst += *c;
            }
        }
    }
}

/// LU-SGS preconditioner borrowing a factorized block matrix
#[derive(Debug, Clone, Copy)]
pub struct LuSgsPreconditioner<'a, T: RealField> {
    matrix: &'a BlockSparseMatrix<T>,
}

impl<'a, T: RealField> LuSgsPreconditioner<'a, T> {
    /// Wrap a matrix whose inverse diagonal blocks have been built
    pub fn new(matrix: &'a BlockSparseMatrix<T>) -> Self {
        Self { matrix }
    }
}

impl<T: RealField> Preconditioner<T> for LuSgsPreconditioner<'_, T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        let mut out = Array1::from_elem(r.len(), T::zero());
        let r_slice = r.as_slice().expect("Array should be contiguous");
        let out_slice = out.as_slice_mut().expect("Array should be contiguous");
        lu_sgs_sweep(self.matrix, r_slice, out_slice);
        out
    }
}
