//! Block Jacobi preconditioner
//!
//! Multiplies every domain block of the residual by the inverted diagonal
//! block of its row. The inverses are the ones cached on the matrix by
//! [`BlockSparseMatrix::build_jacobi_preconditioner`], which must run after
//! the last modification of the matrix.
//!
//! This preconditioner is embarrassingly parallel since every block row is
//! independent.

use crate::sparse::BlockSparseMatrix;
use crate::traits::{Preconditioner, RealField};
use ndarray::Array1;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Block Jacobi preconditioner: M = blockdiag(A)
#[derive(Debug, Clone, Copy)]
pub struct BlockJacobiPreconditioner<'a, T: RealField> {
    matrix: &'a BlockSparseMatrix<T>,
}

impl<'a, T: RealField> BlockJacobiPreconditioner<'a, T> {
    /// Wrap a matrix whose inverse diagonal blocks have been built
    pub fn new(matrix: &'a BlockSparseMatrix<T>) -> Self {
        Self { matrix }
    }
}

impl<T: RealField> Preconditioner<T> for BlockJacobiPreconditioner<'_, T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        let n = self.matrix.n_var();
        let n_domain = self.matrix.n_points_domain();
        assert_eq!(r.len(), self.matrix.n_points() * n, "Residual size mismatch");

        let r_slice = r.as_slice().expect("Array should be contiguous");
        let mut out = Array1::from_elem(r.len(), T::zero());
        let out_slice = out.as_slice_mut().expect("Array should be contiguous");
        let domain = &mut out_slice[..n_domain * n];

        #[cfg(feature = "rayon")]
        {
            if n_domain >= 1000 {
                domain.par_chunks_mut(n).enumerate().for_each(|(row, z)| {
                    self.matrix
                        .apply_inverse_diagonal(row, &r_slice[row * n..(row + 1) * n], z)
                });
                return out;
            }
        }

        for (row, z) in domain.chunks_mut(n).enumerate() {
            self.matrix
                .apply_inverse_diagonal(row, &r_slice[row * n..(row + 1) * n], z);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_block_jacobi_inverts_diagonal() {
        let mut m: BlockSparseMatrix<f64> = BlockSparseMatrix::from_edges(2, 2, 2, vec![(0, 1)]);
        m.add_block(0, 0, &array![[2.0, 1.0], [1.0, 2.0]]);
        m.add_block(0, 1, &array![[9.0, 9.0], [9.0, 9.0]]);
        m.add_block(1, 1, &array![[4.0, 0.0], [0.0, 2.0]]);
        m.build_jacobi_preconditioner();

        let z = BlockJacobiPreconditioner::new(&m).apply(&array![3.0, 3.0, 4.0, 4.0]);
        assert_relative_eq!(z[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(z[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(z[3], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_halo_entries_stay_zero() {
        let mut m: BlockSparseMatrix<f64> = BlockSparseMatrix::from_edges(2, 1, 1, vec![(0, 1)]);
        m.add_block(0, 0, &array![[2.0]]);
        m.add_block(1, 1, &array![[2.0]]);
        m.build_jacobi_preconditioner();

        let z = BlockJacobiPreconditioner::new(&m).apply(&array![4.0, 4.0]);
        assert_eq!(z, array![2.0, 0.0]);
    }
}
