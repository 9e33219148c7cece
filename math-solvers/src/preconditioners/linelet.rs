//! Linelet preconditioner
//!
//! Nodes are grouped into lines (chains of mesh neighbours marching away from
//! a wall). Along each line the block-tridiagonal restriction of A is solved
//! exactly with the block Thomas algorithm; nodes on no line fall back to
//! block Jacobi.
//!
//! The line factorization is computed once in [`LineletPreconditioner::new`]:
//!
//! ```text
//! D'_0 = D_0
//! D'_k = D_k - L_k D'_{k-1}⁻¹ U_{k-1}
//! ```
//!
//! where `L_k = A(p_k, p_{k-1})` and `U_k = A(p_k, p_{k+1})`.

use crate::direct::{BlockError, BlockLu, block_matmul, block_matvec, block_matvec_sub};
use crate::sparse::BlockSparseMatrix;
use crate::traits::{Preconditioner, RealField};
use ndarray::Array1;

/// Factorized block-tridiagonal system along one line
#[derive(Debug, Clone)]
struct LineFactor<T: RealField> {
    nodes: Vec<usize>,
    /// L_k for k >= 1, flat
    lower: Vec<T>,
    /// U_k for k < len - 1, flat
    upper: Vec<T>,
    /// D'_k⁻¹, flat
    inv_pivots: Vec<T>,
}

/// Block-tridiagonal line solver with Jacobi fallback off the lines
#[derive(Debug, Clone)]
pub struct LineletPreconditioner<'a, T: RealField> {
    matrix: &'a BlockSparseMatrix<T>,
    lines: Vec<LineFactor<T>>,
    on_line: Vec<bool>,
}

impl<'a, T: RealField> LineletPreconditioner<'a, T> {
    /// Factorize the matrix restricted to `lines`
    ///
    /// The matrix must already carry its inverse diagonal blocks (see
    /// [`BlockSparseMatrix::build_jacobi_preconditioner`]) for the nodes that
    /// are not on a line.
    ///
    /// # Panics
    ///
    /// Panics if a line contains a halo node, if a node is on two lines, or if
    /// two consecutive nodes of a line are not coupled in the matrix pattern.
    pub fn new(matrix: &'a BlockSparseMatrix<T>, lines: &[Vec<usize>]) -> Result<Self, BlockError> {
        let n = matrix.n_var();
        let len = n * n;
        let n_domain = matrix.n_points_domain();
        let mut on_line = vec![false; n_domain];
        let mut factors = Vec::with_capacity(lines.len());

        for line in lines.iter().filter(|line| !line.is_empty()) {
            for &node in line {
                assert!(node < n_domain, "Line node {} is not a domain node", node);
                assert!(!on_line[node], "Node {} belongs to more than one line", node);
                on_line[node] = true;
            }

            let m = line.len();
            let mut lower = vec![T::zero(); m * len];
            let mut upper = vec![T::zero(); m * len];
            let mut inv_pivots = vec![T::zero(); m * len];

            for k in 0..m {
                let node = line[k];
                if k > 0 {
                    let view = matrix.block(node, line[k - 1]);
                    lower[k * len..(k + 1) * len].iter_mut().zip(view.iter()).for_each(|(d, s)| *d = *s);
                }
                if k + 1 < m {
                    let view = matrix.block(node, line[k + 1]);
                    upper[k * len..(k + 1) * len].iter_mut().zip(view.iter()).for_each(|(d, s)| *d = *s);
                }

                let mut pivot = matrix.diagonal_block(node).to_vec();
                if k > 0 {
                    // D'_k = D_k - L_k D'_{k-1}⁻¹ U_{k-1}
                    let coupling = block_matmul(
                        &inv_pivots[(k - 1) * len..k * len],
                        &upper[(k - 1) * len..k * len],
                        n,
                    );
                    let correction = block_matmul(&lower[k * len..(k + 1) * len], &coupling, n);
                    pivot.iter_mut().zip(correction.iter()).for_each(|(p, c)| *p -= *c);
                }

                let inverse = BlockLu::factorize(&pivot, n)?.inverse();
                inv_pivots[k * len..(k + 1) * len].copy_from_slice(&inverse);
            }

            factors.push(LineFactor {
                nodes: line.clone(),
                lower,
                upper,
                inv_pivots,
            });
        }

        log::debug!(
            "Linelet preconditioner: {} lines covering {} of {} domain nodes",
            factors.len(),
            on_line.iter().filter(|&&b| b).count(),
            n_domain
        );

        Ok(Self {
            matrix,
            lines: factors,
            on_line,
        })
    }

    /// Number of factorized lines
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
}

impl<T: RealField> Preconditioner<T> for LineletPreconditioner<'_, T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        let n = self.matrix.n_var();
        let len = n * n;
        assert_eq!(r.len(), self.matrix.n_points() * n, "Residual size mismatch");

        let r_slice = r.as_slice().expect("Array should be contiguous");
        let mut out = Array1::from_elem(r.len(), T::zero());
        let z = out.as_slice_mut().expect("Array should be contiguous");

        for (row, &lined) in self.on_line.iter().enumerate() {
            if !lined {
                self.matrix
                    .apply_inverse_diagonal(row, &r_slice[row * n..(row + 1) * n], &mut z[row * n..(row + 1) * n]);
            }
        }

        let mut y: Vec<T> = Vec::new();
        let mut work = vec![T::zero(); n];
        for line in &self.lines {
            let m = line.nodes.len();
            y.clear();
            y.resize(m * n, T::zero());

            // Forward elimination: y_k = r_k - L_k D'_{k-1}⁻¹ y_{k-1}
            for (k, &node) in line.nodes.iter().enumerate() {
                y[k * n..(k + 1) * n].copy_from_slice(&r_slice[node * n..(node + 1) * n]);
                if k > 0 {
                    block_matvec(&line.inv_pivots[(k - 1) * len..k * len], &y[(k - 1) * n..k * n], &mut work, n);
                    let (_, current) = y.split_at_mut(k * n);
                    block_matvec_sub(&line.lower[k * len..(k + 1) * len], &work, &mut current[..n], n);
                }
            }

            // Back substitution: z_k = D'_k⁻¹ (y_k - U_k z_{k+1})
            for k in (0..m).rev() {
                let node = line.nodes[k];
                work.copy_from_slice(&y[k * n..(k + 1) * n]);
                if k + 1 < m {
                    let next = line.nodes[k + 1];
                    block_matvec_sub(&line.upper[k * len..(k + 1) * len], &z[next * n..(next + 1) * n], &mut work, n);
                }
                block_matvec(&line.inv_pivots[k * len..(k + 1) * len], &work, &mut z[node * n..(node + 1) * n], n);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn tridiagonal(n_points: usize) -> BlockSparseMatrix<f64> {
        let edges: Vec<(usize, usize)> = (0..n_points - 1).map(|i| (i, i + 1)).collect();
        let mut m = BlockSparseMatrix::from_edges(n_points, n_points, 2, edges);
        for i in 0..n_points {
            m.add_block(i, i, &array![[4.0, 1.0], [0.5, 3.0]]);
            if i + 1 < n_points {
                m.add_block(i, i + 1, &array![[-1.0, 0.2], [0.0, -1.0]]);
                m.add_block(i + 1, i, &array![[-1.0, 0.0], [0.3, -1.0]]);
            }
        }
        m.build_jacobi_preconditioner();
        m
    }

    #[test]
    fn test_single_line_is_exact_solve() {
        let m = tridiagonal(4);
        let precond = LineletPreconditioner::new(&m, &[vec![0, 1, 2, 3]]).expect("factorization");
        assert_eq!(precond.num_lines(), 1);

        let b = array![1.0, -2.0, 0.5, 3.0, -1.0, 2.0, 4.0, 0.0];
        let x = precond.apply(&b);
        let ax = m.matvec(&x);
        for k in 0..b.len() {
            assert_relative_eq!(ax[k], b[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reversed_line_is_exact_solve() {
        let m = tridiagonal(3);
        let precond = LineletPreconditioner::new(&m, &[vec![2, 1, 0]]).expect("factorization");
        let b = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ax = m.matvec(&precond.apply(&b));
        for k in 0..b.len() {
            assert_relative_eq!(ax[k], b[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_no_lines_reduces_to_jacobi() {
        let m = tridiagonal(3);
        let precond = LineletPreconditioner::new(&m, &[]).expect("factorization");
        let b = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let z = precond.apply(&b);

        let mut expected = [0.0; 2];
        for row in 0..3 {
            m.apply_inverse_diagonal(row, &[b[2 * row], b[2 * row + 1]], &mut expected);
            assert_relative_eq!(z[2 * row], expected[0], epsilon = 1e-14);
            assert_relative_eq!(z[2 * row + 1], expected[1], epsilon = 1e-14);
        }
    }

    #[test]
    #[should_panic(expected = "more than one line")]
    fn test_overlapping_lines_panic() {
        let m = tridiagonal(3);
        let _ = LineletPreconditioner::new(&m, &[vec![0, 1], vec![1, 2]]);
    }
}
