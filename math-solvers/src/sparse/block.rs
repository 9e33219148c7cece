//! Block Compressed Sparse Row (BCSR) matrix
//!
//! Each non-zero entry is a dense `n_var × n_var` block addressed by a
//! (row node, column node) pair. The sparsity pattern is fixed at construction
//! from the mesh connectivity: the diagonal plus both (i, j) and (j, i) for every
//! edge. Accumulation never creates new entries; addressing a pair that is not
//! part of the pattern is a contract violation and panics.
//!
//! Rows `0..n_points_domain` are owned by this partition. Rows beyond that
//! belong to halo nodes: they are stored so that assembly can address them, but
//! the matrix-vector product and all sweeps act on domain rows only and leave
//! the halo entries of their outputs at zero.

use crate::direct::{BlockLu, block_matvec, block_matvec_add, block_matvec_sub};
use crate::traits::{LinearOperator, RealField};
use ndarray::{Array1, Array2, ArrayView2};
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Block sparse matrix with a mesh-derived, immutable sparsity pattern
#[derive(Debug, Clone)]
pub struct BlockSparseMatrix<T: RealField> {
    /// Number of block rows (all nodes, halo included)
    n_points: usize,
    /// Number of block rows owned by this partition
    n_points_domain: usize,
    /// Block dimension
    n_var: usize,
    /// Block row pointers: row_ptrs[i] is the first block of block row i
    row_ptrs: Vec<usize>,
    /// Block column index of every stored block, sorted within a row
    col_indices: Vec<usize>,
    /// Position of the diagonal block of every row
    diag_indices: Vec<usize>,
    /// Block values, `n_var * n_var` per block, row-major inside a block
    values: Vec<T>,
    /// Inverted diagonal blocks, filled by [`Self::build_jacobi_preconditioner`]
    inv_diagonal: Vec<T>,
}

impl<T: RealField> BlockSparseMatrix<T> {
    /// Create a zero matrix whose pattern is the diagonal plus both directions
    /// of every edge
    ///
    /// # Panics
    ///
    /// Panics if an edge references a node outside `0..n_points`, if an edge
    /// connects a node to itself, or if `n_points_domain > n_points`.
    pub fn from_edges<I>(n_points: usize, n_points_domain: usize, n_var: usize, edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        assert!(n_var > 0, "Block dimension must be positive");
        assert!(
            n_points_domain <= n_points,
            "Domain point count {} exceeds point count {}",
            n_points_domain,
            n_points
        );

        let mut rows: Vec<Vec<usize>> = (0..n_points).map(|i| vec![i]).collect();
        for (i, j) in edges {
            assert!(
                i < n_points && j < n_points,
                "Edge ({}, {}) references a node outside 0..{}",
                i,
                j,
                n_points
            );
            assert_ne!(i, j, "Edge connects node {} to itself", i);
            rows[i].push(j);
            rows[j].push(i);
        }

        let mut row_ptrs = Vec::with_capacity(n_points + 1);
        let mut col_indices = Vec::new();
        let mut diag_indices = Vec::with_capacity(n_points);
        row_ptrs.push(0);

        for (i, mut row) in rows.into_iter().enumerate() {
            row.sort_unstable();
            row.dedup();
            let start = col_indices.len();
            let diag_offset = row
                .binary_search(&i)
                .expect("diagonal block is always part of the pattern");
            diag_indices.push(start + diag_offset);
            col_indices.extend(row);
            row_ptrs.push(col_indices.len());
        }

        let block_len = n_var * n_var;
        let values = vec![T::zero(); col_indices.len() * block_len];

        Self {
            n_points,
            n_points_domain,
            n_var,
            row_ptrs,
            col_indices,
            diag_indices,
            values,
            inv_diagonal: vec![T::zero(); n_points * block_len],
        }
    }

    /// Number of block rows
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Number of block rows owned by this partition
    pub fn n_points_domain(&self) -> usize {
        self.n_points_domain
    }

    /// Block dimension
    pub fn n_var(&self) -> usize {
        self.n_var
    }

    /// Number of stored blocks
    pub fn nnz_blocks(&self) -> usize {
        self.col_indices.len()
    }

    /// Range of stored blocks in block row `row`
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// Block column index of stored block `idx`
    #[inline]
    pub fn col_index(&self, idx: usize) -> usize {
        self.col_indices[idx]
    }

    /// Stored block index of (row, col), if the pair is in the pattern
    pub fn block_index(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.n_points {
            return None;
        }
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .binary_search(&col)
            .ok()
            .map(|offset| range.start + offset)
    }

    #[inline]
    fn expect_block_index(&self, row: usize, col: usize) -> usize {
        match self.block_index(row, col) {
            Some(idx) => idx,
            None => panic!(
                "Block ({}, {}) is not part of the sparsity pattern ({} points)",
                row, col, self.n_points
            ),
        }
    }

    /// Flat values of stored block `idx`
    #[inline]
    pub fn block_values(&self, idx: usize) -> &[T] {
        let len = self.n_var * self.n_var;
        &self.values[idx * len..(idx + 1) * len]
    }

    #[inline]
    fn block_values_mut(&mut self, idx: usize) -> &mut [T] {
        let len = self.n_var * self.n_var;
        &mut self.values[idx * len..(idx + 1) * len]
    }

    /// Flat values of the diagonal block of `row`
    #[inline]
    pub fn diagonal_block(&self, row: usize) -> &[T] {
        self.block_values(self.diag_indices[row])
    }

    /// View of block (row, col)
    ///
    /// # Panics
    ///
    /// Panics if the pair is not part of the sparsity pattern.
    pub fn block(&self, row: usize, col: usize) -> ArrayView2<'_, T> {
        let idx = self.expect_block_index(row, col);
        ArrayView2::from_shape((self.n_var, self.n_var), self.block_values(idx))
            .expect("block storage is n_var x n_var")
    }

    /// Stored (column, block) pairs of a block row
    pub fn row_blocks(&self, row: usize) -> impl Iterator<Item = (usize, &[T])> + '_ {
        self.row_range(row)
            .map(move |idx| (self.col_indices[idx], self.block_values(idx)))
    }

    /// Reset every stored block to zero, keeping the pattern
    pub fn set_zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = T::zero());
    }

    fn check_block_shape(&self, block: &ArrayView2<'_, T>) {
        assert_eq!(
            block.dim(),
            (self.n_var, self.n_var),
            "Block shape mismatch: expected {}x{}",
            self.n_var,
            self.n_var
        );
    }

    /// Accumulate `block` into (row, col)
    pub fn add_block(&mut self, row: usize, col: usize, block: &Array2<T>) {
        self.add_block_view(row, col, block.view());
    }

    /// Accumulate `block` into (row, col) from a view
    pub fn add_block_view(&mut self, row: usize, col: usize, block: ArrayView2<'_, T>) {
        self.check_block_shape(&block);
        let idx = self.expect_block_index(row, col);
        for (dst, src) in self.block_values_mut(idx).iter_mut().zip(block.iter()) {
            *dst += *src;
        }
    }

    /// Subtract `block` from (row, col)
    pub fn subtract_block(&mut self, row: usize, col: usize, block: &Array2<T>) {
        self.subtract_block_view(row, col, block.view());
    }

    /// Subtract `block` from (row, col) given as a view
    pub fn subtract_block_view(&mut self, row: usize, col: usize, block: ArrayView2<'_, T>) {
        self.check_block_shape(&block);
        let idx = self.expect_block_index(row, col);
        for (dst, src) in self.block_values_mut(idx).iter_mut().zip(block.iter()) {
            *dst -= *src;
        }
    }

    /// Add `scalar * I` to the diagonal block of `row`
    pub fn add_to_diagonal(&mut self, row: usize, scalar: T) {
        assert!(row < self.n_points, "Row {} out of range", row);
        let n = self.n_var;
        let idx = self.diag_indices[row];
        let block = self.block_values_mut(idx);
        for k in 0..n {
            block[k * n + k] += scalar;
        }
    }

    /// Zero scalar row `total_index = row * n_var + var` across its whole block
    /// row and put a one on its diagonal entry
    pub fn delete_scalar_row(&mut self, total_index: usize) {
        let n = self.n_var;
        let row = total_index / n;
        let var = total_index % n;
        assert!(row < self.n_points, "Scalar row {} out of range", total_index);

        for idx in self.row_range(row) {
            let is_diag = self.col_indices[idx] == row;
            let block = self.block_values_mut(idx);
            for k in 0..n {
                block[var * n + k] = T::zero();
            }
            if is_diag {
                block[var * n + var] = T::one();
            }
        }
    }

    /// Zero the whole block row of `row`
    ///
    /// With `unit_diagonal` the diagonal block becomes the identity, which
    /// forces the linear solve to return a zero increment for a zero right-hand
    /// side at that node.
    pub fn delete_row(&mut self, row: usize, unit_diagonal: bool) {
        assert!(row < self.n_points, "Row {} out of range", row);
        if unit_diagonal {
            for var in 0..self.n_var {
                self.delete_scalar_row(row * self.n_var + var);
            }
        } else {
            let len = self.n_var * self.n_var;
            let range = self.row_range(row);
            self.values[range.start * len..range.end * len]
                .iter_mut()
                .for_each(|v| *v = T::zero());
        }
    }

    /// Factorize and invert every domain diagonal block
    ///
    /// A singular diagonal block is replaced by the identity, so the Jacobi
    /// step leaves that node's components unscaled.
    pub fn build_jacobi_preconditioner(&mut self) {
        let n = self.n_var;
        let len = n * n;
        for row in 0..self.n_points_domain {
            let inverse = match BlockLu::factorize(self.diagonal_block(row), n) {
                Ok(lu) => lu.inverse(),
                Err(err) => {
                    log::warn!("Diagonal block {} not invertible ({}), using identity", row, err);
                    let mut identity = vec![T::zero(); len];
                    for k in 0..n {
                        identity[k * n + k] = T::one();
                    }
                    identity
                }
            };
            self.inv_diagonal[row * len..(row + 1) * len].copy_from_slice(&inverse);
        }
    }

    /// Inverted diagonal block of `row` (valid after [`Self::build_jacobi_preconditioner`])
    #[inline]
    pub fn inverse_diagonal_block(&self, row: usize) -> &[T] {
        let len = self.n_var * self.n_var;
        &self.inv_diagonal[row * len..(row + 1) * len]
    }

    /// out = D_row^-1 * rhs
    #[inline]
    pub fn apply_inverse_diagonal(&self, row: usize, rhs: &[T], out: &mut [T]) {
        block_matvec(self.inverse_diagonal_block(row), rhs, out, self.n_var);
    }

    /// y_row = Σ_j A_row,j x_j over the stored blocks of a domain row
    #[inline]
    fn row_product(&self, row: usize, x: &[T], y_row: &mut [T]) {
        let n = self.n_var;
        y_row.iter_mut().for_each(|v| *v = T::zero());
        for idx in self.row_range(row) {
            let col = self.col_indices[idx];
            block_matvec_add(self.block_values(idx), &x[col * n..(col + 1) * n], y_row, n);
        }
    }

    /// Compute rhs_row - Σ_{j ≠ row} A_row,j x_j into `out`
    #[inline]
    pub fn off_diagonal_residual(&self, row: usize, rhs: &[T], x: &[T], out: &mut [T]) {
        let n = self.n_var;
        out.copy_from_slice(&rhs[row * n..(row + 1) * n]);
        for idx in self.row_range(row) {
            let col = self.col_indices[idx];
            if col != row {
                block_matvec_sub(self.block_values(idx), &x[col * n..(col + 1) * n], out, n);
            }
        }
    }

    /// Matrix-vector product over domain rows: y = A * x, halo entries of y are zero
    ///
    /// Uses parallel processing when the `rayon` feature is enabled and the
    /// matrix is large enough to benefit from parallelization.
    pub fn matvec(&self, x: &Array1<T>) -> Array1<T> {
        let len = self.n_points * self.n_var;
        assert_eq!(x.len(), len, "Input vector size mismatch");

        let mut y = Array1::from_elem(len, T::zero());
        let x_slice = x.as_slice().expect("Array should be contiguous");
        let y_slice = y.as_slice_mut().expect("Array should be contiguous");

        #[cfg(feature = "rayon")]
        {
            if self.n_points_domain >= 1024 {
                self.matvec_parallel(x_slice, y_slice);
                return y;
            }
        }

        self.matvec_sequential(x_slice, y_slice);
        y
    }

    fn matvec_sequential(&self, x: &[T], y: &mut [T]) {
        let n = self.n_var;
        for row in 0..self.n_points_domain {
            self.row_product(row, x, &mut y[row * n..(row + 1) * n]);
        }
    }

    #[cfg(feature = "rayon")]
    fn matvec_parallel(&self, x: &[T], y: &mut [T]) {
        let n = self.n_var;
        y[..self.n_points_domain * n]
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(row, y_row)| self.row_product(row, x, y_row));
    }

    /// Euclidean norm of b - A x over domain rows
    pub fn residual_norm(&self, b: &Array1<T>, x: &Array1<T>) -> T {
        let ax = self.matvec(x);
        let n = self.n_var;
        let mut sum = T::zero();
        for k in 0..self.n_points_domain * n {
            let r = b[k] - ax[k];
            sum += r * r;
        }
        sum.sqrt()
    }

    /// Convert to a dense matrix (for debugging and small tests)
    pub fn to_dense(&self) -> Array2<T> {
        let n = self.n_var;
        let dim = self.n_points * n;
        let mut dense = Array2::from_elem((dim, dim), T::zero());
        for row in 0..self.n_points {
            for (col, block) in self.row_blocks(row) {
                for a in 0..n {
                    for b in 0..n {
                        dense[[row * n + a, col * n + b]] = block[a * n + b];
                    }
                }
            }
        }
        dense
    }
}

impl<T: RealField> LinearOperator<T> for BlockSparseMatrix<T> {
    fn num_rows(&self) -> usize {
        self.n_points * self.n_var
    }

    fn num_cols(&self) -> usize {
        self.n_points * self.n_var
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec(x)
    }
}
