//! Stationary block iterations
//!
//! - [`sym_gauss_seidel`]: forward then backward block Gauss-Seidel sweeps
//! - [`lu_sgs`]: defect correction with the LU-SGS approximate inverse
//!
//! Both work in place on the solution vector, act on domain rows only and
//! stop on an absolute residual tolerance `||b - A x||_2 < tolerance`. They
//! read the inverted diagonal blocks cached by
//! [`BlockSparseMatrix::build_jacobi_preconditioner`].

use crate::preconditioners::lu_sgs_sweep;
use crate::sparse::BlockSparseMatrix;
use crate::traits::RealField;
use ndarray::Array1;

/// Configuration shared by the stationary methods
#[derive(Debug, Clone)]
pub struct StationaryConfig<R> {
    /// Maximum number of iterations (one iteration = one symmetric pass)
    pub max_iterations: usize,
    /// Absolute tolerance on the residual 2-norm
    pub tolerance: R,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for StationaryConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            print_interval: 0,
        }
    }
}

/// Outcome of a stationary solve; the solution lives in the caller's vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationarySolution<T> {
    /// Number of iterations performed
    pub iterations: usize,
    /// Final absolute residual norm
    pub residual: T,
    /// Whether the tolerance was reached
    pub converged: bool,
}

fn check_sizes<T: RealField>(matrix: &BlockSparseMatrix<T>, b: &Array1<T>, x: &Array1<T>) {
    let len = matrix.n_points() * matrix.n_var();
    assert_eq!(b.len(), len, "Right-hand side size mismatch");
    assert_eq!(x.len(), len, "Solution size mismatch");
}

fn log_progress<T: RealField>(method: &str, iteration: usize, residual: T, print_interval: usize) {
    if print_interval > 0 && iteration % print_interval == 0 {
        log::info!(
            "{} iteration {}: residual = {:.6e}",
            method,
            iteration,
            residual.to_f64().unwrap_or(0.0)
        );
    }
}

/// Symmetric block Gauss-Seidel: x_i = D_i⁻¹ (b_i - Σ_{j≠i} A_ij x_j),
/// sweeping rows upward then downward
pub fn sym_gauss_seidel<T: RealField>(
    matrix: &BlockSparseMatrix<T>,
    b: &Array1<T>,
    x: &mut Array1<T>,
    config: &StationaryConfig<T>,
) -> StationarySolution<T> {
    check_sizes(matrix, b, x);

    let mut residual = matrix.residual_norm(b, x);
    if residual < config.tolerance {
        return StationarySolution {
            iterations: 0,
            residual,
            converged: true,
        };
    }

    let n = matrix.n_var();
    let n_domain = matrix.n_points_domain();
    let mut work = vec![T::zero(); n];

    for iter in 0..config.max_iterations {
        {
            let b_slice = b.as_slice().expect("Array should be contiguous");
            let x_slice = x.as_slice_mut().expect("Array should be contiguous");
            let rows = (0..n_domain).chain((0..n_domain).rev());
            for row in rows {
                matrix.off_diagonal_residual(row, b_slice, x_slice, &mut work);
                matrix.apply_inverse_diagonal(row, &work, &mut x_slice[row * n..(row + 1) * n]);
            }
        }

        residual = matrix.residual_norm(b, x);
        log_progress("Gauss-Seidel", iter + 1, residual, config.print_interval);

        if residual < config.tolerance {
            return StationarySolution {
                iterations: iter + 1,
                residual,
                converged: true,
            };
        }
    }

    StationarySolution {
        iterations: config.max_iterations,
        residual,
        converged: false,
    }
}

/// LU-SGS iteration: x ← x + M⁻¹ (b - A x), M the LU-SGS approximate inverse
pub fn lu_sgs<T: RealField>(
    matrix: &BlockSparseMatrix<T>,
    b: &Array1<T>,
    x: &mut Array1<T>,
    config: &StationaryConfig<T>,
) -> StationarySolution<T> {
    check_sizes(matrix, b, x);

    let n_domain_len = matrix.n_points_domain() * matrix.n_var();
    let mut defect = Array1::from_elem(b.len(), T::zero());
    let mut correction = vec![T::zero(); b.len()];

    for iter in 0..config.max_iterations {
        let ax = matrix.matvec(x);
        for k in 0..n_domain_len {
            defect[k] = b[k] - ax[k];
        }
        let residual = defect.iter().fold(T::zero(), |acc, &d| acc + d * d).sqrt();
        if iter > 0 {
            log_progress("LU-SGS", iter, residual, config.print_interval);
        }
        if residual < config.tolerance {
            return StationarySolution {
                iterations: iter,
                residual,
                converged: true,
            };
        }

        let defect_slice = defect.as_slice().expect("Array should be contiguous");
        lu_sgs_sweep(matrix, defect_slice, &mut correction);
        for (xi, ci) in x.iter_mut().zip(correction.iter()) {
            *xi += *ci;
        }
    }

    let residual = matrix.residual_norm(b, x);
    log_progress("LU-SGS", config.max_iterations, residual, config.print_interval);
    StationarySolution {
        iterations: config.max_iterations,
        residual,
        converged: residual < config.tolerance,
    }
}
