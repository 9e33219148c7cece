//! BiCGSTAB (Bi-Conjugate Gradient Stabilized) solver
//!
//! BiCGSTAB is a Krylov subspace method for non-symmetric systems.
//! The preconditioned variant applies M on the right, so the residual it
//! monitors is the true residual b - A x.

use crate::blas_helpers::{axpy, inner_product, vector_norm};
use crate::traits::{IdentityPreconditioner, LinearOperator, Preconditioner, RealField};
use ndarray::Array1;

/// BiCGSTAB solver configuration
#[derive(Debug, Clone)]
pub struct BiCgstabConfig<R> {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative tolerance for convergence
    pub tolerance: R,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for BiCgstabConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            print_interval: 0,
        }
    }
}

/// BiCGSTAB solver result
#[derive(Debug)]
pub struct BiCgstabSolution<T: RealField> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: T,
    /// Whether convergence was achieved
    pub converged: bool,
}

/// Solve Ax = b using the BiCGSTAB method
pub fn bicgstab<T, A>(
    operator: &A,
    b: &Array1<T>,
    config: &BiCgstabConfig<T>,
) -> BiCgstabSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
{
    bicgstab_preconditioned(operator, &IdentityPreconditioner, b, None, config)
}

/// Solve Ax = b using right-preconditioned BiCGSTAB with an optional initial guess
pub fn bicgstab_preconditioned<T, A, P>(
    operator: &A,
    precond: &P,
    b: &Array1<T>,
    x0: Option<&Array1<T>>,
    config: &BiCgstabConfig<T>,
) -> BiCgstabSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
    P: Preconditioner<T>,
{
    let n = b.len();
    assert_eq!(operator.num_rows(), n, "Operator rows do not match right-hand side");
    assert_eq!(operator.num_cols(), n, "BiCGSTAB needs a square operator");
    let mut x = match x0 {
        Some(guess) => guess.clone(),
        None => Array1::from_elem(n, T::zero()),
    };

    let b_norm = vector_norm(b);
    let tol_threshold = T::constant(1e-15);
    if b_norm < tol_threshold {
        return BiCgstabSolution {
            x,
            iterations: 0,
            residual: T::zero(),
            converged: true,
        };
    }

    // Initial residual
    let mut r = match x0 {
        Some(_) => b - &operator.apply(&x),
        None => b.clone(),
    };
    let r0 = r.clone(); // Shadow residual

    let breakdown = T::constant(1e-30);
    let mut rho = T::one();
    let mut alpha = T::one();
    let mut omega = T::one();

    let mut p = Array1::from_elem(n, T::zero());
    let mut v = Array1::from_elem(n, T::zero());

    for iter in 0..config.max_iterations {
        let rho_new = inner_product(&r0, &r);

        // Check for breakdown
        if rho_new.abs() < breakdown {
            log::warn!("BiCGSTAB breakdown (rho = 0) at iteration {}", iter);
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }

        let beta = (rho_new / rho) * (alpha / omega);
        rho = rho_new;

        // p = r + beta * (p - omega * v)
        axpy(-omega, &v, &mut p);
        p.mapv_inplace(|pi| pi * beta);
        p += &r;

        // v = A * M * p
        let p_hat = precond.apply(&p);
        v = operator.apply(&p_hat);

        let r0v = inner_product(&r0, &v);
        if r0v.abs() < breakdown {
            log::warn!("BiCGSTAB breakdown (r0·v = 0) at iteration {}", iter);
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }

        alpha = rho / r0v;

        // s = r - alpha * v
        let mut s = r.clone();
        axpy(-alpha, &v, &mut s);

        // Check for early convergence
        let s_norm = vector_norm(&s);
        if s_norm / b_norm < config.tolerance {
            axpy(alpha, &p_hat, &mut x);
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: s_norm / b_norm,
                converged: true,
            };
        }

        // t = A * M * s
        let s_hat = precond.apply(&s);
        let t = operator.apply(&s_hat);

        // omega = (t, s) / (t, t)
        let tt = inner_product(&t, &t);
        if tt.abs() < breakdown {
            log::warn!("BiCGSTAB breakdown (t·t = 0) at iteration {}", iter);
            return BiCgstabSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }
        omega = inner_product(&t, &s) / tt;

        // x = x + alpha * p_hat + omega * s_hat
        axpy(alpha, &p_hat, &mut x);
        axpy(omega, &s_hat, &mut x);

        // r = s - omega * t
        r = s;
        axpy(-omega, &t, &mut r);

        let rel_residual = vector_norm(&r) / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "BiCGSTAB iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual.to_f64().unwrap_or(0.0)
            );
        }

        if rel_residual < config.tolerance {
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: true,
            };
        }

        // Check for stagnation
        if omega.abs() < breakdown {
            return BiCgstabSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: false,
            };
        }
    }

    let rel_residual = vector_norm(&r) / b_norm;
    BiCgstabSolution {
        x,
        iterations: config.max_iterations,
        residual: rel_residual,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::BlockSparseMatrix;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_by_two() -> BlockSparseMatrix<f64> {
        let mut a = BlockSparseMatrix::from_edges(2, 2, 1, vec![(0, 1)]);
        a.add_block(0, 0, &array![[4.0]]);
        a.add_block(0, 1, &array![[1.0]]);
        a.add_block(1, 0, &array![[1.0]]);
        a.add_block(1, 1, &array![[3.0]]);
        a
    }

    #[test]
    fn test_bicgstab_simple() {
        let a = two_by_two();
        let b = array![1.0, 2.0];

        let config = BiCgstabConfig {
            max_iterations: 100,
            tolerance: 1e-10,
            print_interval: 0,
        };

        let solution = bicgstab(&a, &b, &config);

        assert!(solution.converged, "BiCGSTAB should converge");

        let ax = a.matvec(&solution.x);
        let error: f64 = (&ax - &b).iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!(error < 1e-8, "Solution should satisfy Ax = b");
    }

    #[test]
    fn test_bicgstab_zero_rhs() {
        let a = two_by_two();
        let b = array![0.0, 0.0];
        let solution = bicgstab(&a, &b, &BiCgstabConfig::default());
        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
        assert_relative_eq!(solution.x[0], 0.0);
    }

    #[test]
    fn test_bicgstab_iteration_cap() {
        let a = two_by_two();
        let b = array![1.0, 2.0];
        let config = BiCgstabConfig {
            max_iterations: 1,
            tolerance: 1e-30,
            print_interval: 0,
        };
        let solution = bicgstab(&a, &b, &config);
        assert!(solution.iterations <= 1);
    }
}
