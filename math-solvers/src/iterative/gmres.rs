//! GMRES (Generalized Minimal Residual) solver
//!
//! Implementation of the restarted GMRES algorithm based on Saad & Schultz (1986).
//!
//! GMRES is often the best choice for large non-symmetric systems.
//! It minimizes the residual in a Krylov subspace and has smooth, monotonic
//! convergence behavior.

use crate::blas_helpers::{axpy, inner_product, vector_norm};
use crate::traits::{IdentityPreconditioner, LinearOperator, Preconditioner, RealField};
use ndarray::{Array1, Array2};

/// GMRES solver configuration
#[derive(Debug, Clone)]
pub struct GmresConfig<R> {
    /// Maximum number of outer iterations (restarts)
    pub max_iterations: usize,
    /// Restart parameter (number of inner iterations before restart)
    pub restart: usize,
    /// Hard cap on the total number of inner iterations across restarts
    pub iteration_cap: Option<usize>,
    /// Relative tolerance for convergence
    pub tolerance: R,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for GmresConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            restart: 30,
            iteration_cap: None,
            tolerance: 1e-6,
            print_interval: 0,
        }
    }
}

impl<R: RealField> GmresConfig<R> {
    /// Split a budget of `total_iterations` Krylov iterations into restart
    /// cycles of at most `restart` inner iterations
    ///
    /// The last cycle is shortened so the total never exceeds the budget.
    pub fn with_iteration_budget(total_iterations: usize, restart: usize, tolerance: R) -> Self {
        let total_iterations = total_iterations.max(1);
        let restart = restart.clamp(1, total_iterations);
        Self {
            max_iterations: total_iterations.div_ceil(restart),
            restart,
            iteration_cap: Some(total_iterations),
            tolerance,
            print_interval: 0,
        }
    }
}

/// GMRES solver result
#[derive(Debug)]
pub struct GmresSolution<T: RealField> {
    /// Solution vector
    pub x: Array1<T>,
    /// Total number of matrix-vector products
    pub iterations: usize,
    /// Number of restarts performed
    pub restarts: usize,
    /// Final relative residual
    pub residual: T,
    /// Whether convergence was achieved
    pub converged: bool,
}

/// Solve Ax = b using the restarted GMRES method
///
/// # Arguments
/// * `operator` - Linear operator representing A
/// * `b` - Right-hand side vector
/// * `config` - Solver configuration
///
/// # Returns
/// Solution struct containing x, iteration count, and convergence info
pub fn gmres<T, A>(operator: &A, b: &Array1<T>, config: &GmresConfig<T>) -> GmresSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
{
    gmres_preconditioned_with_guess(operator, &IdentityPreconditioner, b, None, config)
}

/// GMRES solver with preconditioner
///
/// Solves Ax = b using left preconditioning: M⁻¹Ax = M⁻¹b
pub fn gmres_preconditioned<T, A, P>(
    operator: &A,
    precond: &P,
    b: &Array1<T>,
    config: &GmresConfig<T>,
) -> GmresSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
    P: Preconditioner<T>,
{
    gmres_preconditioned_with_guess(operator, precond, b, None, config)
}

/// GMRES solver with preconditioner and initial guess
///
/// Solves Ax = b using left preconditioning: M⁻¹Ax = M⁻¹b
/// with an optional initial guess x0.
pub fn gmres_preconditioned_with_guess<T, A, P>(
    operator: &A,
    precond: &P,
    b: &Array1<T>,
    x0: Option<&Array1<T>>,
    config: &GmresConfig<T>,
) -> GmresSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
    P: Preconditioner<T>,
{
    let n = b.len();
    let m = config.restart.max(1);
    assert_eq!(operator.num_rows(), n, "Operator rows do not match right-hand side");
    assert_eq!(operator.num_cols(), n, "GMRES needs a square operator");

    // Initialize solution vector from initial guess or zero
    let mut x = match x0 {
        Some(guess) => guess.clone(),
        None => Array1::from_elem(n, T::zero()),
    };

    // Compute preconditioned RHS norm
    let pb = precond.apply(b);
    let b_norm = vector_norm(&pb);
    let tol_threshold = T::constant(1e-15);
    if b_norm < tol_threshold {
        return GmresSolution {
            x,
            iterations: 0,
            restarts: 0,
            residual: T::zero(),
            converged: true,
        };
    }

    let breakdown_tol = T::constant(1e-14);
    let mut total_iterations = 0;
    let mut restarts = 0;

    for _outer in 0..config.max_iterations {
        let cycle = match config.iteration_cap {
            Some(cap) => m.min(cap.saturating_sub(total_iterations)),
            None => m,
        };
        if cycle == 0 {
            break;
        }

        // Compute preconditioned residual r = M⁻¹(b - Ax)
        let ax = operator.apply(&x);
        let residual: Array1<T> = b - &ax;
        let r = precond.apply(&residual);
        let beta = vector_norm(&r);

        let rel_residual = beta / b_norm;
        if rel_residual < config.tolerance {
            return GmresSolution {
                x,
                iterations: total_iterations,
                restarts,
                residual: rel_residual,
                converged: true,
            };
        }

        // Initialize Krylov basis V
        let mut v: Vec<Array1<T>> = Vec::with_capacity(m + 1);
        v.push(r.mapv(|ri| ri / beta));

        // Upper Hessenberg matrix H
        let mut h: Array2<T> = Array2::from_elem((m + 1, m), T::zero());

        // Givens rotation coefficients
        let mut cs: Vec<T> = Vec::with_capacity(m);
        let mut sn: Vec<T> = Vec::with_capacity(m);

        // Right-hand side of least squares problem
        let mut g: Array1<T> = Array1::from_elem(m + 1, T::zero());
        g[0] = beta;

        let mut inner_converged = false;

        for j in 0..cycle {
            total_iterations += 1;

            // w = M⁻¹ * A * v_j
            let av = operator.apply(&v[j]);
            let mut w = precond.apply(&av);

            // Modified Gram-Schmidt orthogonalization
            for i in 0..=j {
                h[[i, j]] = inner_product(&v[i], &w);
                let h_ij = h[[i, j]];
                axpy(-h_ij, &v[i], &mut w);
            }

            let w_norm = vector_norm(&w);
            h[[j + 1, j]] = w_norm;

            // Check for breakdown (lucky or not, the subspace is exhausted)
            if w_norm < breakdown_tol {
                inner_converged = true;
            } else {
                v.push(w.mapv(|wi| wi / w_norm));
            }

            // Apply previous Givens rotations to new column of H
            for i in 0..j {
                let temp = cs[i] * h[[i, j]] + sn[i] * h[[i + 1, j]];
                h[[i + 1, j]] = -sn[i] * h[[i, j]] + cs[i] * h[[i + 1, j]];
                h[[i, j]] = temp;
            }

            // Compute new Givens rotation
            let (c, s) = givens_rotation(h[[j, j]], h[[j + 1, j]]);
            cs.push(c);
            sn.push(s);

            // Apply Givens rotation to H and g
            h[[j, j]] = c * h[[j, j]] + s * h[[j + 1, j]];
            h[[j + 1, j]] = T::zero();

            let temp = c * g[j] + s * g[j + 1];
            g[j + 1] = -s * g[j] + c * g[j + 1];
            g[j] = temp;

            // Check convergence
            let rel_residual = g[j + 1].abs() / b_norm;

            if config.print_interval > 0 && total_iterations % config.print_interval == 0 {
                log::info!(
                    "GMRES iteration {} (restart {}): relative residual = {:.6e}",
                    total_iterations,
                    restarts,
                    rel_residual.to_f64().unwrap_or(0.0)
                );
            }

            if rel_residual < config.tolerance || inner_converged {
                // Solve upper triangular system Hy = g
                let y = solve_upper_triangular(&h, &g, j + 1);

                // Update solution x = x + V * y
                for (i, &yi) in y.iter().enumerate() {
                    axpy(yi, &v[i], &mut x);
                }

                return GmresSolution {
                    x,
                    iterations: total_iterations,
                    restarts,
                    residual: rel_residual,
                    converged: rel_residual < config.tolerance,
                };
            }
        }

        // Cycle exhausted, compute solution and restart
        let y = solve_upper_triangular(&h, &g, cycle);
        for (i, &yi) in y.iter().enumerate() {
            axpy(yi, &v[i], &mut x);
        }

        restarts += 1;
    }

    // Final residual
    let ax = operator.apply(&x);
    let residual: Array1<T> = b - &ax;
    let r = precond.apply(&residual);
    let rel_residual = vector_norm(&r) / b_norm;

    GmresSolution {
        x,
        iterations: total_iterations,
        restarts,
        residual: rel_residual,
        converged: rel_residual < config.tolerance,
    }
}

/// Compute Givens rotation coefficients
#[inline]
fn givens_rotation<T: RealField>(a: T, b: T) -> (T, T) {
    let tol = T::constant(1e-30);
    if b.abs() < tol {
        return (T::one(), T::zero());
    }
    if a.abs() < tol {
        return (T::zero(), T::one());
    }

    let r = a.hypot(b);
    (a / r, b / r)
}

/// Solve upper triangular system Hy = g
fn solve_upper_triangular<T: RealField>(h: &Array2<T>, g: &Array1<T>, k: usize) -> Vec<T> {
    let mut y = vec![T::zero(); k];
    let tol = T::constant(1e-30);

    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[[i, j]] * y[j];
        }
        if h[[i, i]].abs() > tol {
            y[i] = sum / h[[i, i]];
        }
    }

    y
}
