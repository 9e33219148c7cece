//! Linear system dispatch
//!
//! The method is chosen once per call from [`LinearSolverSettings`]:
//!
//! - **SymGaussSeidel** / **LuSgs**: stationary sweeps on the block matrix,
//!   absolute tolerance on `||b - A x||₂`
//! - **Bcgstab** / **Gmres**: Krylov methods over the block matrix-vector
//!   product with one of the [`BlockPreconditioner`] variants, relative
//!   tolerance
//!
//! Every method starts from the increment held in the workspace and leaves
//! its final increment there. Halo entries are zero on return.

use crate::config::{LinearSolverKind, LinearSolverSettings, PreconditionerKind};
use crate::error::Result;
use ndarray::Array1;
use solvers::iterative::{bicgstab_preconditioned, gmres_preconditioned_with_guess};
use solvers::{
    BiCgstabConfig, BlockJacobiPreconditioner, BlockSparseMatrix, GmresConfig,
    IdentityPreconditioner, LineletPreconditioner, LuSgsPreconditioner, Preconditioner,
    StationaryConfig, lu_sgs, sym_gauss_seidel,
};

/// Right-hand side and increment buffers of one nonlinear iteration
#[derive(Debug, Clone, PartialEq)]
pub struct LinearWorkspace {
    /// Right-hand side, `-R`, indexed by `point * n_var + var`
    pub xres: Array1<f64>,
    /// Solution increment, same layout
    pub xsol: Array1<f64>,
}

impl LinearWorkspace {
    /// Zeroed buffers for `n_points × n_var` unknowns
    pub fn new(n_points: usize, n_var: usize) -> Self {
        Self {
            xres: Array1::zeros(n_points * n_var),
            xsol: Array1::zeros(n_points * n_var),
        }
    }
}

/// Outcome of one linear solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolveReport {
    /// Iterations performed (matrix-vector products for GMRES)
    pub iterations: usize,
    /// Final residual: absolute for the stationary methods, relative for Krylov
    pub residual: f64,
    pub converged: bool,
}

/// Preconditioner selected at run time
#[derive(Debug)]
pub enum BlockPreconditioner<'a> {
    Identity(IdentityPreconditioner),
    Jacobi(BlockJacobiPreconditioner<'a, f64>),
    LuSgs(LuSgsPreconditioner<'a, f64>),
    Linelet(LineletPreconditioner<'a, f64>),
}

impl<'a> BlockPreconditioner<'a> {
    /// Build the preconditioner of `kind` over `matrix`
    ///
    /// The matrix must carry its inverse diagonal blocks already.
    pub fn build(
        kind: PreconditionerKind,
        matrix: &'a BlockSparseMatrix<f64>,
        lines: &[Vec<usize>],
    ) -> Result<Self> {
        Ok(match kind {
            PreconditionerKind::Identity => BlockPreconditioner::Identity(IdentityPreconditioner),
            PreconditionerKind::Jacobi => {
                BlockPreconditioner::Jacobi(BlockJacobiPreconditioner::new(matrix))
            }
            PreconditionerKind::LuSgs => BlockPreconditioner::LuSgs(LuSgsPreconditioner::new(matrix)),
            PreconditionerKind::Linelet => {
                BlockPreconditioner::Linelet(LineletPreconditioner::new(matrix, lines)?)
            }
        })
    }
}

impl Preconditioner<f64> for BlockPreconditioner<'_> {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        match self {
            BlockPreconditioner::Identity(p) => p.apply(r),
            BlockPreconditioner::Jacobi(p) => p.apply(r),
            BlockPreconditioner::LuSgs(p) => p.apply(r),
            BlockPreconditioner::Linelet(p) => p.apply(r),
        }
    }
}

/// Solve `matrix · xsol = xres`
///
/// Builds the inverse diagonal blocks of `matrix` first; every method and
/// every preconditioner except the identity uses them. `lines` is only read
/// by the linelet preconditioner.
pub fn solve_linear_system(
    matrix: &mut BlockSparseMatrix<f64>,
    workspace: &mut LinearWorkspace,
    settings: &LinearSolverSettings,
    lines: &[Vec<usize>],
) -> Result<LinearSolveReport> {
    matrix.build_jacobi_preconditioner();
    let matrix: &BlockSparseMatrix<f64> = matrix;

    log::debug!(
        "Linear solve: {} (preconditioner {}), tol = {:e}, cap = {}",
        settings.kind,
        settings.preconditioner,
        settings.tolerance,
        settings.max_iterations
    );

    let report = match settings.kind {
        LinearSolverKind::SymGaussSeidel | LinearSolverKind::LuSgs => {
            let config = StationaryConfig {
                max_iterations: settings.max_iterations,
                tolerance: settings.tolerance,
                print_interval: settings.print_interval,
            };
            let solution = if settings.kind == LinearSolverKind::SymGaussSeidel {
                sym_gauss_seidel(matrix, &workspace.xres, &mut workspace.xsol, &config)
            } else {
                lu_sgs(matrix, &workspace.xres, &mut workspace.xsol, &config)
            };
            LinearSolveReport {
                iterations: solution.iterations,
                residual: solution.residual,
                converged: solution.converged,
            }
        }
        LinearSolverKind::Bcgstab => {
            let precond = BlockPreconditioner::build(settings.preconditioner, matrix, lines)?;
            let config = BiCgstabConfig {
                max_iterations: settings.max_iterations,
                tolerance: settings.tolerance,
                print_interval: settings.print_interval,
            };
            let solution = bicgstab_preconditioned(
                matrix,
                &precond,
                &workspace.xres,
                Some(&workspace.xsol),
                &config,
            );
            workspace.xsol = solution.x;
            LinearSolveReport {
                iterations: solution.iterations,
                residual: solution.residual,
                converged: solution.converged,
            }
        }
        LinearSolverKind::Gmres => {
            let precond = BlockPreconditioner::build(settings.preconditioner, matrix, lines)?;
            let mut config = GmresConfig::with_iteration_budget(
                settings.max_iterations,
                settings.gmres_restart,
                settings.tolerance,
            );
            config.print_interval = settings.print_interval;
            let solution = gmres_preconditioned_with_guess(
                matrix,
                &precond,
                &workspace.xres,
                Some(&workspace.xsol),
                &config,
            );
            workspace.xsol = solution.x;
            LinearSolveReport {
                iterations: solution.iterations,
                residual: solution.residual,
                converged: solution.converged,
            }
        }
    };

    let n_domain_len = matrix.n_points_domain() * matrix.n_var();
    workspace
        .xsol
        .iter_mut()
        .skip(n_domain_len)
        .for_each(|x| *x = 0.0);

    if !report.converged {
        log::warn!(
            "{} stopped after {} iterations with residual {:.6e} (tolerance {:e})",
            settings.kind,
            report.iterations,
            report.residual,
            settings.tolerance
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Three domain nodes in a chain plus one halo node, two variables
    fn chain() -> BlockSparseMatrix<f64> {
        let mut a = BlockSparseMatrix::from_edges(4, 3, 2, vec![(0, 1), (1, 2), (2, 3)]);
        for row in 0..3 {
            a.add_block(row, row, &array![[5.0, 1.0], [0.5, 4.0]]);
        }
        let coupling = array![[-1.0, 0.0], [0.2, -1.0]];
        for (i, j) in [(0, 1), (1, 2), (2, 3)] {
            a.add_block(i, j, &coupling);
            a.add_block(j, i, &coupling);
        }
        a
    }

    fn workspace() -> LinearWorkspace {
        let mut ws = LinearWorkspace::new(4, 2);
        ws.xres = array![1.0, 2.0, -1.0, 0.5, 3.0, 1.0, 0.0, 0.0];
        ws
    }

    #[test]
    fn test_every_method_solves_the_chain() {
        let kinds = [
            (LinearSolverKind::SymGaussSeidel, PreconditionerKind::Identity),
            (LinearSolverKind::LuSgs, PreconditionerKind::Identity),
            (LinearSolverKind::Bcgstab, PreconditionerKind::Jacobi),
            (LinearSolverKind::Bcgstab, PreconditionerKind::LuSgs),
            (LinearSolverKind::Gmres, PreconditionerKind::Identity),
            (LinearSolverKind::Gmres, PreconditionerKind::Linelet),
        ];
        let lines = vec![vec![0, 1, 2]];

        for (kind, preconditioner) in kinds {
            let mut a = chain();
            let mut ws = workspace();
            let settings = LinearSolverSettings {
                kind,
                preconditioner,
                tolerance: 1e-12,
                max_iterations: 200,
                ..Default::default()
            };
            let report = solve_linear_system(&mut a, &mut ws, &settings, &lines)
                .expect("solve should succeed");
            assert!(report.converged, "{kind} with {preconditioner} did not converge");

            let ax = a.matvec(&ws.xsol);
            for k in 0..6 {
                assert_relative_eq!(ax[k], ws.xres[k], epsilon = 1e-9);
            }
            assert_eq!(ws.xsol[6], 0.0);
            assert_eq!(ws.xsol[7], 0.0);
        }
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let mut a = chain();
        let mut ws = workspace();
        let settings = LinearSolverSettings {
            kind: LinearSolverKind::SymGaussSeidel,
            tolerance: 1e-300,
            max_iterations: 2,
            ..Default::default()
        };
        let report = solve_linear_system(&mut a, &mut ws, &settings, &[]).expect("solve");
        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert!(ws.xsol.iter().any(|x| *x != 0.0));
    }

    #[test]
    fn test_gmres_stops_at_the_iteration_cap() {
        let n = 300;
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let mut a = BlockSparseMatrix::from_edges(n, n, 1, edges);
        for i in 0..n {
            a.add_block(i, i, &array![[2.0]]);
            if i + 1 < n {
                a.add_block(i, i + 1, &array![[-1.0]]);
                a.add_block(i + 1, i, &array![[-1.0]]);
            }
        }

        let mut ws = LinearWorkspace::new(n, 1);
        ws.xres.fill(1.0);
        let settings = LinearSolverSettings {
            kind: LinearSolverKind::Gmres,
            preconditioner: PreconditionerKind::Identity,
            tolerance: 1e-300,
            max_iterations: 31,
            gmres_restart: 30,
            ..Default::default()
        };
        let report = solve_linear_system(&mut a, &mut ws, &settings, &[]).expect("solve");
        assert!(!report.converged);
        assert!(report.iterations <= settings.max_iterations);
        assert_eq!(report.iterations, 31);
    }
}
