//! Iterative solvers for linear systems
//!
//! Krylov subspace methods:
//! - [`gmres`]: GMRES(m) with restart and left preconditioning
//! - [`bicgstab`]: BiCGSTAB with right preconditioning
//!
//! Stationary block methods working in place on a [`BlockSparseMatrix`](crate::sparse::BlockSparseMatrix):
//! - [`sym_gauss_seidel`]: symmetric block Gauss-Seidel
//! - [`lu_sgs`]: LU-SGS defect correction

mod bicgstab;
mod gmres;
mod stationary;

pub use bicgstab::{BiCgstabConfig, BiCgstabSolution, bicgstab, bicgstab_preconditioned};
pub use gmres::{
    GmresConfig, GmresSolution, gmres, gmres_preconditioned, gmres_preconditioned_with_guess,
};
pub use stationary::{StationaryConfig, StationarySolution, lu_sgs, sym_gauss_seidel};
