//! Preconditioners for iterative solvers
//!
//! Preconditioners approximate A^(-1) to accelerate convergence of iterative methods.
//! All of them borrow a [`BlockSparseMatrix`](crate::sparse::BlockSparseMatrix)
//! and never modify it.
//!
//! # Available Preconditioners
//!
//! - **BlockJacobiPreconditioner**: Inverted diagonal blocks, fully parallel
//! - **LuSgsPreconditioner**: One symmetric block Gauss-Seidel pass
//! - **LineletPreconditioner**: Exact block-tridiagonal solves along wall-normal lines

mod jacobi;
mod linelet;
mod lu_sgs;

pub use jacobi::BlockJacobiPreconditioner;
pub use linelet::LineletPreconditioner;
pub use lu_sgs::{LuSgsPreconditioner, lu_sgs_sweep};

// Re-export IdentityPreconditioner from traits
pub use crate::traits::IdentityPreconditioner;
