//! Block sparse linear solvers for implicit finite-volume schemes
//!
//! This crate provides the linear algebra behind one implicit pseudo-time
//! step of a node-based finite-volume transport solver: a block sparse matrix
//! with a mesh-derived pattern, and the iterative methods and preconditioners
//! used to solve the linearized system for the solution increment.
//!
//! # Features
//!
//! - **Block Sparse Matrix**: Block CSR storage with a fixed, edge-derived pattern
//!   and halo-aware products
//! - **Iterative Solvers**: GMRES, BiCGSTAB, symmetric Gauss-Seidel, LU-SGS
//! - **Direct Solvers**: Dense block LU with partial pivoting
//! - **Preconditioners**: Block Jacobi, LU-SGS, linelet
//! - **Generic Scalar Types**: Works with f64 and f32
//!
//! # Example
//!
//! ```
//! use math_fvm_solvers::{BlockSparseMatrix, BlockJacobiPreconditioner, GmresConfig};
//! use math_fvm_solvers::iterative::gmres_preconditioned;
//! use ndarray::array;
//!
//! let mut matrix = BlockSparseMatrix::from_edges(2, 2, 1, vec![(0, 1)]);
//! matrix.add_block(0, 0, &array![[4.0]]);
//! matrix.add_block(0, 1, &array![[-1.0]]);
//! matrix.add_block(1, 0, &array![[-1.0]]);
//! matrix.add_block(1, 1, &array![[4.0]]);
//! matrix.build_jacobi_preconditioner();
//!
//! let rhs = array![3.0, 3.0];
//! let precond = BlockJacobiPreconditioner::new(&matrix);
//! let solution = gmres_preconditioned(&matrix, &precond, &rhs, &GmresConfig::default());
//! assert!(solution.converged);
//! ```

pub mod blas_helpers;
pub mod direct;
pub mod iterative;
pub mod preconditioners;
pub mod sparse;
pub mod traits;

// Re-export main types
pub use sparse::BlockSparseMatrix;
pub use traits::{LinearOperator, Preconditioner, RealField};

// Re-export iterative solvers
pub use iterative::{
    BiCgstabConfig, BiCgstabSolution, GmresConfig, GmresSolution, StationaryConfig,
    StationarySolution, bicgstab, gmres, lu_sgs, sym_gauss_seidel,
};

// Re-export direct solvers
pub use direct::{BlockError, BlockLu};

// Re-export preconditioners
pub use preconditioners::{
    BlockJacobiPreconditioner, IdentityPreconditioner, LineletPreconditioner, LuSgsPreconditioner,
};
