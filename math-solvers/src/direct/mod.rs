//! Direct solvers for the dense blocks of a block sparse matrix
//!
//! - [`BlockLu`]: LU factorization of an `n_var × n_var` block with row partial
//!   pivoting, plus the explicit inverse used for Jacobi-type sweeps

mod block_lu;

pub use block_lu::{
    BlockError, BlockLu, block_matmul, block_matvec, block_matvec_add, block_matvec_sub,
};
