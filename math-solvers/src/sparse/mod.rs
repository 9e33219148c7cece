//! Sparse matrix structures (block CSR format)
//!
//! This module provides the block compressed sparse row format used for the
//! linearized system of an implicit finite-volume scheme.

mod block;

pub use block::BlockSparseMatrix;
