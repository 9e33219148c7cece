//! Implicit finite-volume core for a two-equation transition model
//!
//! This crate assembles and solves the linearized system of one pseudo-time
//! step for the intermittency / transition-onset Reynolds number equations on
//! an unstructured, node-based dual mesh.
//!
//! # Features
//!
//! - **Edge assembly**: convective, viscous and source residuals with their
//!   Jacobian blocks, scattered into a block sparse matrix
//! - **Boundary conditions**: Dirichlet pinning (far-field, inlet, outlet) and
//!   one-sided wall fluxes (heat-flux walls, symmetry planes)
//! - **Linear solvers**: symmetric Gauss-Seidel, LU-SGS, BiCGSTAB and GMRES
//!   with identity, block Jacobi, LU-SGS or linelet preconditioning
//! - **Collaborator traits**: mesh topology, mean flow, gradients, restart
//!   data and halo exchange are consumed through traits
//!
//! # Example
//!
//! ```
//! use transition::config::TransitionConfig;
//! use transition::flow::FrozenFlow;
//! use transition::mesh::rectangular_grid;
//! use transition::numerics::{AverageGradientDiffusion, NoSource, ScalarUpwind};
//! use transition::solver::{Numerics, SerialExchange, TransitionSolver};
//! use transition::variables::PrecomputedGradients;
//!
//! let mesh = rectangular_grid(4, 4, 1.0, 1.0);
//! let config = TransitionConfig::default().resolve()?;
//! let flow = FrozenFlow::uniform(25, &[1.0, 0.0], 1e-3, 0.0, 0.1);
//! let gradients = PrecomputedGradients::zeros(25, 2, 2);
//! let numerics = Numerics {
//!     convective: ScalarUpwind,
//!     viscous: AverageGradientDiffusion::transition(),
//!     source: NoSource,
//! };
//!
//! let mut solver = TransitionSolver::new(&mesh, &config)?;
//! let report = solver.iterate(&mesh, &flow, &gradients, &numerics, &mut SerialExchange)?;
//! assert!(report.rms.iter().all(|r| r.is_finite()));
//! # Ok::<(), transition::TransitionError>(())
//! ```

pub mod assembly;
pub mod boundary;
pub mod config;
pub mod error;
pub mod flow;
pub mod mesh;
pub mod numerics;
pub mod residual;
pub mod solver;
pub mod variables;

pub use config::{LinearSolverKind, PreconditionerKind, ResolvedConfig, TransitionConfig};
pub use error::{Result, TransitionError};
pub use residual::ResidualAccumulator;
pub use solver::{IterationReport, StateExchange, TransitionSolver};
pub use variables::NodeStates;
