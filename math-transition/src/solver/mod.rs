//! Nonlinear iteration driver
//!
//! One pseudo-time iteration of [`TransitionSolver::iterate`] runs:
//!
//! 1. preprocessing: store the old solution, clear residual and matrix,
//!    refresh gradients
//! 2. convective, viscous and source assembly
//! 3. boundary conditions
//! 4. implicit Euler step: `(V/Δt + J) Δx = -R`, `U = U_old + ω Δx`,
//!    halo synchronization, residual norms
//! 5. postprocessing: effective intermittency
//!
//! The individual stages are public so an outer driver can interleave its
//! own work between them.

mod linear;

pub use linear::{BlockPreconditioner, LinearSolveReport, LinearWorkspace, solve_linear_system};

use crate::assembly;
use crate::boundary::apply_boundary_conditions;
use crate::config::{PreconditionerKind, ResolvedConfig};
use crate::error::{CollaboratorError, Result, TransitionError};
use crate::flow::FlowField;
use crate::mesh::{MeshTopology, build_linelets};
use crate::numerics::{NumericalFlux, SourceTerm};
use crate::residual::ResidualAccumulator;
use crate::variables::{GradientReconstruction, NodeStates, RestartSource, read_restart};
use solvers::BlockSparseMatrix;

/// Number of transported variables: intermittency and Re_θt
pub const N_VAR: usize = 2;

/// Cross-partition consistency update of the solution
pub trait StateExchange {
    /// Bring halo states up to date after the local update
    fn synchronize(&mut self, states: &mut NodeStates) -> std::result::Result<(), CollaboratorError>;
}

/// Single-partition run: nothing to exchange
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExchange;

impl StateExchange for SerialExchange {
    fn synchronize(&mut self, _states: &mut NodeStates) -> std::result::Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Flux and source kernels used by one iteration
#[derive(Debug, Clone)]
pub struct Numerics<C, V, S> {
    pub convective: C,
    pub viscous: V,
    pub source: S,
}

/// Convergence data of one nonlinear iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// RMS residual per variable
    pub rms: Vec<f64>,
    /// Max residual per variable
    pub max: Vec<f64>,
    /// Global index of each Max
    pub max_point: Vec<usize>,
    pub linear: LinearSolveReport,
}

/// Implicit solver for the transition variables on one partition
#[derive(Debug, Clone)]
pub struct TransitionSolver {
    config: ResolvedConfig,
    states: NodeStates,
    residual: ResidualAccumulator,
    jacobian: BlockSparseMatrix<f64>,
    lines: Vec<Vec<usize>>,
}

impl TransitionSolver {
    /// Start every point from the freestream state
    pub fn new<M: MeshTopology>(mesh: &M, config: &ResolvedConfig) -> Result<Self> {
        if config.restart {
            return Err(TransitionError::MissingRestart);
        }
        let states = NodeStates::uniform(mesh.n_points(), mesh.n_dim(), &config.freestream.values());
        Ok(Self::with_states(mesh, config, states))
    }

    /// Start from the states stored in `source`
    pub fn with_restart<M: MeshTopology>(
        mesh: &M,
        config: &ResolvedConfig,
        source: &dyn RestartSource,
    ) -> Result<Self> {
        let states = read_restart(source, mesh.n_points(), mesh.n_dim(), N_VAR)?;
        Ok(Self::with_states(mesh, config, states))
    }

    fn with_states<M: MeshTopology>(mesh: &M, config: &ResolvedConfig, states: NodeStates) -> Self {
        let edges = mesh.edges().iter().map(|e| (e.nodes[0], e.nodes[1]));
        let jacobian =
            BlockSparseMatrix::from_edges(mesh.n_points(), mesh.n_points_domain(), N_VAR, edges);

        let lines = if config.linear.kind.is_krylov()
            && config.linear.preconditioner == PreconditionerKind::Linelet
        {
            build_linelets(mesh, &config.wall_markers, config.linelet_alpha)
        } else {
            Vec::new()
        };

        let fs = &config.freestream;
        log::info!(
            "Transition solver: {} points ({} domain), {} edges, {} blocks",
            mesh.n_points(),
            mesh.n_points_domain(),
            mesh.edges().len(),
            jacobian.nnz_blocks()
        );
        log::info!(
            "Freestream: intermittency = {}, Re_theta_t = {:.4}, Re = {:e}, Mach = {}",
            fs.intermittency,
            fs.reth,
            fs.reynolds,
            fs.mach
        );
        if !lines.is_empty() {
            log::info!("Linelet preconditioner: {} lines", lines.len());
        }

        Self {
            config: config.clone(),
            residual: ResidualAccumulator::new(mesh.n_points(), N_VAR),
            states,
            jacobian,
            lines,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn states(&self) -> &NodeStates {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut NodeStates {
        &mut self.states
    }

    pub fn residual(&self) -> &ResidualAccumulator {
        &self.residual
    }

    pub fn jacobian(&self) -> &BlockSparseMatrix<f64> {
        &self.jacobian
    }

    /// Lines of the linelet preconditioner (empty unless it is selected)
    pub fn lines(&self) -> &[Vec<usize>] {
        &self.lines
    }

    /// Store the old solution, clear residual and matrix, refresh gradients
    pub fn preprocessing<M, G>(&mut self, mesh: &M, gradients: &G) -> Result<()>
    where
        M: MeshTopology,
        G: GradientReconstruction<M>,
    {
        self.states.store_old_solution();
        self.residual.clear();
        self.jacobian.set_zero();
        gradients.reconstruct(mesh, &mut self.states)
    }

    pub fn upwind_residual<M, F, K>(&mut self, mesh: &M, flow: &F, kernel: &K)
    where
        M: MeshTopology,
        F: FlowField,
        K: NumericalFlux,
    {
        assembly::upwind_residual(mesh, flow, &self.states, kernel, &mut self.residual, &mut self.jacobian);
    }

    pub fn viscous_residual<M, F, K>(&mut self, mesh: &M, flow: &F, kernel: &K)
    where
        M: MeshTopology,
        F: FlowField,
        K: NumericalFlux,
    {
        assembly::viscous_residual(mesh, flow, &self.states, kernel, &mut self.residual, &mut self.jacobian);
    }

    pub fn source_residual<M, F, S>(&mut self, mesh: &M, flow: &F, kernel: &S)
    where
        M: MeshTopology,
        F: FlowField,
        S: SourceTerm,
    {
        assembly::source_residual(mesh, flow, &mut self.states, kernel, &mut self.residual, &mut self.jacobian);
    }

    /// Enforce every boundary marker; `convective` drives the wall fluxes
    pub fn boundary_conditions<M, F, K>(&mut self, mesh: &M, flow: &F, convective: &K)
    where
        M: MeshTopology,
        F: FlowField,
        K: NumericalFlux,
    {
        let freestream = self.config.freestream.values();
        apply_boundary_conditions(
            mesh,
            flow,
            &mut self.states,
            convective,
            &freestream,
            &mut self.residual,
            &mut self.jacobian,
        );
    }

    /// Solve for the increment, update the states and finalize the norms
    pub fn implicit_euler_iteration<M, F, X>(
        &mut self,
        mesh: &M,
        flow: &F,
        exchange: &mut X,
    ) -> Result<IterationReport>
    where
        M: MeshTopology,
        F: FlowField,
        X: StateExchange + ?Sized,
    {
        if flow.n_points() != mesh.n_points() {
            return Err(TransitionError::DimensionMismatch {
                what: "flow field",
                expected: mesh.n_points(),
                got: flow.n_points(),
            });
        }

        let n_domain = mesh.n_points_domain();
        let mut workspace = LinearWorkspace::new(mesh.n_points(), N_VAR);
        self.residual.reset_norms();

        for point in 0..n_domain {
            let volume = mesh.volume(point);
            self.jacobian.add_to_diagonal(point, volume / flow.delta_time(point));

            let global = mesh.global_index(point);
            for (var, &r) in self.residual.get(point).to_owned().iter().enumerate() {
                workspace.xres[point * N_VAR + var] = -r;
                self.residual.accumulate_norm(var, r * r, volume);
                self.residual.accumulate_max(var, r.abs(), global);
            }
        }
        // Halo entries of both buffers stay zero

        let linear = solve_linear_system(
            &mut self.jacobian,
            &mut workspace,
            &self.config.linear,
            &self.lines,
        )?;

        let relaxation = self.config.linear.relaxation;
        for point in 0..n_domain {
            for var in 0..N_VAR {
                self.states
                    .add_solution(point, var, relaxation * workspace.xsol[point * N_VAR + var]);
            }
        }

        exchange
            .synchronize(&mut self.states)
            .map_err(TransitionError::Synchronization)?;

        self.residual.finalize_rms(n_domain);

        let report = IterationReport {
            rms: self.residual.rms().to_vec(),
            max: self.residual.max().to_vec(),
            max_point: self.residual.max_point().to_vec(),
            linear,
        };

        if self.config.verbosity > 0 {
            log::info!(
                "log10 RMS [{:.4}, {:.4}], max {:.4e} at {}, {} linear iterations",
                report.rms[0].log10(),
                report.rms[1].log10(),
                report.max[0],
                report.max_point[0],
                linear.iterations
            );
        }

        Ok(report)
    }

    /// Update the effective intermittency of every point
    pub fn postprocessing(&mut self) {
        self.states.update_gamma_eff();
    }

    /// Run one complete nonlinear iteration
    pub fn iterate<M, F, G, C, V, S, X>(
        &mut self,
        mesh: &M,
        flow: &F,
        gradients: &G,
        numerics: &Numerics<C, V, S>,
        exchange: &mut X,
    ) -> Result<IterationReport>
    where
        M: MeshTopology,
        F: FlowField,
        G: GradientReconstruction<M>,
        C: NumericalFlux,
        V: NumericalFlux,
        S: SourceTerm,
        X: StateExchange + ?Sized,
    {
        self.preprocessing(mesh, gradients)?;
        self.upwind_residual(mesh, flow, &numerics.convective);
        self.viscous_residual(mesh, flow, &numerics.viscous);
        self.source_residual(mesh, flow, &numerics.source);
        self.boundary_conditions(mesh, flow, &numerics.convective);
        let report = self.implicit_euler_iteration(mesh, flow, exchange)?;
        self.postprocessing();
        Ok(report)
    }
}
