//! Flux and source kernels
//!
//! Kernels are pure functions of the data handed to them: an edge kernel
//! sees both end points of one edge, a source kernel one point. They write
//! into caller-owned contributions that are reused across the whole loop.

mod diffusion;
mod upwind;

pub use diffusion::AverageGradientDiffusion;
pub use upwind::ScalarUpwind;

use ndarray::{Array1, Array2, ArrayView2};

/// Everything an edge kernel may read about one edge
#[derive(Debug, Clone, Copy)]
pub struct EdgeData<'a> {
    /// Area-weighted face normal, from `i` towards `j`
    pub normal: &'a [f64],
    pub coord_i: &'a [f64],
    pub coord_j: &'a [f64],
    /// Transition variables
    pub state_i: &'a [f64],
    pub state_j: &'a [f64],
    /// Transition variable gradients, `n_var × n_dim`
    pub gradient_i: ArrayView2<'a, f64>,
    pub gradient_j: ArrayView2<'a, f64>,
    /// Mean-flow conservative variables
    pub flow_i: &'a [f64],
    pub flow_j: &'a [f64],
    pub laminar_viscosity_i: f64,
    pub laminar_viscosity_j: f64,
    pub eddy_viscosity_i: f64,
    pub eddy_viscosity_j: f64,
}

/// Everything a source kernel may read about one point
#[derive(Debug, Clone, Copy)]
pub struct PointData<'a> {
    pub state: &'a [f64],
    /// Mean-flow conservative variables
    pub flow: &'a [f64],
    /// Mean-flow primitive gradient
    pub primitive_gradient: ArrayView2<'a, f64>,
    pub laminar_viscosity: f64,
    pub eddy_viscosity: f64,
    pub volume: f64,
    pub wall_distance: f64,
}

/// Residual and Jacobians of one edge flux
#[derive(Debug, Clone, PartialEq)]
pub struct FluxContribution {
    pub residual: Array1<f64>,
    /// ∂residual / ∂state_i
    pub jacobian_i: Array2<f64>,
    /// ∂residual / ∂state_j
    pub jacobian_j: Array2<f64>,
}

impl FluxContribution {
    pub fn new(n_var: usize) -> Self {
        Self {
            residual: Array1::zeros(n_var),
            jacobian_i: Array2::zeros((n_var, n_var)),
            jacobian_j: Array2::zeros((n_var, n_var)),
        }
    }

    pub fn n_var(&self) -> usize {
        self.residual.len()
    }

    /// Zero the residual and both Jacobians
    pub fn reset(&mut self) {
        self.residual.fill(0.0);
        self.jacobian_i.fill(0.0);
        self.jacobian_j.fill(0.0);
    }
}

/// Residual, Jacobian and separation intermittency of one source evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContribution {
    pub residual: Array1<f64>,
    /// ∂residual / ∂state
    pub jacobian: Array2<f64>,
    /// Separation-induced intermittency at the point
    pub gamma_sep: f64,
}

impl SourceContribution {
    pub fn new(n_var: usize) -> Self {
        Self {
            residual: Array1::zeros(n_var),
            jacobian: Array2::zeros((n_var, n_var)),
            gamma_sep: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.residual.fill(0.0);
        self.jacobian.fill(0.0);
        self.gamma_sep = 0.0;
    }
}

/// Edge flux kernel (convective or viscous)
pub trait NumericalFlux {
    fn compute(&self, edge: &EdgeData<'_>, out: &mut FluxContribution);
}

/// Point source kernel
pub trait SourceTerm {
    fn compute(&self, point: &PointData<'_>, out: &mut SourceContribution);
}

/// Source kernel that contributes nothing, for pure transport runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl SourceTerm for NoSource {
    fn compute(&self, _point: &PointData<'_>, out: &mut SourceContribution) {
        out.reset();
    }
}

/// Velocity `(ρu) / ρ` from conservative variables
pub(crate) fn velocity(flow: &[f64], n_dim: usize) -> impl Iterator<Item = f64> + '_ {
    let density = flow[0];
    flow[1..=n_dim].iter().map(move |m| m / density)
}
