//! Boundary condition enforcement
//!
//! Boundary handling runs after interior assembly and before the linear
//! solve. Two families are supported:
//! - Dirichlet: pin the old state, clear the residual and replace the matrix
//!   row by an identity row, so the increment of the node is exactly zero
//! - Flux: add a one-sided flux through the boundary face to the residual and
//!   the diagonal block, leaving the rest of the row untouched
//!
//! Far-field, inlet and outlet markers pin the freestream state. Heat-flux
//! walls and symmetry planes take the flux route with the convective kernel.
//! Only domain vertices are processed. Flux markers run before Dirichlet
//! markers, so a node shared by both ends up pinned whatever the marker order.

mod dirichlet;
mod flux;

pub use dirichlet::pin_dirichlet;
pub use flux::wall_flux;

use crate::flow::FlowField;
use crate::mesh::{BoundaryKind, MeshTopology};
use crate::numerics::NumericalFlux;
use crate::residual::ResidualAccumulator;
use crate::variables::NodeStates;
use solvers::BlockSparseMatrix;

/// How a boundary marker is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryTreatment {
    Dirichlet,
    Flux,
}

impl BoundaryKind {
    /// Enforcement family of this marker kind
    pub fn treatment(&self) -> BoundaryTreatment {
        match self {
            BoundaryKind::FarField
            | BoundaryKind::Inlet
            | BoundaryKind::Outlet
            | BoundaryKind::Dirichlet { .. } => BoundaryTreatment::Dirichlet,
            BoundaryKind::HeatFluxWall | BoundaryKind::SymmetryPlane => BoundaryTreatment::Flux,
        }
    }
}

/// Apply every marker of the mesh
///
/// `freestream` holds the values pinned at far-field, inlet and outlet
/// markers; explicit Dirichlet markers carry their own values. All flux
/// markers are applied first, then all Dirichlet markers.
pub fn apply_boundary_conditions<M, F, K>(
    mesh: &M,
    flow: &F,
    states: &mut NodeStates,
    convective: &K,
    freestream: &[f64],
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) where
    M: MeshTopology,
    F: FlowField,
    K: NumericalFlux,
{
    assert_eq!(freestream.len(), states.n_var(), "Freestream state length mismatch");

    let markers = mesh.markers();

    for marker in markers
        .iter()
        .filter(|m| m.kind.treatment() == BoundaryTreatment::Flux)
    {
        log::debug!("Applying {:?} on marker '{}'", marker.kind, marker.tag);
        wall_flux(mesh, flow, marker, states, convective, residual, jacobian);
    }

    for marker in markers
        .iter()
        .filter(|m| m.kind.treatment() == BoundaryTreatment::Dirichlet)
    {
        log::debug!("Applying {:?} on marker '{}'", marker.kind, marker.tag);
        let values = match &marker.kind {
            BoundaryKind::Dirichlet { values } => values.as_slice(),
            _ => freestream,
        };
        pin_dirichlet(mesh, marker, values, states, residual, jacobian);
    }
}
