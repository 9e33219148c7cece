//! Edge and point assembly of the residual and its Jacobian
//!
//! Sign conventions (residual R, Jacobian J = ∂R/∂U):
//!
//! | contribution | point i              | point j              |
//! |--------------|----------------------|----------------------|
//! | convective   | R += F, J_ii += J_i, J_ij += J_j | R -= F, J_ji -= J_i, J_jj -= J_j |
//! | viscous      | R -= F, J_ii -= J_i, J_ij -= J_j | R += F, J_ji += J_i, J_jj += J_j |
//! | source       | R -= S, J_ii -= ∂S/∂U |                     |
//!
//! All routines only accumulate: the caller zeroes the residual and the
//! matrix once per iteration. Edge order changes the result only through
//! floating-point summation order.

use crate::flow::FlowField;
use crate::mesh::{Edge, MeshTopology};
use crate::numerics::{
    EdgeData, FluxContribution, NumericalFlux, PointData, SourceContribution, SourceTerm,
};
use crate::residual::ResidualAccumulator;
use crate::variables::NodeStates;
use solvers::BlockSparseMatrix;

fn edge_data<'a, F: FlowField, M: MeshTopology>(
    mesh: &'a M,
    flow: &'a F,
    states: &'a NodeStates,
    edge: &'a Edge,
) -> EdgeData<'a> {
    let [i, j] = edge.nodes;
    EdgeData {
        normal: &edge.normal,
        coord_i: mesh.coord(i),
        coord_j: mesh.coord(j),
        state_i: states.solution(i),
        state_j: states.solution(j),
        gradient_i: states.gradient(i),
        gradient_j: states.gradient(j),
        flow_i: flow.conservative(i),
        flow_j: flow.conservative(j),
        laminar_viscosity_i: flow.laminar_viscosity(i),
        laminar_viscosity_j: flow.laminar_viscosity(j),
        eddy_viscosity_i: flow.eddy_viscosity(i),
        eddy_viscosity_j: flow.eddy_viscosity(j),
    }
}

/// Accumulate the convective flux of every edge
pub fn upwind_residual<M, F, K>(
    mesh: &M,
    flow: &F,
    states: &NodeStates,
    kernel: &K,
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) where
    M: MeshTopology,
    F: FlowField,
    K: NumericalFlux + ?Sized,
{
    let mut flux = FluxContribution::new(states.n_var());
    for edge in mesh.edges() {
        let [i, j] = edge.nodes;
        kernel.compute(&edge_data(mesh, flow, states, edge), &mut flux);

        let r = flux.residual.as_slice().expect("Array should be contiguous");
        residual.add(i, r);
        residual.subtract(j, r);

        jacobian.add_block(i, i, &flux.jacobian_i);
        jacobian.add_block(i, j, &flux.jacobian_j);
        jacobian.subtract_block(j, i, &flux.jacobian_i);
        jacobian.subtract_block(j, j, &flux.jacobian_j);
    }
}

/// Accumulate the viscous flux of every edge
pub fn viscous_residual<M, F, K>(
    mesh: &M,
    flow: &F,
    states: &NodeStates,
    kernel: &K,
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) where
    M: MeshTopology,
    F: FlowField,
    K: NumericalFlux + ?Sized,
{
    let mut flux = FluxContribution::new(states.n_var());
    for edge in mesh.edges() {
        let [i, j] = edge.nodes;
        kernel.compute(&edge_data(mesh, flow, states, edge), &mut flux);

        let r = flux.residual.as_slice().expect("Array should be contiguous");
        residual.subtract(i, r);
        residual.add(j, r);

        jacobian.subtract_block(i, i, &flux.jacobian_i);
        jacobian.subtract_block(i, j, &flux.jacobian_j);
        jacobian.add_block(j, i, &flux.jacobian_i);
        jacobian.add_block(j, j, &flux.jacobian_j);
    }
}

/// Accumulate the source term of every domain point and store its γ_sep
pub fn source_residual<M, F, S>(
    mesh: &M,
    flow: &F,
    states: &mut NodeStates,
    kernel: &S,
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) where
    M: MeshTopology,
    F: FlowField,
    S: SourceTerm + ?Sized,
{
    let mut source = SourceContribution::new(states.n_var());
    for point in 0..mesh.n_points_domain() {
        let data = PointData {
            state: states.solution(point),
            flow: flow.conservative(point),
            primitive_gradient: flow.primitive_gradient(point),
            laminar_viscosity: flow.laminar_viscosity(point),
            eddy_viscosity: flow.eddy_viscosity(point),
            volume: mesh.volume(point),
            wall_distance: mesh.wall_distance(point),
        };
        kernel.compute(&data, &mut source);

        states.set_gamma_sep(point, source.gamma_sep);
        log::trace!("point {}: gamma_sep = {:.6e}", point, source.gamma_sep);

        let r = source.residual.as_slice().expect("Array should be contiguous");
        residual.subtract(point, r);
        jacobian.subtract_block(point, point, &source.jacobian);
    }
}
