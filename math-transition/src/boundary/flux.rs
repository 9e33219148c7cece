//! One-sided flux through wall and symmetry faces

use crate::flow::FlowField;
use crate::mesh::{BoundaryMarker, MeshTopology};
use crate::numerics::{EdgeData, FluxContribution, NumericalFlux};
use crate::residual::ResidualAccumulator;
use crate::variables::NodeStates;
use solvers::BlockSparseMatrix;

/// Add the convective flux through every domain vertex face of `marker`
///
/// The exterior state mirrors the interior one, and the face normal is turned
/// to point into the domain. Only the diagonal block receives a Jacobian.
pub fn wall_flux<M, F, K>(
    mesh: &M,
    flow: &F,
    marker: &BoundaryMarker,
    states: &NodeStates,
    kernel: &K,
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) where
    M: MeshTopology,
    F: FlowField,
    K: NumericalFlux,
{
    let mut flux = FluxContribution::new(states.n_var());
    let mut normal = Vec::with_capacity(mesh.n_dim());

    for vertex in marker.vertices.iter().filter(|v| mesh.is_domain(v.node)) {
        let node = vertex.node;
        normal.clear();
        normal.extend(vertex.normal.iter().map(|n| -n));

        let edge = EdgeData {
            normal: &normal,
            coord_i: mesh.coord(node),
            coord_j: mesh.coord(node),
            state_i: states.solution(node),
            state_j: states.solution(node),
            gradient_i: states.gradient(node),
            gradient_j: states.gradient(node),
            flow_i: flow.conservative(node),
            flow_j: flow.conservative(node),
            laminar_viscosity_i: flow.laminar_viscosity(node),
            laminar_viscosity_j: flow.laminar_viscosity(node),
            eddy_viscosity_i: flow.eddy_viscosity(node),
            eddy_viscosity_j: flow.eddy_viscosity(node),
        };
        kernel.compute(&edge, &mut flux);

        residual.add(node, flux.residual.as_slice().expect("Array should be contiguous"));
        jacobian.add_block(node, node, &flux.jacobian_i);
    }
}
