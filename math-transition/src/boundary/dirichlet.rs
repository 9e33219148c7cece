//! Dirichlet pinning of boundary nodes

use crate::mesh::{BoundaryMarker, MeshTopology};
use crate::residual::ResidualAccumulator;
use crate::variables::NodeStates;
use solvers::BlockSparseMatrix;

/// Pin every domain vertex of `marker` to `values`
///
/// The old state is overwritten, the residual cleared and the block row
/// replaced by an identity row.
pub fn pin_dirichlet<M: MeshTopology>(
    mesh: &M,
    marker: &BoundaryMarker,
    values: &[f64],
    states: &mut NodeStates,
    residual: &mut ResidualAccumulator,
    jacobian: &mut BlockSparseMatrix<f64>,
) {
    assert_eq!(
        values.len(),
        states.n_var(),
        "Dirichlet values on marker '{}' do not match the variable count",
        marker.tag
    );

    for vertex in marker.vertices.iter().filter(|v| mesh.is_domain(v.node)) {
        states.set_solution_old(vertex.node, values);
        residual.clear_point(vertex.node);
        jacobian.delete_row(vertex.node, true);
    }
}
