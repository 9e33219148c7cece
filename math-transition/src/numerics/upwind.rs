//! First-order scalar upwind convection

use super::{EdgeData, FluxContribution, NumericalFlux, velocity};

/// Scalar upwind flux with the mean velocity of the edge
///
/// With `q = ½ (u_i + u_j) · n`, `a0 = ½ (q + |q|)` and `a1 = ½ (q - |q|)`,
/// the flux is `a0 U_i + a1 U_j` with Jacobians `a0 I` and `a1 I`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarUpwind;

impl NumericalFlux for ScalarUpwind {
    fn compute(&self, edge: &EdgeData<'_>, out: &mut FluxContribution) {
        let n_dim = edge.normal.len();
        let q: f64 = velocity(edge.flow_i, n_dim)
            .zip(velocity(edge.flow_j, n_dim))
            .zip(edge.normal)
            .map(|((ui, uj), n)| 0.5 * (ui + uj) * n)
            .sum();
        let a0 = 0.5 * (q + q.abs());
        let a1 = 0.5 * (q - q.abs());

        out.reset();
        for k in 0..out.n_var() {
            out.residual[k] = a0 * edge.state_i[k] + a1 * edge.state_j[k];
            out.jacobian_i[[k, k]] = a0;
            out.jacobian_j[[k, k]] = a1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_upwind_picks_donor_state() {
        let grad = Array2::zeros((2, 2));
        let flow = [1.0, 2.0, 0.0, 4.5];
        let mut edge = EdgeData {
            normal: &[0.5, 0.0],
            coord_i: &[0.0, 0.0],
            coord_j: &[1.0, 0.0],
            state_i: &[1.0, 10.0],
            state_j: &[3.0, 30.0],
            gradient_i: grad.view(),
            gradient_j: grad.view(),
            flow_i: &flow,
            flow_j: &flow,
            laminar_viscosity_i: 0.0,
            laminar_viscosity_j: 0.0,
            eddy_viscosity_i: 0.0,
            eddy_viscosity_j: 0.0,
        };

        let mut out = FluxContribution::new(2);
        ScalarUpwind.compute(&edge, &mut out);
        // q = 1: flow leaves i, the flux carries U_i
        assert_relative_eq!(out.residual[0], 1.0);
        assert_relative_eq!(out.residual[1], 10.0);
        assert_relative_eq!(out.jacobian_i[[1, 1]], 1.0);
        assert_relative_eq!(out.jacobian_j[[0, 0]], 0.0);

        let reversed = [-0.5, 0.0];
        edge.normal = &reversed;
        ScalarUpwind.compute(&edge, &mut out);
        assert_relative_eq!(out.residual[0], -3.0);
        assert_relative_eq!(out.jacobian_j[[0, 0]], -1.0);
        assert_relative_eq!(out.jacobian_i[[0, 0]], 0.0);
    }
}
