//! Mean-flow collaborator
//!
//! The transition equations are transported by a mean flow solved elsewhere.
//! The solver reads it through [`FlowField`]; [`FrozenFlow`] stores a fixed
//! snapshot in contiguous arrays.

use ndarray::{Array2, ArrayView2, s};

/// Read-only per-point mean-flow quantities
pub trait FlowField {
    /// Number of points covered
    fn n_points(&self) -> usize;

    /// Conservative variables `[ρ, ρu, ρv, (ρw,) ρE]`
    fn conservative(&self, point: usize) -> &[f64];

    /// Laminar (molecular) viscosity
    fn laminar_viscosity(&self, point: usize) -> f64;

    /// Eddy viscosity
    fn eddy_viscosity(&self, point: usize) -> f64;

    /// Local pseudo-time step of the flow solver
    fn delta_time(&self, point: usize) -> f64;

    /// Gradient of the primitive variables, one row per variable
    fn primitive_gradient(&self, point: usize) -> ArrayView2<'_, f64>;
}

/// Fixed mean-flow snapshot
#[derive(Debug, Clone)]
pub struct FrozenFlow {
    n_dim: usize,
    conservative: Array2<f64>,
    laminar_viscosity: Vec<f64>,
    eddy_viscosity: Vec<f64>,
    delta_time: Vec<f64>,
    /// `n_points × (n_prim * n_dim)`, row-major per point
    primitive_gradient: Array2<f64>,
    n_prim: usize,
}

impl FrozenFlow {
    /// Uniform flow with velocity `velocity` at unit density
    pub fn uniform(
        n_points: usize,
        velocity: &[f64],
        laminar_viscosity: f64,
        eddy_viscosity: f64,
        delta_time: f64,
    ) -> Self {
        let n_dim = velocity.len();
        assert!(n_dim == 2 || n_dim == 3, "Velocity must have 2 or 3 components");
        let n_cons = n_dim + 2;
        let n_prim = n_dim + 2;

        let mut conservative = Array2::zeros((n_points, n_cons));
        for mut row in conservative.rows_mut() {
            row[0] = 1.0;
            for (d, v) in velocity.iter().enumerate() {
                row[1 + d] = *v;
            }
            row[n_cons - 1] = 2.5 + 0.5 * velocity.iter().map(|v| v * v).sum::<f64>();
        }

        Self {
            n_dim,
            conservative,
            laminar_viscosity: vec![laminar_viscosity; n_points],
            eddy_viscosity: vec![eddy_viscosity; n_points],
            delta_time: vec![delta_time; n_points],
            primitive_gradient: Array2::zeros((n_points, n_prim * n_dim)),
            n_prim,
        }
    }

    /// Spatial dimension
    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// Overwrite the conservative state of a point
    pub fn set_conservative(&mut self, point: usize, values: &[f64]) {
        assert_eq!(values.len(), self.conservative.ncols(), "Conservative state length mismatch");
        self.conservative
            .row_mut(point)
            .iter_mut()
            .zip(values)
            .for_each(|(dst, src)| *dst = *src);
    }

    /// Overwrite the local time step of a point
    pub fn set_delta_time(&mut self, point: usize, dt: f64) {
        self.delta_time[point] = dt;
    }

    /// Overwrite the viscosities of a point
    pub fn set_viscosity(&mut self, point: usize, laminar: f64, eddy: f64) {
        self.laminar_viscosity[point] = laminar;
        self.eddy_viscosity[point] = eddy;
    }

    /// Overwrite the primitive gradient of a point (`n_prim × n_dim`)
    pub fn set_primitive_gradient(&mut self, point: usize, gradient: ArrayView2<'_, f64>) {
        assert_eq!(gradient.dim(), (self.n_prim, self.n_dim), "Gradient shape mismatch");
        self.primitive_gradient
            .row_mut(point)
            .iter_mut()
            .zip(gradient.iter())
            .for_each(|(dst, src)| *dst = *src);
    }
}

impl FlowField for FrozenFlow {
    fn n_points(&self) -> usize {
        self.conservative.nrows()
    }

    fn conservative(&self, point: usize) -> &[f64] {
        let len = self.conservative.ncols();
        let flat = self
            .conservative
            .as_slice()
            .expect("conservative storage is contiguous");
        &flat[point * len..(point + 1) * len]
    }

    fn laminar_viscosity(&self, point: usize) -> f64 {
        self.laminar_viscosity[point]
    }

    fn eddy_viscosity(&self, point: usize) -> f64 {
        self.eddy_viscosity[point]
    }

    fn delta_time(&self, point: usize) -> f64 {
        self.delta_time[point]
    }

    fn primitive_gradient(&self, point: usize) -> ArrayView2<'_, f64> {
        self.primitive_gradient
            .slice(s![point, ..])
            .into_shape_with_order((self.n_prim, self.n_dim))
            .expect("gradient row holds n_prim * n_dim values")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_uniform_flow() {
        let flow = FrozenFlow::uniform(3, &[2.0, 0.0], 1e-5, 1e-4, 0.1);
        assert_eq!(flow.n_points(), 3);
        assert_eq!(flow.conservative(1), &[1.0, 2.0, 0.0, 4.5]);
        assert_relative_eq!(flow.delta_time(2), 0.1);
        assert_eq!(flow.primitive_gradient(0).dim(), (4, 2));
    }

    #[test]
    fn test_setters() {
        let mut flow = FrozenFlow::uniform(2, &[1.0, 0.0], 0.0, 0.0, 1.0);
        flow.set_conservative(1, &[2.0, 4.0, 0.0, 10.0]);
        flow.set_delta_time(0, 0.5);
        flow.set_viscosity(1, 1e-3, 2e-3);
        let grad = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 8.0]];
        flow.set_primitive_gradient(1, grad.view());

        assert_eq!(flow.conservative(1)[1], 4.0);
        assert_relative_eq!(flow.delta_time(0), 0.5);
        assert_relative_eq!(flow.eddy_viscosity(1), 2e-3);
        assert_eq!(flow.primitive_gradient(1), grad.view());
    }
}
