//! Per-node transition variables
//!
//! [`NodeStates`] is an arena of contiguous buffers indexed by
//! `point * n_var + var`: current solution, the solution at the start of the
//! iteration, the solution gradient, the separation-induced intermittency
//! reported by the source kernel and the resulting effective intermittency.

use crate::error::{CollaboratorError, Result, TransitionError};
use crate::mesh::MeshTopology;
use ndarray::{Array2, ArrayView2};

/// Solution arena for all points, halo included
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStates {
    n_points: usize,
    n_var: usize,
    n_dim: usize,
    solution: Vec<f64>,
    solution_old: Vec<f64>,
    gradient: Vec<f64>,
    gamma_sep: Vec<f64>,
    gamma_eff: Vec<f64>,
}

impl NodeStates {
    /// All points start at `initial`
    pub fn uniform(n_points: usize, n_dim: usize, initial: &[f64]) -> Self {
        let n_var = initial.len();
        assert!(n_var > 0, "At least one variable is required");
        let solution: Vec<f64> = initial.iter().copied().cycle().take(n_points * n_var).collect();
        Self {
            n_points,
            n_var,
            n_dim,
            solution_old: solution.clone(),
            gamma_eff: solution.iter().step_by(n_var).copied().collect(),
            solution,
            gradient: vec![0.0; n_points * n_var * n_dim],
            gamma_sep: vec![0.0; n_points],
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_var(&self) -> usize {
        self.n_var
    }

    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    #[inline]
    fn range(&self, point: usize) -> std::ops::Range<usize> {
        assert!(point < self.n_points, "Point {} out of range", point);
        point * self.n_var..(point + 1) * self.n_var
    }

    /// Current solution of a point
    #[inline]
    pub fn solution(&self, point: usize) -> &[f64] {
        &self.solution[self.range(point)]
    }

    /// Solution at the start of the current iteration
    #[inline]
    pub fn solution_old(&self, point: usize) -> &[f64] {
        &self.solution_old[self.range(point)]
    }

    /// Overwrite the current solution of a point
    pub fn set_solution(&mut self, point: usize, values: &[f64]) {
        assert_eq!(values.len(), self.n_var, "State length mismatch");
        let range = self.range(point);
        self.solution[range].copy_from_slice(values);
    }

    /// Overwrite the old solution of a point
    pub fn set_solution_old(&mut self, point: usize, values: &[f64]) {
        assert_eq!(values.len(), self.n_var, "State length mismatch");
        let range = self.range(point);
        self.solution_old[range].copy_from_slice(values);
    }

    /// Copy every current solution into the old solution
    pub fn store_old_solution(&mut self) {
        self.solution_old.copy_from_slice(&self.solution);
    }

    /// solution = solution_old + delta for one variable
    pub fn add_solution(&mut self, point: usize, var: usize, delta: f64) {
        assert!(var < self.n_var, "Variable {} out of range", var);
        let k = self.range(point).start + var;
        self.solution[k] = self.solution_old[k] + delta;
    }

    /// Flat view of all current solutions (`n_points * n_var`)
    pub fn solution_slice(&self) -> &[f64] {
        &self.solution
    }

    /// Mutable flat view of all current solutions, for halo exchange
    pub fn solution_slice_mut(&mut self) -> &mut [f64] {
        &mut self.solution
    }

    /// Gradient of a point, `n_var × n_dim`
    pub fn gradient(&self, point: usize) -> ArrayView2<'_, f64> {
        let len = self.n_var * self.n_dim;
        assert!(point < self.n_points, "Point {} out of range", point);
        ArrayView2::from_shape((self.n_var, self.n_dim), &self.gradient[point * len..(point + 1) * len])
            .expect("gradient storage is n_var x n_dim")
    }

    /// Overwrite the gradient of a point
    pub fn set_gradient(&mut self, point: usize, gradient: ArrayView2<'_, f64>) {
        assert_eq!(gradient.dim(), (self.n_var, self.n_dim), "Gradient shape mismatch");
        let len = self.n_var * self.n_dim;
        self.gradient[point * len..(point + 1) * len]
            .iter_mut()
            .zip(gradient.iter())
            .for_each(|(dst, src)| *dst = *src);
    }

    /// Separation-induced intermittency of a point
    pub fn gamma_sep(&self, point: usize) -> f64 {
        self.gamma_sep[point]
    }

    pub fn set_gamma_sep(&mut self, point: usize, gamma_sep: f64) {
        self.gamma_sep[point] = gamma_sep;
    }

    /// Effective intermittency of a point
    pub fn gamma_eff(&self, point: usize) -> f64 {
        self.gamma_eff[point]
    }

    /// γ_eff = max(γ, γ_sep) at every point; γ is variable 0
    pub fn update_gamma_eff(&mut self) {
        for point in 0..self.n_points {
            let gamma = self.solution[point * self.n_var];
            self.gamma_eff[point] = gamma.max(self.gamma_sep[point]);
        }
    }
}

/// Refreshes the per-point solution gradients before assembly
pub trait GradientReconstruction<M: MeshTopology> {
    fn reconstruct(&self, mesh: &M, states: &mut NodeStates) -> Result<()>;
}

/// Gradients computed elsewhere, copied in verbatim
#[derive(Debug, Clone, Default)]
pub struct PrecomputedGradients {
    gradients: Vec<Array2<f64>>,
}

impl PrecomputedGradients {
    pub fn new(gradients: Vec<Array2<f64>>) -> Self {
        Self { gradients }
    }

    /// Zero gradients for `n_points` points
    pub fn zeros(n_points: usize, n_var: usize, n_dim: usize) -> Self {
        Self {
            gradients: vec![Array2::zeros((n_var, n_dim)); n_points],
        }
    }
}

impl<M: MeshTopology> GradientReconstruction<M> for PrecomputedGradients {
    fn reconstruct(&self, mesh: &M, states: &mut NodeStates) -> Result<()> {
        if self.gradients.len() != mesh.n_points() {
            return Err(TransitionError::DimensionMismatch {
                what: "gradient",
                expected: mesh.n_points(),
                got: self.gradients.len(),
            });
        }
        for (point, gradient) in self.gradients.iter().enumerate() {
            if gradient.dim() != (states.n_var(), states.n_dim()) {
                return Err(TransitionError::DimensionMismatch {
                    what: "gradient block",
                    expected: states.n_var() * states.n_dim(),
                    got: gradient.len(),
                });
            }
            states.set_gradient(point, gradient.view());
        }
        Ok(())
    }
}

/// Source of initial states when restarting a run
pub trait RestartSource {
    /// Fill `out` with the stored state of `point`
    fn read_point(&self, point: usize, out: &mut [f64]) -> std::result::Result<(), CollaboratorError>;
}

/// Restart records held in memory, one per point
#[derive(Debug, Clone, Default)]
pub struct InMemoryRestart {
    records: Vec<Vec<f64>>,
}

impl InMemoryRestart {
    pub fn new(records: Vec<Vec<f64>>) -> Self {
        Self { records }
    }
}

impl RestartSource for InMemoryRestart {
    fn read_point(&self, point: usize, out: &mut [f64]) -> std::result::Result<(), CollaboratorError> {
        let record = self
            .records
            .get(point)
            .ok_or_else(|| format!("no record for point {}", point))?;
        if record.len() != out.len() {
            return Err(format!("expected {} values, found {}", out.len(), record.len()).into());
        }
        out.copy_from_slice(record);
        Ok(())
    }
}

/// Read the state of every point from a restart source
pub fn read_restart(source: &dyn RestartSource, n_points: usize, n_dim: usize, n_var: usize) -> Result<NodeStates> {
    let mut states = NodeStates::uniform(n_points, n_dim, &vec![0.0; n_var]);
    let mut record = vec![0.0; n_var];
    for point in 0..n_points {
        source
            .read_point(point, &mut record)
            .map_err(|err| TransitionError::Restart {
                point,
                reason: err.to_string(),
            })?;
        states.set_solution(point, &record);
    }
    states.store_old_solution();
    states.update_gamma_eff();
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::strip;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_uniform_and_accessors() {
        let mut states = NodeStates::uniform(3, 2, &[1.0, 500.0]);
        assert_eq!(states.solution(2), &[1.0, 500.0]);
        states.set_solution(1, &[0.5, 400.0]);
        assert_eq!(states.solution(1), &[0.5, 400.0]);
        assert_eq!(states.solution_old(1), &[1.0, 500.0]);
        states.store_old_solution();
        assert_eq!(states.solution_old(1), &[0.5, 400.0]);
    }

    #[test]
    fn test_add_solution_uses_old_state() {
        let mut states = NodeStates::uniform(1, 2, &[1.0, 100.0]);
        states.set_solution(0, &[7.0, 7.0]);
        states.add_solution(0, 1, 5.0);
        assert_relative_eq!(states.solution(0)[1], 105.0);
        assert_relative_eq!(states.solution(0)[0], 7.0);
    }

    #[test]
    #[should_panic(expected = "Variable 2 out of range")]
    fn test_add_solution_bounds() {
        let mut states = NodeStates::uniform(1, 2, &[1.0, 100.0]);
        states.add_solution(0, 2, 1.0);
    }

    #[test]
    fn test_gamma_eff() {
        let mut states = NodeStates::uniform(2, 2, &[0.2, 100.0]);
        states.set_gamma_sep(0, 0.7);
        states.set_gamma_sep(1, 0.1);
        states.update_gamma_eff();
        assert_relative_eq!(states.gamma_eff(0), 0.7);
        assert_relative_eq!(states.gamma_eff(1), 0.2);
    }

    #[test]
    fn test_precomputed_gradients() {
        let mesh = strip(2, 1.0, 1.0);
        let mut states = NodeStates::uniform(2, 2, &[0.0, 0.0]);
        let g = array![[1.0, 2.0], [3.0, 4.0]];
        PrecomputedGradients::new(vec![g.clone(), g.clone()])
            .reconstruct(&mesh, &mut states)
            .expect("sizes match");
        assert_eq!(states.gradient(1), g.view());

        let err = PrecomputedGradients::zeros(3, 2, 2).reconstruct(&mesh, &mut states);
        assert!(matches!(err, Err(TransitionError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_read_restart() {
        let source = InMemoryRestart::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let states = read_restart(&source, 2, 2, 2).expect("complete restart");
        assert_eq!(states.solution(1), &[3.0, 4.0]);
        assert_eq!(states.solution_old(1), &[3.0, 4.0]);

        let err = read_restart(&source, 3, 2, 2).unwrap_err();
        assert!(matches!(err, TransitionError::Restart { point: 2, .. }));
    }
}
