//! Residual accumulator with convergence norms
//!
//! One residual vector of `n_var` entries per point, stored contiguously.
//! Edge loops add a flux at one end point and subtract it at the other.
//! The RMS norm is volume weighted:
//! `rms[var] = sqrt(Σ_i vol_i · r_i,var² / n_points_domain)`.

/// Per-point residual buffer and per-variable RMS / Max statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualAccumulator {
    n_points: usize,
    n_var: usize,
    values: Vec<f64>,
    rms: Vec<f64>,
    max: Vec<f64>,
    max_point: Vec<usize>,
}

impl ResidualAccumulator {
    pub fn new(n_points: usize, n_var: usize) -> Self {
        Self {
            n_points,
            n_var,
            values: vec![0.0; n_points * n_var],
            rms: vec![0.0; n_var],
            max: vec![0.0; n_var],
            max_point: vec![0; n_var],
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_var(&self) -> usize {
        self.n_var
    }

    #[inline]
    fn range(&self, point: usize) -> std::ops::Range<usize> {
        assert!(point < self.n_points, "Point {} out of range", point);
        point * self.n_var..(point + 1) * self.n_var
    }

    /// Zero every residual
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Zero the residual of one point
    pub fn clear_point(&mut self, point: usize) {
        let range = self.range(point);
        self.values[range].iter_mut().for_each(|v| *v = 0.0);
    }

    /// r_point += contribution
    pub fn add(&mut self, point: usize, contribution: &[f64]) {
        assert_eq!(contribution.len(), self.n_var, "Residual length mismatch");
        let range = self.range(point);
        for (r, c) in self.values[range].iter_mut().zip(contribution) {
            *r += *c;
        }
    }

    /// r_point -= contribution
    pub fn subtract(&mut self, point: usize, contribution: &[f64]) {
        assert_eq!(contribution.len(), self.n_var, "Residual length mismatch");
        let range = self.range(point);
        for (r, c) in self.values[range].iter_mut().zip(contribution) {
            *r -= *c;
        }
    }

    /// Residual of one point
    pub fn get(&self, point: usize) -> &[f64] {
        &self.values[self.range(point)]
    }

    /// Flat view of all residuals (`n_points * n_var`)
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Zero the RMS and Max statistics
    pub fn reset_norms(&mut self) {
        self.rms.iter_mut().for_each(|v| *v = 0.0);
        self.max.iter_mut().for_each(|v| *v = 0.0);
        self.max_point.iter_mut().for_each(|v| *v = 0);
    }

    /// Add `squared * volume` to the RMS sum of `var`
    pub fn accumulate_norm(&mut self, var: usize, squared: f64, volume: f64) {
        self.rms[var] += squared * volume;
    }

    /// Keep `abs_value` as the Max of `var` if it is the largest seen so far
    pub fn accumulate_max(&mut self, var: usize, abs_value: f64, global_index: usize) {
        if abs_value > self.max[var] {
            self.max[var] = abs_value;
            self.max_point[var] = global_index;
        }
    }

    /// Turn the accumulated sums into RMS values
    pub fn finalize_rms(&mut self, n_points_domain: usize) {
        let count = n_points_domain.max(1) as f64;
        for rms in self.rms.iter_mut() {
            *rms = (*rms / count).sqrt();
        }
    }

    /// RMS per variable (valid after [`Self::finalize_rms`])
    pub fn rms(&self) -> &[f64] {
        &self.rms
    }

    /// Largest absolute residual per variable
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Global index where each Max occurred
    pub fn max_point(&self) -> &[usize] {
        &self.max_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_subtract_clear() {
        let mut r = ResidualAccumulator::new(2, 2);
        r.add(0, &[1.0, 2.0]);
        r.subtract(1, &[1.0, 2.0]);
        r.add(0, &[0.5, 0.5]);
        assert_eq!(r.get(0), &[1.5, 2.5]);
        assert_eq!(r.get(1), &[-1.0, -2.0]);

        r.clear_point(0);
        assert_eq!(r.get(0), &[0.0, 0.0]);
        r.clear();
        assert!(r.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_norms() {
        let mut r = ResidualAccumulator::new(3, 1);
        r.accumulate_norm(0, 4.0, 0.5);
        r.accumulate_norm(0, 1.0, 2.0);
        r.accumulate_max(0, 2.0, 10);
        r.accumulate_max(0, 1.0, 11);
        r.finalize_rms(2);
        assert_relative_eq!(r.rms()[0], 2.0_f64.sqrt());
        assert_relative_eq!(r.max()[0], 2.0);
        assert_eq!(r.max_point()[0], 10);

        r.reset_norms();
        assert_eq!(r.rms()[0], 0.0);
        assert_eq!(r.max_point()[0], 0);
    }
}
