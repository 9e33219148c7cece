//! Solver configuration
//!
//! [`TransitionConfig`] is the serializable, user-facing form. It is
//! validated once by [`TransitionConfig::resolve`], which produces the typed
//! [`ResolvedConfig`] consumed by the solver. Nothing is parsed or validated
//! inside the assembly loops.

use crate::error::{Result, TransitionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Linear solver section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverConfig {
    /// `sym_gauss_seidel`, `lu_sgs`, `bcgstab` or `gmres`
    pub kind: String,
    /// `none`, `jacobi`, `lu_sgs` or `linelet` (Krylov methods only)
    pub preconditioner: String,
    /// Convergence tolerance: absolute for the stationary methods,
    /// relative to the right-hand side for the Krylov methods
    pub tolerance: f64,
    /// Iteration cap of one linear solve
    pub max_iterations: usize,
    /// Relaxation factor applied to the increment, in (0, 1]
    pub relaxation: f64,
    /// GMRES restart length
    pub gmres_restart: usize,
    /// Log linear progress every N iterations (0 = off)
    pub print_interval: usize,
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            kind: "bcgstab".to_string(),
            preconditioner: "lu_sgs".to_string(),
            tolerance: 1e-5,
            max_iterations: 50,
            relaxation: 1.0,
            gmres_restart: 30,
            print_interval: 0,
        }
    }
}

/// Freestream section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreestreamConfig {
    /// Freestream intermittency
    pub intermittency: f64,
    /// Freestream turbulence intensity in percent
    pub turbulence_intensity: f64,
    /// Reynolds number
    pub reynolds: f64,
    /// Mach number
    pub mach: f64,
}

impl Default for FreestreamConfig {
    fn default() -> Self {
        Self {
            intermittency: 1.0,
            turbulence_intensity: 0.18,
            reynolds: 5.0e6,
            mach: 0.2,
        }
    }
}

/// Linelet section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineletConfig {
    /// Markers whose nodes seed the lines
    pub wall_markers: Vec<String>,
    /// A line only grows through its largest face when that face exceeds
    /// `alpha` times the largest remaining face of the current node, faces to
    /// the previous and next line nodes excluded
    pub alpha: f64,
}

impl Default for LineletConfig {
    fn default() -> Self {
        Self {
            wall_markers: Vec::new(),
            alpha: 2.0,
        }
    }
}

/// Complete solver configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub linear_solver: LinearSolverConfig,
    pub freestream: FreestreamConfig,
    /// Read the initial state from a restart source instead of the freestream
    pub restart: bool,
    pub linelet: LineletConfig,
    /// Verbosity level (0 = quiet, 1 = summary, 2+ = detailed)
    pub verbosity: usize,
}

/// Linear solver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearSolverKind {
    /// Symmetric block Gauss-Seidel
    SymGaussSeidel,
    /// LU-SGS defect correction
    LuSgs,
    /// Right-preconditioned BiCGSTAB
    Bcgstab,
    /// Restarted, left-preconditioned GMRES
    Gmres,
}

impl LinearSolverKind {
    /// Whether this method uses a preconditioner
    pub fn is_krylov(&self) -> bool {
        matches!(self, LinearSolverKind::Bcgstab | LinearSolverKind::Gmres)
    }
}

impl FromStr for LinearSolverKind {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sym_gauss_seidel" | "gauss_seidel" => Ok(LinearSolverKind::SymGaussSeidel),
            "lu_sgs" => Ok(LinearSolverKind::LuSgs),
            "bcgstab" | "bicgstab" => Ok(LinearSolverKind::Bcgstab),
            "gmres" => Ok(LinearSolverKind::Gmres),
            _ => Err(TransitionError::UnsupportedSolver(s.to_string())),
        }
    }
}

impl fmt::Display for LinearSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinearSolverKind::SymGaussSeidel => "sym_gauss_seidel",
            LinearSolverKind::LuSgs => "lu_sgs",
            LinearSolverKind::Bcgstab => "bcgstab",
            LinearSolverKind::Gmres => "gmres",
        };
        f.write_str(name)
    }
}

/// Preconditioner selection for the Krylov methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreconditionerKind {
    Identity,
    Jacobi,
    LuSgs,
    Linelet,
}

impl FromStr for PreconditionerKind {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "identity" => Ok(PreconditionerKind::Identity),
            "jacobi" => Ok(PreconditionerKind::Jacobi),
            "lu_sgs" => Ok(PreconditionerKind::LuSgs),
            "linelet" => Ok(PreconditionerKind::Linelet),
            _ => Err(TransitionError::UnsupportedPreconditioner(s.to_string())),
        }
    }
}

impl fmt::Display for PreconditionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreconditionerKind::Identity => "none",
            PreconditionerKind::Jacobi => "jacobi",
            PreconditionerKind::LuSgs => "lu_sgs",
            PreconditionerKind::Linelet => "linelet",
        };
        f.write_str(name)
    }
}

/// Validated linear solver settings
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSolverSettings {
    pub kind: LinearSolverKind,
    pub preconditioner: PreconditionerKind,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub relaxation: f64,
    pub gmres_restart: usize,
    pub print_interval: usize,
}

impl Default for LinearSolverSettings {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::Bcgstab,
            preconditioner: PreconditionerKind::LuSgs,
            tolerance: 1e-5,
            max_iterations: 50,
            relaxation: 1.0,
            gmres_restart: 30,
            print_interval: 0,
        }
    }
}

/// Freestream values derived from the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreestreamState {
    /// Freestream intermittency
    pub intermittency: f64,
    /// Freestream transition-onset momentum-thickness Reynolds number
    pub reth: f64,
    pub reynolds: f64,
    pub mach: f64,
}

impl FreestreamState {
    /// Freestream state vector `[γ, Re_θt]`
    pub fn values(&self) -> [f64; 2] {
        [self.intermittency, self.reth]
    }
}

/// Configuration after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub linear: LinearSolverSettings,
    pub freestream: FreestreamState,
    pub restart: bool,
    pub wall_markers: Vec<String>,
    pub linelet_alpha: f64,
    pub verbosity: usize,
}

/// Transition-onset momentum-thickness Reynolds number from the freestream
/// turbulence intensity `tu` (percent)
pub fn reth_correlation(tu: f64) -> f64 {
    if tu <= 1.3 {
        1173.51 - 589.428 * tu + 0.2196 / (tu * tu)
    } else {
        331.5 * (tu - 0.5658).powf(-0.671)
    }
}

impl TransitionConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate every section and resolve the solver selections
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let ls = &self.linear_solver;
        let kind: LinearSolverKind = ls.kind.parse()?;
        let preconditioner: PreconditionerKind = ls.preconditioner.parse()?;

        if !(ls.relaxation > 0.0 && ls.relaxation <= 1.0) {
            return Err(TransitionError::InvalidRelaxation(ls.relaxation));
        }
        if !(ls.tolerance > 0.0) {
            return Err(TransitionError::InvalidTolerance(ls.tolerance));
        }
        if ls.max_iterations == 0 {
            return Err(TransitionError::ZeroIterationCap);
        }

        let tu = self.freestream.turbulence_intensity;
        if !(tu > 0.0) {
            return Err(TransitionError::InvalidTurbulenceIntensity(tu));
        }

        Ok(ResolvedConfig {
            linear: LinearSolverSettings {
                kind,
                preconditioner,
                tolerance: ls.tolerance,
                max_iterations: ls.max_iterations,
                relaxation: ls.relaxation,
                gmres_restart: ls.gmres_restart.max(1),
                print_interval: ls.print_interval,
            },
            freestream: FreestreamState {
                intermittency: self.freestream.intermittency,
                reth: reth_correlation(tu),
                reynolds: self.freestream.reynolds,
                mach: self.freestream.mach,
            },
            restart: self.restart,
            wall_markers: self.linelet.wall_markers.clone(),
            linelet_alpha: self.linelet.alpha,
            verbosity: self.verbosity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_resolves() {
        let resolved = TransitionConfig::default().resolve().expect("defaults are valid");
        assert_eq!(resolved.linear.kind, LinearSolverKind::Bcgstab);
        assert_eq!(resolved.linear.preconditioner, PreconditionerKind::LuSgs);
        assert!(!resolved.restart);
    }

    #[test]
    fn test_reth_correlation_branches() {
        // Low-turbulence branch
        let tu = 0.18;
        let expected = 1173.51 - 589.428 * tu + 0.2196 / (tu * tu);
        assert_relative_eq!(reth_correlation(tu), expected, epsilon = 1e-12);

        // High-turbulence branch
        let tu = 3.0;
        let expected = 331.5 * (3.0_f64 - 0.5658).powf(-0.671);
        assert_relative_eq!(reth_correlation(tu), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("GMRES".parse::<LinearSolverKind>().unwrap(), LinearSolverKind::Gmres);
        assert_eq!("none".parse::<PreconditionerKind>().unwrap(), PreconditionerKind::Identity);
        assert!(matches!(
            "pcg".parse::<LinearSolverKind>(),
            Err(TransitionError::UnsupportedSolver(name)) if name == "pcg"
        ));
        assert!(matches!(
            "ilu".parse::<PreconditionerKind>(),
            Err(TransitionError::UnsupportedPreconditioner(_))
        ));
    }

    #[test]
    fn test_kind_display_round_trips() {
        for kind in [
            LinearSolverKind::SymGaussSeidel,
            LinearSolverKind::LuSgs,
            LinearSolverKind::Bcgstab,
            LinearSolverKind::Gmres,
        ] {
            assert_eq!(kind.to_string().parse::<LinearSolverKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = TransitionConfig::default();
        config.linear_solver.relaxation = 0.0;
        assert!(matches!(config.resolve(), Err(TransitionError::InvalidRelaxation(_))));

        let mut config = TransitionConfig::default();
        config.linear_solver.tolerance = -1.0;
        assert!(matches!(config.resolve(), Err(TransitionError::InvalidTolerance(_))));

        let mut config = TransitionConfig::default();
        config.linear_solver.max_iterations = 0;
        assert!(matches!(config.resolve(), Err(TransitionError::ZeroIterationCap)));

        let mut config = TransitionConfig::default();
        config.freestream.turbulence_intensity = 0.0;
        assert!(matches!(
            config.resolve(),
            Err(TransitionError::InvalidTurbulenceIntensity(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TransitionConfig::from_json_str(
            r#"{ "linear_solver": { "kind": "gmres", "preconditioner": "linelet" },
                 "linelet": { "wall_markers": ["airfoil"] } }"#,
        )
        .expect("valid JSON");
        assert_eq!(config.linear_solver.kind, "gmres");
        assert_eq!(config.linear_solver.max_iterations, 50);
        assert_eq!(config.linelet.wall_markers, vec!["airfoil".to_string()]);
        assert_relative_eq!(config.linelet.alpha, 2.0);
    }

    #[test]
    fn test_malformed_json() {
        let err = TransitionConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.is_config_error());
    }
}
