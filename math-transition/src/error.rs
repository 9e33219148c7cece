//! Error types for the transition solver core.
//!
//! Configuration and collaborator failures are reported through
//! [`TransitionError`]. Contract violations inside the hot assembly loops
//! (an index outside the matrix pattern, a state of the wrong length) panic
//! instead, and a linear solve that stops at its iteration cap is not an
//! error at all.

use solvers::BlockError;
use thiserror::Error;

/// Boxed error returned by external collaborators
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while configuring or driving the transition solver.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The configured linear solver name is not known.
    #[error("unsupported linear solver: {0:?}")]
    UnsupportedSolver(String),

    /// The configured preconditioner name is not known.
    #[error("unsupported preconditioner: {0:?}")]
    UnsupportedPreconditioner(String),

    /// Relaxation factor outside (0, 1].
    #[error("invalid relaxation factor: {0} (must be in (0, 1])")]
    InvalidRelaxation(f64),

    /// Linear solver tolerance is not strictly positive.
    #[error("invalid linear solver tolerance: {0} (must be > 0)")]
    InvalidTolerance(f64),

    /// Linear solver iteration cap is zero.
    #[error("linear solver iteration cap must be at least 1")]
    ZeroIterationCap,

    /// Freestream turbulence intensity is not strictly positive.
    #[error("invalid freestream turbulence intensity: {0} (must be > 0)")]
    InvalidTurbulenceIntensity(f64),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Restart was requested but no restart source was supplied.
    #[error("restart requested but no restart data is available")]
    MissingRestart,

    /// A restart record could not be read.
    #[error("failed to read restart data for point {point}: {reason}")]
    Restart {
        /// Local point index of the failing record
        point: usize,
        /// Description of the failure
        reason: String,
    },

    /// Cross-partition synchronization of the solution failed.
    #[error("solution synchronization failed: {0}")]
    Synchronization(#[source] CollaboratorError),

    /// A dense block could not be factorized while building a preconditioner.
    #[error("preconditioner factorization failed: {0}")]
    Factorization(#[from] BlockError),

    /// A collaborator disagrees with the configured sizes.
    #[error("{what} dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },
}

/// A specialized `Result` type for transition solver operations.
pub type Result<T> = std::result::Result<T, TransitionError>;

impl TransitionError {
    /// Returns `true` if this error comes from resolving the configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TransitionError::UnsupportedSolver(_)
                | TransitionError::UnsupportedPreconditioner(_)
                | TransitionError::InvalidRelaxation(_)
                | TransitionError::InvalidTolerance(_)
                | TransitionError::ZeroIterationCap
                | TransitionError::InvalidTurbulenceIntensity(_)
                | TransitionError::ConfigIo(_)
                | TransitionError::ConfigParse(_)
        )
    }

    /// Returns `true` if the run cannot continue after this error.
    ///
    /// Every variant is fatal except a dimension mismatch reported by a
    /// collaborator, which the caller may correct and retry.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransitionError::DimensionMismatch { .. })
    }
}
