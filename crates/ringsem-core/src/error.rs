//! Error types for the ringsem solver.
//!
//! The taxonomy follows the life of a run: configuration problems are
//! detected in the preloop before any mesh work, numerical problems
//! while operators are built, instability during time stepping, and
//! resource-ordering bugs whenever the transform provider or the element
//! workspaces are touched out of order. None of them is retried.

use std::error::Error;
use std::fmt;

use crate::id::{ElementId, PointId, StepId};

// ── ConfigError ────────────────────────────────────────────────────

/// Bad or inconsistent input, detected before the expensive stages run.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A parameter has the wrong type or lies outside its valid range.
    InvalidParameter {
        /// The parameter key (or struct field name).
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A required parameter is absent from the parameter set.
    MissingParameter {
        /// The missing key.
        key: String,
    },
    /// The background model or mesh definition is inconsistent.
    InvalidModel {
        /// Description of the inconsistency.
        reason: String,
    },
    /// The source lies outside the model.
    SourceOutsideModel {
        /// Source depth below the surface, in metres.
        depth: f64,
        /// Outer radius of the model, in metres.
        radius: f64,
    },
    /// The attenuation band cannot be represented at this time step.
    AttenuationBand {
        /// Shortest relaxation time produced for the band.
        shortest_tau: f64,
        /// The time step.
        dt: f64,
    },
    /// The requested partition layout cannot be built.
    InvalidPartition {
        /// Description of the problem.
        reason: String,
    },
    /// A receiver definition is invalid.
    InvalidReceiver {
        /// Station name.
        name: String,
        /// Why the receiver was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { key, reason } => {
                write!(f, "invalid parameter {key}: {reason}")
            }
            Self::MissingParameter { key } => write!(f, "missing required parameter {key}"),
            Self::InvalidModel { reason } => write!(f, "invalid model: {reason}"),
            Self::SourceOutsideModel { depth, radius } => write!(
                f,
                "source depth {depth} m lies outside the model (outer radius {radius} m)"
            ),
            Self::AttenuationBand { shortest_tau, dt } => write!(
                f,
                "shortest relaxation time {shortest_tau} s is below twice the time step {dt} s"
            ),
            Self::InvalidPartition { reason } => write!(f, "invalid partition: {reason}"),
            Self::InvalidReceiver { name, reason } => {
                write!(f, "invalid receiver {name}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── NumericalError ─────────────────────────────────────────────────

/// Operator construction produced an invalid result.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericalError {
    /// An element operator contains NaN or infinite entries.
    NonFiniteOperator {
        /// The offending element.
        element: ElementId,
        /// Which operator table was affected.
        what: &'static str,
    },
    /// An assembled point mass is zero, negative or non-finite.
    NonPositiveMass {
        /// The offending point.
        point: PointId,
        /// The assembled mass value.
        value: f64,
    },
    /// The element stiffness is not self-adjoint (diagnostic pass only).
    NotSelfAdjoint {
        /// The offending element.
        element: ElementId,
        /// Relative asymmetry `|xᵀKy - yᵀKx| / (|x||K||y|)`.
        asymmetry: f64,
    },
    /// The element stiffness is not positive semi-definite (diagnostic pass only).
    NotPositiveSemiDefinite {
        /// The offending element.
        element: ElementId,
        /// The negative Rayleigh quotient that was found.
        rayleigh: f64,
    },
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteOperator { element, what } => {
                write!(f, "non-finite {what} in element {element}")
            }
            Self::NonPositiveMass { point, value } => {
                write!(f, "non-positive mass {value} at point {point}")
            }
            Self::NotSelfAdjoint { element, asymmetry } => write!(
                f,
                "stiffness of element {element} is not self-adjoint (asymmetry {asymmetry:e})"
            ),
            Self::NotPositiveSemiDefinite { element, rayleigh } => write!(
                f,
                "stiffness of element {element} is indefinite (Rayleigh quotient {rayleigh:e})"
            ),
        }
    }
}

impl Error for NumericalError {}

// ── NumericalInstabilityError ──────────────────────────────────────

/// The runtime stability check failed during time stepping.
///
/// Fatal: the chosen `dt` violates the CFL-type condition of the mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericalInstabilityError {
    /// Step at which the check failed.
    pub step: StepId,
    /// Simulation time of that step, in seconds.
    pub time: f64,
    /// The global stability norm (max |u|, or NaN / infinity).
    pub norm: f64,
    /// The ceiling the norm was compared against.
    pub ceiling: f64,
}

impl fmt::Display for NumericalInstabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solution became unstable at step {} (t = {} s): norm {} exceeds {}",
            self.step, self.time, self.norm, self.ceiling
        )
    }
}

impl Error for NumericalInstabilityError {}

// ── ResourceInitializationError ────────────────────────────────────

/// A process-wide resource was used out of order.
///
/// These indicate a usage-order bug in the caller, never bad input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceInitializationError {
    /// `initialize()` called while the resource is live.
    AlreadyInitialized {
        /// Name of the resource.
        resource: &'static str,
    },
    /// The resource was used before `initialize()` or after `finalize()`.
    NotInitialized {
        /// Name of the resource.
        resource: &'static str,
    },
    /// A preallocated workspace is smaller than the request.
    WorkspaceTooSmall {
        /// Name of the workspace.
        resource: &'static str,
        /// Requested azimuthal order or ring size.
        required: usize,
        /// Capacity the workspace was initialised with.
        capacity: usize,
    },
}

impl fmt::Display for ResourceInitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized { resource } => {
                write!(f, "{resource} is already initialized")
            }
            Self::NotInitialized { resource } => write!(f, "{resource} is not initialized"),
            Self::WorkspaceTooSmall {
                resource,
                required,
                capacity,
            } => write!(
                f,
                "{resource} too small: required {required}, capacity {capacity}"
            ),
        }
    }
}

impl Error for ResourceInitializationError {}

// ── CommError ──────────────────────────────────────────────────────

/// Failures of the inter-worker message passing layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A peer worker dropped its channels (its run was aborted).
    PeerAborted {
        /// Rank of the peer.
        rank: usize,
    },
    /// A message of the wrong kind or size arrived.
    ProtocolViolation {
        /// Rank of the sending peer.
        rank: usize,
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerAborted { rank } => write!(f, "peer worker {rank} aborted"),
            Self::ProtocolViolation { rank, reason } => {
                write!(f, "protocol violation from worker {rank}: {reason}")
            }
        }
    }
}

impl Error for CommError {}

// ── SolverError ────────────────────────────────────────────────────

/// Any fatal condition of a run.
#[derive(Clone, Debug, PartialEq)]
pub enum SolverError {
    /// Bad or inconsistent input.
    Config(ConfigError),
    /// Invalid operator construction.
    Numerical(NumericalError),
    /// Runtime instability.
    Instability(NumericalInstabilityError),
    /// Resource used out of order.
    Resource(ResourceInitializationError),
    /// Inter-worker communication failed.
    Comm(CommError),
    /// An operation was called in the wrong lifecycle state.
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the object was in.
        state: &'static str,
    },
    /// A worker thread could not be started or died without a result.
    Worker {
        /// Rank of the worker.
        rank: usize,
        /// What happened.
        reason: String,
    },
}

impl SolverError {
    /// Whether this error is a consequence of another worker failing
    /// rather than a root cause.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Comm(CommError::PeerAborted { .. }))
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Numerical(e) => write!(f, "numerical: {e}"),
            Self::Instability(e) => write!(f, "instability: {e}"),
            Self::Resource(e) => write!(f, "resource: {e}"),
            Self::Comm(e) => write!(f, "communication: {e}"),
            Self::InvalidState { operation, state } => {
                write!(f, "cannot {operation} in state {state}")
            }
            Self::Worker { rank, reason } => write!(f, "worker {rank}: {reason}"),
        }
    }
}

impl Error for SolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Numerical(e) => Some(e),
            Self::Instability(e) => Some(e),
            Self::Resource(e) => Some(e),
            Self::Comm(e) => Some(e),
            Self::InvalidState { .. } | Self::Worker { .. } => None,
        }
    }
}

impl From<ConfigError> for SolverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<NumericalError> for SolverError {
    fn from(e: NumericalError) -> Self {
        Self::Numerical(e)
    }
}

impl From<NumericalInstabilityError> for SolverError {
    fn from(e: NumericalInstabilityError) -> Self {
        Self::Instability(e)
    }
}

impl From<ResourceInitializationError> for SolverError {
    fn from(e: ResourceInitializationError) -> Self {
        Self::Resource(e)
    }
}

impl From<CommError> for SolverError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_error_chains_source() {
        let e = SolverError::from(ConfigError::MissingParameter {
            key: "TIME_RECORD_LENGTH".into(),
        });
        assert!(e.source().is_some());
        assert_eq!(
            e.to_string(),
            "configuration: missing required parameter TIME_RECORD_LENGTH"
        );
    }

    #[test]
    fn peer_abort_is_secondary() {
        assert!(SolverError::from(CommError::PeerAborted { rank: 1 }).is_secondary());
        let root = SolverError::from(NumericalInstabilityError {
            step: StepId(10),
            time: 0.5,
            norm: f64::INFINITY,
            ceiling: 1e10,
        });
        assert!(!root.is_secondary());
    }

    #[test]
    fn resource_error_display() {
        let e = ResourceInitializationError::AlreadyInitialized {
            resource: "transform provider",
        };
        assert_eq!(e.to_string(), "transform provider is already initialized");
    }
}
