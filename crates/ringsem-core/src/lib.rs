//! Core types and traits for the ringsem spectral-element solver.
//!
//! This is the leaf crate of the workspace. It defines the identifiers,
//! the error taxonomy shared by every stage of the run, the validated
//! solver configuration, and the traits through which external model
//! providers (1-D background model, azimuthal-order field, 3-D
//! perturbations) are consumed by the mesher.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod alloc_guard;
pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod spectral;

pub use config::{AttenuationConfig, SolverConfig, StfConfig, StfKind};
pub use error::{
    CommError, ConfigError, NumericalError, NumericalInstabilityError,
    ResourceInitializationError, SolverError,
};
pub use id::{ElementId, PointId, StepId};
pub use model::{
    ExodusModel, Geometric3D, Material, NrField, OceanLoad3D, Perturbation, Volumetric3D,
};
pub use spectral::{NPOINTS_EDGE, NPOINTS_ELEM, NPOL};
