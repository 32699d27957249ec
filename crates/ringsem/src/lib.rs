//! Ringsem: spectral-element seismic wave propagation on azimuthal rings.
//!
//! This is the top-level facade crate. It re-exports the sub-crates and
//! adds the preloop pipeline ([`Preloop`]) and the multi-worker driver
//! ([`run_partitioned`]).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ringsem::prelude::*;
//!
//! let rock = Material { vp: 6000.0, vs: 3500.0, rho: 2700.0, q_kappa: 57823.0, q_mu: 600.0 };
//! let model = LayeredModel::homogeneous(1000e3, 2000e3, 2, 8, rock);
//! let location = Location { depth: 10e3, theta: 1.0, phi: 0.0 };
//! let source = Source::new(location, Mechanism::Force { r: 1e15, theta: 0.0, phi: 0.0 }).unwrap();
//! let config = SolverConfig::default();
//! let preloop = Preloop::new(config, Arc::new(model), Arc::new(UniformNrField::new(5)), source).unwrap();
//! let outputs = run_partitioned(&preloop).unwrap();
//! assert_eq!(outputs.len(), 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ringsem-core` | ids, errors, configuration, model traits |
//! | [`fourier`] | `ringsem-fourier` | ring transforms and their lifecycle |
//! | [`arena`] | `ringsem-arena` | field layouts, workspaces, kinematic state |
//! | [`element`] | `ringsem-element` | GLL basis and spectral elements |
//! | [`engine`] | `ringsem-engine` | domain, exchange and Newmark |
//! | [`mesh`] | `ringsem-mesh` | mesh, partitioning, attenuation |
//! | [`source`] | `ringsem-source` | source time functions, sources, receivers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod driver;
pub mod preloop;
pub mod timer;

pub use driver::{run_partitioned, run_workers};
pub use preloop::{Preloop, Prepared, WorkerOutput};
pub use timer::{StageTimer, StageTiming};

/// Ids, errors, configuration and model traits (`ringsem-core`).
pub use ringsem_core as types;

/// Ring transforms (`ringsem-fourier`).
pub use ringsem_fourier as fourier;

/// Field layouts and scratch storage (`ringsem-arena`).
pub use ringsem_arena as arena;

/// GLL basis and spectral elements (`ringsem-element`).
pub use ringsem_element as element;

/// Domain, communication and time integration (`ringsem-engine`).
pub use ringsem_engine as engine;

/// Mesh construction (`ringsem-mesh`).
pub use ringsem_mesh as mesh;

/// Sources and receivers (`ringsem-source`).
pub use ringsem_source as source;

/// Common imports for a typical run.
pub mod prelude {
    // Core
    pub use ringsem_core::{
        AttenuationConfig, ExodusModel, Geometric3D, Material, NrField, OceanLoad3D, Perturbation,
        SolverConfig, StfConfig, StfKind, Volumetric3D,
    };

    // Errors
    pub use ringsem_core::{
        CommError, ConfigError, NumericalError, NumericalInstabilityError,
        ResourceInitializationError, SolverError,
    };

    // Mesh
    pub use ringsem_mesh::{Layer, LayeredModel, Location, Mesh, Partition, UniformNrField};

    // Sources
    pub use ringsem_source::{Mechanism, ReceiverCollection, Source, SourceTimeFunction};

    // Engine
    pub use ringsem_engine::{Communicator, Domain, Newmark, SolveMetrics};

    // Pipeline
    pub use crate::{run_partitioned, Preloop, Prepared, WorkerOutput};
}
