//! Meridional mesh, partitioning and operator construction.
//!
//! A [`Mesh`] turns a radially layered model, an azimuthal ring-size
//! field and optional 3-D providers into the elements, point masses,
//! solid–fluid coupling and exchange plans of one partition worker.
//! It is built in two steps around the choice of the time step: the
//! unweighted build gives the stable `dt` of the geometry, the weighted
//! build produces the operators for the final `dt`, and
//! [`Mesh::release`] hands them to the worker's
//! [`Domain`](ringsem_engine::Domain).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attenuation;
pub mod diagnostics;
mod geometry;
pub mod locate;
pub mod mesh;
pub mod models;
pub mod partition;
mod weighted;

pub use attenuation::{AttenuationBuilder, AttenuationTable};
pub use diagnostics::MeshReport;
pub use locate::{ElementFrame, Located, Location};
pub use mesh::{Mesh, MeshPhase};
pub use models::{Layer, LayeredModel, UniformNrField};
pub use partition::Partition;
