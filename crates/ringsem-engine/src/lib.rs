//! Runtime domain and time loop of the ringsem solver.
//!
//! The preloop releases mesh, source and receiver data into a
//! [`Domain`]; a [`Newmark`] driver then owns the domain and advances it
//! step by step. Partition workers are joined by a [`Communicator`]
//! that provides the collective reductions and the per-step boundary
//! exchange. Nothing in the step path allocates once the domain is
//! initialized.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod comm;
pub mod coupling;
pub mod domain;
pub mod exchange;
pub mod mass;
pub mod metrics;
pub mod newmark;
pub mod source;
pub mod tap;

pub use comm::{Communicator, Message};
pub use coupling::{Coupling, CouplingPoint};
pub use domain::{Domain, MeshParts};
pub use exchange::ExchangePlan;
pub use mass::{PointMass, PointMasses};
pub use metrics::SolveMetrics;
pub use newmark::{Newmark, NewmarkState};
pub use source::SourceTerm;
pub use tap::ReceiverTap;
