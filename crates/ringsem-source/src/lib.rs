//! Sources, source time functions and receivers for ringsem.
//!
//! Everything here is built after the mesh is weighted and released into
//! a [`Domain`](ringsem_engine::Domain): the [`SourceTimeFunction`]
//! supplies the per-step amplitude, a [`Source`] the spatial force
//! pattern on the owning worker, and a [`ReceiverCollection`] the taps
//! recording displacement at named stations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod receivers;
pub mod source;
pub mod stf;

pub use receivers::{ReceiverCollection, Station};
pub use source::{Mechanism, Source};
pub use stf::SourceTimeFunction;
