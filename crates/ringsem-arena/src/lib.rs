//! Preallocated storage for the time loop.
//!
//! Everything the time loop touches is sized during the preloop:
//!
//! ```text
//! ElementWorkspace (one per element kind, per worker)
//! ├── ScratchRegion<Complex64>  per-order coefficient buffers
//! └── ScratchRegion<f64>        per-ring-sample physical buffers
//! KinematicState (one per point kind, per worker)
//! └── FieldLayout               per-point offsets and order counts
//! ```
//!
//! Scratch regions never grow. A request beyond the capacity fixed at
//! initialization is a [`ResourceInitializationError`](ringsem_core::ResourceInitializationError),
//! not a reallocation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod layout;
pub mod scratch;
pub mod state;
pub mod workspace;

pub use layout::FieldLayout;
pub use scratch::ScratchRegion;
pub use state::KinematicState;
pub use workspace::{ElementWorkspace, WorkspaceShape};
