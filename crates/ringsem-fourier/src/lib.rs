//! Azimuthal transforms between ring samples and Fourier coefficients.
//!
//! Every field in the solver is stored per azimuthal order. Element
//! kernels that need pointwise products (3-D material, 3-D masses) move
//! data to the physical ring with [`TransformProvider::inverse`] and
//! back with [`TransformProvider::forward`].
//!
//! # Lifecycle
//!
//! Plans are owned by a [`TransformContext`], one per worker:
//!
//! ```text
//! Uninitialized ──initialize(max_nr)──► Initialized ──finalize()──► Finalized
//!                                           ▲                          │
//!                                           └──────initialize(max_nr)──┘
//! ```
//!
//! Double initialization, use before initialization and finalization
//! without initialization are reported as
//! [`ResourceInitializationError`](ringsem_core::ResourceInitializationError).
//!
//! # Conventions
//!
//! Physical data of multiplicity `w` on a ring of `nr` samples is laid
//! out sample-major (`phys[k * w + c]`). Coefficients are order-major
//! (`coeffs[m * w + c]`) for orders `0..=nr / 2`. The forward transform
//! carries the `1 / nr` normalisation, so a real field is recovered as
//! `x(φ) = Re X₀ + 2 Σ Re(Xₘ e^{imφ})` plus the real Nyquist term.
//!
//! Each ring size gets its own real-input FFT plan from `realfft`, so a
//! transform of `nr` samples costs `O(nr log nr)` per column.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod context;
pub mod multiplicity;
pub mod plan;

pub use cache::{CacheError, PlanCache};
pub use context::{LifecycleState, TransformContext};
pub use multiplicity::Multiplicity;
pub use plan::{PlanRecord, RingPlan, TransformProvider};
