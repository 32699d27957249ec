//! Solid and fluid spectral elements.
//!
//! An element owns its gradient tables, its quadrature-weighted material
//! and, for attenuating solids, its memory variables. Its per-step
//! [`update`](Element::update) gathers the coefficients of its points,
//! applies `Gᴴ D G` order by order (or on the physical ring when the
//! material varies in azimuth) and scatters `-K u` into the force field.
//! All temporaries come from a [`Workspaces`] shared by every element of
//! the worker, so the update never allocates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attenuation;
pub mod element;
pub mod fluid;
pub mod gll;
pub mod gradient;
pub mod material;
pub mod solid;

pub use attenuation::{AttenuationMemory, SlsCoefficients};
pub use element::{Element, ElementKind, Workspaces};
pub use fluid::{FluidElement, FLUID_WORKSPACE};
pub use gll::{DerivativeMatrix, GllBasis};
pub use gradient::GradientOperator;
pub use material::{FluidMaterial, SolidMaterial};
pub use solid::{SolidElement, SOLID_WORKSPACE};
