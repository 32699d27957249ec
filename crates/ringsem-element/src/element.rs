//! Uniform dispatch over element kinds.

use ringsem_arena::{ElementWorkspace, KinematicState};
use ringsem_core::{ElementId, ResourceInitializationError};
use ringsem_fourier::TransformProvider;

use crate::fluid::{FluidElement, FLUID_WORKSPACE};
use crate::solid::{SolidElement, SOLID_WORKSPACE};

/// Kind of an element or point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Elastic solid, displacement vector.
    Solid,
    /// Acoustic fluid, scalar potential.
    Fluid,
}

/// A spectral element of either kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Solid element.
    Solid(SolidElement),
    /// Fluid element.
    Fluid(FluidElement),
}

impl Element {
    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Solid(_) => ElementKind::Solid,
            Self::Fluid(_) => ElementKind::Fluid,
        }
    }

    /// Element id.
    pub fn id(&self) -> ElementId {
        match self {
            Self::Solid(e) => e.id(),
            Self::Fluid(e) => e.id(),
        }
    }

    /// Ring size.
    pub fn nr(&self) -> usize {
        match self {
            Self::Solid(e) => e.nr(),
            Self::Fluid(e) => e.nr(),
        }
    }

    /// Whether the element forms products on the physical ring.
    pub fn is_ring(&self) -> bool {
        match self {
            Self::Solid(e) => e.material().is_ring(),
            Self::Fluid(e) => e.material().is_ring(),
        }
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::Solid(e) => e.memory_bytes(),
            Self::Fluid(e) => e.memory_bytes(),
        }
    }

    /// Add the internal force of this element to the force field of
    /// its kind.
    pub fn update(
        &mut self,
        ws: &mut Workspaces,
        tf: &TransformProvider,
        solid: &mut KinematicState,
        fluid: &mut KinematicState,
    ) -> Result<(), ResourceInitializationError> {
        match self {
            Self::Solid(e) => e.update(&mut ws.solid, tf, solid),
            Self::Fluid(e) => e.update(&mut ws.fluid, tf, fluid),
        }
    }

    /// One-line description.
    pub fn verbose(&self) -> String {
        match self {
            Self::Solid(e) => format!(
                "solid element {}: nr={}, orders={}, {} material{}",
                e.id(),
                e.nr(),
                e.orders(),
                if e.material().is_ring() { "3-D" } else { "1-D" },
                if e.is_attenuating() { ", attenuating" } else { "" }
            ),
            Self::Fluid(e) => format!(
                "fluid element {}: nr={}, orders={}, {} material",
                e.id(),
                e.nr(),
                e.orders(),
                if e.material().is_ring() { "3-D" } else { "1-D" }
            ),
        }
    }
}

/// The shared workspaces of both element kinds on one worker.
#[derive(Debug)]
pub struct Workspaces {
    /// Solid kernel scratch.
    pub solid: ElementWorkspace,
    /// Fluid kernel scratch.
    pub fluid: ElementWorkspace,
}

impl Default for Workspaces {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspaces {
    /// Uninitialized workspaces.
    pub fn new() -> Self {
        Self {
            solid: ElementWorkspace::new(SOLID_WORKSPACE),
            fluid: ElementWorkspace::new(FLUID_WORKSPACE),
        }
    }

    /// Size both workspaces for rings up to `2 * max_half_nr + 1`.
    pub fn init_workspace(&mut self, max_half_nr: usize) -> Result<(), ResourceInitializationError> {
        self.solid.init_workspace(max_half_nr)?;
        self.fluid.init_workspace(max_half_nr)
    }

    /// Memory held by both workspaces in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.solid.memory_bytes() + self.fluid.memory_bytes()
    }
}
