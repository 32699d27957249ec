//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a spectral element within the global mesh.
///
/// Element ids are assigned row-major over the structured (r, θ) element
/// grid and are stable across partitions: the same element carries the
/// same id on whichever worker owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ElementId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a GLL point of the global (unpartitioned) point lattice.
///
/// Points shared by several elements, and by several partitions, carry
/// one global id. Partition boundary exchange is keyed on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PointId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing time-step counter.
///
/// Step 0 is the first step of the time loop, at time `-shift`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
