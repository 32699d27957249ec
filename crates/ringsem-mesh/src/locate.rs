//! Placing sources and receivers in the mesh.

use ringsem_core::{ElementId, PointId, NPOINTS_ELEM};
use ringsem_element::ElementKind;

const N: usize = NPOINTS_ELEM;

/// A position given by depth below the surface and spherical angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Depth below the outer radius in metres.
    pub depth: f64,
    /// Colatitude in radians.
    pub theta: f64,
    /// Azimuth in radians.
    pub phi: f64,
}

/// Result of [`Mesh::locate`](crate::Mesh::locate).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Located {
    /// The containing element.
    pub element: ElementId,
    /// Its kind.
    pub kind: ElementKind,
    /// Rank of the worker owning it.
    pub owner: usize,
    /// Reference coordinate along the radius.
    pub xi: f64,
    /// Reference coordinate along colatitude.
    pub eta: f64,
    /// Lattice id of the nearest GLL point of the element.
    pub point: PointId,
    /// `[r, θ]` of that point.
    pub point_polar: [f64; 2],
}

/// Geometry and local numbering of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementFrame {
    /// Element id.
    pub id: ElementId,
    /// Element kind.
    pub kind: ElementKind,
    /// Ring size.
    pub nr: usize,
    /// Owning rank.
    pub owner: usize,
    /// `[s, z]` of every point.
    pub coords: [[f64; 2]; N],
    /// `[r, θ]` of every point.
    pub polar: [[f64; 2]; N],
    /// Local index of every point on this worker.
    pub local: [Option<u32>; N],
    /// Orders carried by every point.
    pub orders: [usize; N],
}
