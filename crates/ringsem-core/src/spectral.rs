//! Spectral-element discretisation constants.

/// Polynomial order of the Lagrange basis on each element edge.
pub const NPOL: usize = 4;

/// Number of GLL points along one element edge.
pub const NPOINTS_EDGE: usize = NPOL + 1;

/// Number of GLL points in one (meridional) element.
pub const NPOINTS_ELEM: usize = NPOINTS_EDGE * NPOINTS_EDGE;

/// Highest azimuthal order carried for a ring of `nr` samples.
///
/// The Nyquist order of an even ring is dropped, so every kept order
/// above zero carries the same weight in the real transform.
pub fn max_order(nr: usize) -> usize {
    if nr == 0 {
        0
    } else {
        (nr - 1) / 2
    }
}
