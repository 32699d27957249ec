//! Number of real values carried per ring sample.

use ringsem_core::NPOINTS_ELEM;

/// Per-sample width of a transform.
///
/// `One` and `Three` serve single points (scalar and vector masses),
/// the `N*` variants serve whole elements: a scalar gradient (`N3`), a
/// symmetric tensor (`N6`) and a full tensor (`N9`) at every GLL point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// One value per sample.
    One,
    /// Three values per sample.
    Three,
    /// Three values at every element point.
    N3,
    /// Six values at every element point.
    N6,
    /// Nine values at every element point.
    N9,
}

impl Multiplicity {
    /// All supported multiplicities.
    pub const ALL: [Multiplicity; 5] = [Self::One, Self::Three, Self::N3, Self::N6, Self::N9];

    /// Number of real values per ring sample.
    pub const fn width(self) -> usize {
        match self {
            Self::One => 1,
            Self::Three => 3,
            Self::N3 => 3 * NPOINTS_ELEM,
            Self::N6 => 6 * NPOINTS_ELEM,
            Self::N9 => 9 * NPOINTS_ELEM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        let w: Vec<usize> = Multiplicity::ALL.iter().map(|m| m.width()).collect();
        assert_eq!(w, vec![1, 3, 75, 150, 225]);
    }
}
