//! Source injection into the solid force field.

use num_complex::Complex64;
use ringsem_arena::KinematicState;

/// Spatial force pattern of one source on the points of its element.
///
/// The force added at step `n` is `stf[n]` times the pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceTerm {
    /// `(local solid point, coefficients)`; the coefficients cover the
    /// point's carried orders, order-major with three components each.
    pattern: Vec<(u32, Vec<Complex64>)>,
}

impl SourceTerm {
    /// A source acting on the given points.
    pub fn new(pattern: Vec<(u32, Vec<Complex64>)>) -> Self {
        Self { pattern }
    }

    /// Number of points the source acts on.
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    /// Whether the source acts on no point.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// The per-point pattern.
    pub fn pattern(&self) -> &[(u32, Vec<Complex64>)] {
        &self.pattern
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.pattern
            .iter()
            .map(|(_, c)| 4 + c.len() * std::mem::size_of::<Complex64>())
            .sum()
    }

    /// Add `amplitude` times the pattern to the solid force.
    pub fn inject(&self, amplitude: f64, solid: &mut KinematicState) {
        let (layout, _, force) = solid.stiffness_view();
        for (p, coeffs) in &self.pattern {
            let range = layout.range(*p as usize);
            for (f, c) in force[range].iter_mut().zip(coeffs) {
                *f += *c * amplitude;
            }
        }
    }
}
