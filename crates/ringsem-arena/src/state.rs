//! Kinematic state of one point kind.

use num_complex::Complex64;

use crate::layout::FieldLayout;

/// Displacement, velocity, acceleration and force coefficients of every
/// point of one kind (solid vector or fluid potential).
#[derive(Clone, Debug)]
pub struct KinematicState {
    layout: FieldLayout,
    /// Displacement (or potential).
    pub displ: Vec<Complex64>,
    /// First time derivative.
    pub veloc: Vec<Complex64>,
    /// Second time derivative.
    pub accel: Vec<Complex64>,
    /// Assembled force of the current step.
    pub force: Vec<Complex64>,
}

impl KinematicState {
    /// Zeroed state for the given layout.
    pub fn new(layout: FieldLayout) -> Self {
        let zero = vec![Complex64::new(0.0, 0.0); layout.total()];
        Self {
            displ: zero.clone(),
            veloc: zero.clone(),
            accel: zero.clone(),
            force: zero,
            layout,
        }
    }

    /// The storage layout.
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Layout, displacement and force, borrowed for a stiffness pass.
    pub fn stiffness_view(&mut self) -> (&FieldLayout, &[Complex64], &mut [Complex64]) {
        (&self.layout, &self.displ, &mut self.force)
    }

    /// Layout, force and acceleration, borrowed for the mass division.
    pub fn acceleration_view(&mut self) -> (&FieldLayout, &[Complex64], &mut [Complex64]) {
        (&self.layout, &self.force, &mut self.accel)
    }

    /// Clear the force buffer.
    pub fn zero_force(&mut self) {
        self.force.fill(Complex64::new(0.0, 0.0));
    }

    /// Largest coefficient magnitude of the displacement, or infinity if
    /// any coefficient is not finite.
    pub fn max_displacement(&self) -> f64 {
        let mut max = 0.0f64;
        for u in &self.displ {
            let a = u.norm();
            if !a.is_finite() {
                return f64::INFINITY;
            }
            max = max.max(a);
        }
        max
    }

    /// Memory usage of the four buffers in bytes.
    pub fn memory_bytes(&self) -> usize {
        4 * self.layout.total() * std::mem::size_of::<Complex64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_zero() {
        let state = KinematicState::new(FieldLayout::new(3, vec![2, 2]));
        assert_eq!(state.displ.len(), 12);
        assert_eq!(state.max_displacement(), 0.0);
    }

    #[test]
    fn non_finite_displacement_reports_infinity() {
        let mut state = KinematicState::new(FieldLayout::new(1, vec![3]));
        state.displ[1] = Complex64::new(f64::NAN, 0.0);
        assert_eq!(state.max_displacement(), f64::INFINITY);
    }

    #[test]
    fn max_displacement_uses_magnitude() {
        let mut state = KinematicState::new(FieldLayout::new(1, vec![2]));
        state.displ[0] = Complex64::new(3.0, 4.0);
        state.displ[1] = Complex64::new(-2.0, 0.0);
        assert_eq!(state.max_displacement(), 5.0);
    }

    #[test]
    fn zero_force_clears() {
        let mut state = KinematicState::new(FieldLayout::new(1, vec![2]));
        state.force[1] = Complex64::new(1.0, 1.0);
        state.zero_force();
        assert!(state.force.iter().all(|f| f.norm() == 0.0));
    }
}
