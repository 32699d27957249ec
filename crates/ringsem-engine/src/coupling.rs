//! Solid–fluid boundary coupling.
//!
//! A point on the solid–fluid boundary exists twice: as a solid point
//! carrying displacement and as a fluid point carrying the potential.
//! The fluid is driven by the normal displacement of the solid, the
//! solid by the pressure `-χ̈` of the fluid. Each worker adds the terms
//! of its own boundary edges; the boundary exchange sums the partials of
//! points shared between workers.

use ringsem_arena::KinematicState;

/// One coupled pair of points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplingPoint {
    /// Local solid point index.
    pub solid: u32,
    /// Local fluid point index.
    pub fluid: u32,
    /// Boundary normal from fluid into solid, `[s, z]`, scaled by the
    /// quadrature-weighted boundary area of the local edges.
    pub area_normal: [f64; 2],
}

/// All coupled pairs of one worker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Coupling {
    points: Vec<CouplingPoint>,
}

impl Coupling {
    /// Coupling over the given pairs.
    pub fn new(points: Vec<CouplingPoint>) -> Self {
        Self { points }
    }

    /// Number of coupled pairs.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no pair is coupled.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The coupled pairs.
    pub fn points(&self) -> &[CouplingPoint] {
        &self.points
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.points.len() * std::mem::size_of::<CouplingPoint>()
    }

    /// Add `A n·u` of the solid displacement to the fluid force.
    pub fn solid_to_fluid(&self, solid: &KinematicState, fluid: &mut KinematicState) {
        let (fl, _, force) = fluid.stiffness_view();
        let sl = solid.layout();
        for cp in &self.points {
            let s = sl.range(cp.solid as usize).start;
            let f = fl.range(cp.fluid as usize).start;
            let orders = sl.orders(cp.solid as usize).min(fl.orders(cp.fluid as usize));
            let [ns, nz] = cp.area_normal;
            for m in 0..orders {
                let u = &solid.displ[s + 3 * m..s + 3 * m + 3];
                force[f + m] += u[0] * ns + u[2] * nz;
            }
        }
    }

    /// Subtract `A n χ̈` of the fluid acceleration from the solid force.
    pub fn fluid_to_solid(&self, fluid: &KinematicState, solid: &mut KinematicState) {
        let (sl, _, force) = solid.stiffness_view();
        let fl = fluid.layout();
        for cp in &self.points {
            let s = sl.range(cp.solid as usize).start;
            let f = fl.range(cp.fluid as usize).start;
            let orders = sl.orders(cp.solid as usize).min(fl.orders(cp.fluid as usize));
            let [ns, nz] = cp.area_normal;
            for m in 0..orders {
                let a = fluid.accel[f + m];
                force[s + 3 * m] -= a * ns;
                force[s + 3 * m + 2] -= a * nz;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use ringsem_arena::FieldLayout;

    fn pair() -> (KinematicState, KinematicState, Coupling) {
        let solid = KinematicState::new(FieldLayout::new(3, vec![2, 3]));
        let fluid = KinematicState::new(FieldLayout::new(1, vec![2]));
        let coupling = Coupling::new(vec![CouplingPoint {
            solid: 1,
            fluid: 0,
            area_normal: [0.6, 0.8],
        }]);
        (solid, fluid, coupling)
    }

    #[test]
    fn normal_displacement_drives_fluid() {
        let (mut solid, mut fluid, coupling) = pair();
        // Point 1 starts at offset 6; order 1 at 9.
        solid.displ[9] = Complex64::new(1.0, 0.0);
        solid.displ[10] = Complex64::new(5.0, 0.0);
        solid.displ[11] = Complex64::new(2.0, 1.0);
        coupling.solid_to_fluid(&solid, &mut fluid);
        assert_eq!(fluid.force[0], Complex64::new(0.0, 0.0));
        let f = fluid.force[1];
        assert!((f.re - 2.2).abs() < 1e-15 && (f.im - 0.8).abs() < 1e-15);
    }

    #[test]
    fn fluid_pressure_pushes_solid_along_normal() {
        let (mut solid, mut fluid, coupling) = pair();
        fluid.accel[0] = Complex64::new(2.0, 0.0);
        coupling.fluid_to_solid(&fluid, &mut solid);
        assert_eq!(solid.force[6], Complex64::new(-1.2, 0.0));
        assert_eq!(solid.force[7], Complex64::new(0.0, 0.0));
        assert_eq!(solid.force[8], Complex64::new(-1.6, 0.0));
        // Order 2 of the solid point has no fluid counterpart.
        assert!(solid.force[12..].iter().all(|f| f.norm() == 0.0));
    }
}
