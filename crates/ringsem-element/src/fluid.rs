//! Acoustic fluid element carrying a scalar potential.

use num_complex::Complex64;
use ringsem_arena::{ElementWorkspace, FieldLayout, KinematicState, WorkspaceShape};
use ringsem_core::spectral::max_order;
use ringsem_core::{ElementId, ResourceInitializationError, NPOINTS_ELEM};
use ringsem_fourier::{Multiplicity, TransformProvider};

use crate::gradient::GradientOperator;
use crate::material::FluidMaterial;

const N: usize = NPOINTS_ELEM;
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Scratch widths of the fluid kernel: potential (N) and gradient (3N)
/// per order; gradient (3N) per sample.
pub const FLUID_WORKSPACE: WorkspaceShape = WorkspaceShape {
    name: "fluid workspace",
    coeff_width: 4 * N,
    phys_width: 3 * N,
};

/// A fluid spectral element.
#[derive(Clone, Debug, PartialEq)]
pub struct FluidElement {
    id: ElementId,
    nr: usize,
    orders: usize,
    points: [u32; N],
    gradient: GradientOperator,
    material: FluidMaterial,
}

impl FluidElement {
    /// Assemble an element from its precomputed parts.
    ///
    /// `points` index the fluid point layout of the owning domain.
    pub fn new(
        id: ElementId,
        nr: usize,
        points: [u32; N],
        gradient: GradientOperator,
        material: FluidMaterial,
    ) -> Self {
        Self {
            id,
            nr,
            orders: max_order(nr) + 1,
            points,
            gradient,
            material,
        }
    }

    /// Element id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Ring size.
    pub fn nr(&self) -> usize {
        self.nr
    }

    /// Number of azimuthal orders carried.
    pub fn orders(&self) -> usize {
        self.orders
    }

    /// Point indices.
    pub fn points(&self) -> &[u32; N] {
        &self.points
    }

    /// Gradient tables.
    pub fn gradient(&self) -> &GradientOperator {
        &self.gradient
    }

    /// Material table.
    pub fn material(&self) -> &FluidMaterial {
        &self.material
    }

    /// Heap memory held by this element in bytes.
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.material.memory_bytes()
    }

    /// Add this element's internal force `-K χ` to the fluid force field.
    pub fn update(
        &self,
        ws: &mut ElementWorkspace,
        tf: &TransformProvider,
        state: &mut KinematicState,
    ) -> Result<(), ResourceInitializationError> {
        let (layout, displ, force) = state.stiffness_view();
        let (coeff, phys) = ws.regions(self.nr)?;
        let total = self.nr / 2 + 1;
        let [chi, grad] = coeff.carve([total * N, total * 3 * N])?;
        let [grad_phys] = phys.carve([self.nr * 3 * N])?;
        self.gather(layout, displ, chi);
        self.stiffness(tf, chi, grad, grad_phys)?;
        self.scatter(layout, chi, force);
        Ok(())
    }

    /// Element-local `K χ`, for diagnostics.
    ///
    /// `chi` and `kchi` hold `orders() * N` values, order-major.
    pub fn apply_stiffness(
        &self,
        ws: &mut ElementWorkspace,
        tf: &TransformProvider,
        chi: &[Complex64],
        kchi: &mut [Complex64],
    ) -> Result<(), ResourceInitializationError> {
        let (coeff, phys) = ws.regions(self.nr)?;
        let total = self.nr / 2 + 1;
        let [local, grad] = coeff.carve([total * N, total * 3 * N])?;
        let [grad_phys] = phys.carve([self.nr * 3 * N])?;
        let n = self.orders * N;
        local[..n].copy_from_slice(&chi[..n]);
        local[n..].fill(ZERO);
        self.stiffness(tf, local, grad, grad_phys)?;
        kchi[..n].copy_from_slice(&local[..n]);
        Ok(())
    }

    fn gather(&self, layout: &FieldLayout, displ: &[Complex64], chi: &mut [Complex64]) {
        for (p, &pt) in self.points.iter().enumerate() {
            let start = layout.range(pt as usize).start;
            for m in 0..self.orders {
                chi[m * N + p] = displ[start + m];
            }
        }
        chi[self.orders * N..].fill(ZERO);
    }

    fn scatter(&self, layout: &FieldLayout, f: &[Complex64], force: &mut [Complex64]) {
        for (p, &pt) in self.points.iter().enumerate() {
            let start = layout.range(pt as usize).start;
            for m in 0..self.orders {
                force[start + m] -= f[m * N + p];
            }
        }
    }

    /// Replace `chi` with `Gᴴ (W/ρ) G χ` for the carried orders.
    fn stiffness(
        &self,
        tf: &TransformProvider,
        chi: &mut [Complex64],
        grad: &mut [Complex64],
        grad_phys: &mut [f64],
    ) -> Result<(), ResourceInitializationError> {
        let total = self.nr / 2 + 1;
        for m in 0..self.orders {
            self.gradient.scalar(
                m,
                &chi[m * N..(m + 1) * N],
                &mut grad[m * 3 * N..(m + 1) * 3 * N],
            );
        }
        match &self.material {
            FluidMaterial::Axisymmetric { inv_rho } => {
                for m in 0..self.orders {
                    let g = &mut grad[m * 3 * N..(m + 1) * 3 * N];
                    for c in 0..3 {
                        for p in 0..N {
                            g[c * N + p] *= inv_rho[p];
                        }
                    }
                }
            }
            FluidMaterial::Ring { inv_rho, .. } => {
                let nr = self.nr;
                grad[self.orders * 3 * N..total * 3 * N].fill(ZERO);
                tf.inverse(Multiplicity::N3, nr, &grad[..total * 3 * N], grad_phys)?;
                for k in 0..nr {
                    let g = &mut grad_phys[k * 3 * N..(k + 1) * 3 * N];
                    for c in 0..3 {
                        for p in 0..N {
                            g[c * N + p] *= inv_rho[k * N + p];
                        }
                    }
                }
                tf.forward(Multiplicity::N3, nr, grad_phys, &mut grad[..total * 3 * N])?;
            }
        }
        for m in 0..self.orders {
            self.gradient.scalar_adjoint(
                m,
                &grad[m * 3 * N..(m + 1) * 3 * N],
                &mut chi[m * N..(m + 1) * N],
            );
        }
        Ok(())
    }
}
