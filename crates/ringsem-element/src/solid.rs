//! Elastic (optionally attenuating) solid element.

use num_complex::Complex64;
use ringsem_arena::{ElementWorkspace, FieldLayout, KinematicState, WorkspaceShape};
use ringsem_core::spectral::max_order;
use ringsem_core::{ElementId, ResourceInitializationError, NPOINTS_ELEM};
use ringsem_fourier::{Multiplicity, TransformProvider};

use crate::attenuation::AttenuationMemory;
use crate::gradient::GradientOperator;
use crate::material::{expand, isotropic_stress, strain, SolidMaterial};

const N: usize = NPOINTS_ELEM;
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Scratch widths of the solid kernel: displacement (3N), gradient (9N)
/// and stress (6N) per order; gradient (9N) and stress (6N) per sample.
pub const SOLID_WORKSPACE: WorkspaceShape = WorkspaceShape {
    name: "solid workspace",
    coeff_width: 18 * N,
    phys_width: 15 * N,
};

/// A solid spectral element carrying a displacement vector.
#[derive(Clone, Debug, PartialEq)]
pub struct SolidElement {
    id: ElementId,
    nr: usize,
    orders: usize,
    points: [u32; N],
    gradient: GradientOperator,
    material: SolidMaterial,
    attenuation: Option<AttenuationMemory>,
}

struct Buffers<'a> {
    disp: &'a mut [Complex64],
    grad: &'a mut [Complex64],
    stress: &'a mut [Complex64],
    grad_phys: &'a mut [f64],
    stress_phys: &'a mut [f64],
}

impl SolidElement {
    /// Assemble an element from its precomputed parts.
    ///
    /// `points` index the solid point layout of the owning domain.
    pub fn new(
        id: ElementId,
        nr: usize,
        points: [u32; N],
        gradient: GradientOperator,
        material: SolidMaterial,
        attenuation: Option<AttenuationMemory>,
    ) -> Self {
        Self {
            id,
            nr,
            orders: max_order(nr) + 1,
            points,
            gradient,
            material,
            attenuation,
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

    /// Material tables.
    pub fn material(&self) -> &SolidMaterial {
        &self.material
    }

    /// Whether memory variables are carried.
    pub fn is_attenuating(&self) -> bool {
        self.attenuation.is_some()
    }

    /// Heap memory held by this element in bytes.
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.material.memory_bytes()
            + self.attenuation.as_ref().map_or(0, |a| a.memory_bytes())
    }

    fn carve<'a>(
        nr: usize,
        ws: &'a mut ElementWorkspace,
    ) -> Result<Buffers<'a>, ResourceInitializationError> {
        let (coeff, phys) = ws.regions(nr)?;
        let total = nr / 2 + 1;
        let [disp, grad, stress] = coeff.carve([total * 3 * N, total * 9 * N, total * 6 * N])?;
        let [grad_phys, stress_phys] = phys.carve([nr * 9 * N, nr * 6 * N])?;
        Ok(Buffers {
            disp,
            grad,
            stress,
            grad_phys,
            stress_phys,
        })
    }

    /// Add this element's internal force `-K u` to the solid force field.
    pub fn update(
        &mut self,
        ws: &mut ElementWorkspace,
        tf: &TransformProvider,
        state: &mut KinematicState,
    ) -> Result<(), ResourceInitializationError> {
        let (layout, displ, force) = state.stiffness_view();
        let mut buf = Self::carve(self.nr, ws)?;
        self.gather(layout, displ, buf.disp);
        stiffness(
            &self.gradient,
            &self.material,
            self.attenuation.as_mut(),
            self.nr,
            self.orders,
            tf,
            &mut buf,
        )?;
        self.scatter(layout, buf.disp, force);
        Ok(())
    }

    /// Element-local `K u` without attenuation, for diagnostics.
    ///
    /// `u` and `ku` hold `orders() * 3N` values, order-major.
    pub fn apply_stiffness(
        &self,
        ws: &mut ElementWorkspace,
        tf: &TransformProvider,
        u: &[Complex64],
        ku: &mut [Complex64],
    ) -> Result<(), ResourceInitializationError> {
        let mut buf = Self::carve(self.nr, ws)?;
        let n = self.orders * 3 * N;
        buf.disp[..n].copy_from_slice(&u[..n]);
        buf.disp[n..].fill(ZERO);
        stiffness(
            &self.gradient,
            &self.material,
            None,
            self.nr,
            self.orders,
            tf,
            &mut buf,
        )?;
        ku[..n].copy_from_slice(&buf.disp[..n]);
        Ok(())
    }

    fn gather(&self, layout: &FieldLayout, displ: &[Complex64], disp: &mut [Complex64]) {
        for (p, &pt) in self.points.iter().enumerate() {
            let start = layout.range(pt as usize).start;
            for m in 0..self.orders {
                for c in 0..3 {
                    disp[m * 3 * N + c * N + p] = displ[start + m * 3 + c];
                }
            }
        }
        disp[self.orders * 3 * N..].fill(ZERO);
    }

    fn scatter(&self, layout: &FieldLayout, f: &[Complex64], force: &mut [Complex64]) {
        for (p, &pt) in self.points.iter().enumerate() {
            let start = layout.range(pt as usize).start;
            for m in 0..self.orders {
                for c in 0..3 {
                    force[start + m * 3 + c] -= f[m * 3 * N + c * N + p];
                }
            }
        }
    }
}

/// Replace the displacement in `buf.disp` with `Gᴴ σ(G u)` for the
/// carried orders.
fn stiffness(
    op: &GradientOperator,
    material: &SolidMaterial,
    mut attenuation: Option<&mut AttenuationMemory>,
    nr: usize,
    orders: usize,
    tf: &TransformProvider,
    buf: &mut Buffers<'_>,
) -> Result<(), ResourceInitializationError> {
    let total = nr / 2 + 1;
    for m in 0..orders {
        op.vector(
            m,
            &buf.disp[m * 3 * N..(m + 1) * 3 * N],
            &mut buf.grad[m * 9 * N..(m + 1) * 9 * N],
        );
    }

    match material {
        SolidMaterial::Axisymmetric { lambda, mu } => {
            for m in 0..orders {
                let g = &buf.grad[m * 9 * N..(m + 1) * 9 * N];
                let s = &mut buf.stress[m * 6 * N..(m + 1) * 6 * N];
                for p in 0..N {
                    let sigma = isotropic_stress(strain(g, p), lambda[p], mu[p]);
                    for (c, v) in sigma.into_iter().enumerate() {
                        s[c * N + p] = v;
                    }
                }
            }
        }
        SolidMaterial::Ring { lambda, mu, .. } => {
            buf.grad[orders * 9 * N..total * 9 * N].fill(ZERO);
            tf.inverse(Multiplicity::N9, nr, &buf.grad[..total * 9 * N], buf.grad_phys)?;
            for k in 0..nr {
                let g = &buf.grad_phys[k * 9 * N..(k + 1) * 9 * N];
                let s = &mut buf.stress_phys[k * 6 * N..(k + 1) * 6 * N];
                for p in 0..N {
                    let sigma = isotropic_stress(strain(g, p), lambda[k * N + p], mu[k * N + p]);
                    for (c, v) in sigma.into_iter().enumerate() {
                        s[c * N + p] = v;
                    }
                }
            }
            tf.forward(Multiplicity::N6, nr, buf.stress_phys, &mut buf.stress[..total * 6 * N])?;
        }
    }

    if let Some(att) = attenuation.as_deref_mut() {
        let mut eps = [ZERO; 6 * N];
        for m in 0..orders {
            let g = &buf.grad[m * 9 * N..(m + 1) * 9 * N];
            for p in 0..N {
                for (c, v) in strain(g, p).into_iter().enumerate() {
                    eps[c * N + p] = v;
                }
            }
            att.apply(m, &eps, &mut buf.stress[m * 6 * N..(m + 1) * 6 * N]);
        }
    }

    for m in 0..orders {
        let s = &buf.stress[m * 6 * N..(m + 1) * 6 * N];
        let t = &mut buf.grad[m * 9 * N..(m + 1) * 9 * N];
        for p in 0..N {
            let full = expand(std::array::from_fn(|c| s[c * N + p]));
            for (c, v) in full.into_iter().enumerate() {
                t[c * N + p] = v;
            }
        }
        op.vector_adjoint(
            m,
            &buf.grad[m * 9 * N..(m + 1) * 9 * N],
            &mut buf.disp[m * 3 * N..(m + 1) * 3 * N],
        );
    }
    Ok(())
}
