//! Point masses and the force-to-acceleration step.
//!
//! The spectral-element mass matrix is diagonal in space. A point whose
//! mass does not vary along its ring divides every order by the same
//! value; a point on a 3-D ring transforms its force to the ring,
//! divides sample by sample and transforms back. Points under an ocean
//! load carry an extra mass that only acts on motion along the surface
//! normal.

use num_complex::Complex64;
use ringsem_arena::{KinematicState, ScratchRegion};
use ringsem_core::ResourceInitializationError;
use ringsem_fourier::{Multiplicity, TransformProvider};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Inverse mass of one point.
#[derive(Clone, Debug, PartialEq)]
pub enum PointMass {
    /// Mass constant along the ring.
    OneD {
        /// `1 / m`.
        inv_mass: f64,
    },
    /// Mass sampled on a ring of `nr` samples.
    ThreeD {
        /// Ring size.
        nr: usize,
        /// `1 / m` per ring sample.
        inv_mass: Vec<f64>,
    },
    /// Solid surface point with a water column constant along the ring.
    Ocean1D {
        /// Mass of the solid.
        mass: f64,
        /// Mass of the water column.
        ocean: f64,
        /// Unit surface normal, `[s, z]` components.
        normal: [f64; 2],
    },
    /// Solid surface point with a water column varying along the ring.
    Ocean3D {
        /// Ring size.
        nr: usize,
        /// Mass of the solid per ring sample.
        mass: Vec<f64>,
        /// Mass of the water column per ring sample.
        ocean: Vec<f64>,
        /// Unit surface normal, `[s, z]` components.
        normal: [f64; 2],
    },
}

impl PointMass {
    /// Pick the cheapest representation of a mass sampled on a ring.
    ///
    /// A ring whose samples are all equal collapses to [`OneD`](Self::OneD).
    pub fn from_ring(mass: &[f64]) -> Self {
        match mass.split_first() {
            Some((&first, rest)) if rest.iter().all(|&m| m == first) => Self::OneD {
                inv_mass: 1.0 / first,
            },
            _ => Self::ThreeD {
                nr: mass.len(),
                inv_mass: mass.iter().map(|m| 1.0 / m).collect(),
            },
        }
    }

    /// Ocean-loaded mass sampled on a ring.
    pub fn ocean_from_ring(mass: &[f64], ocean: &[f64], normal: [f64; 2]) -> Self {
        let uniform = |v: &[f64]| v.windows(2).all(|w| w[0] == w[1]);
        if uniform(mass) && uniform(ocean) && !mass.is_empty() && !ocean.is_empty() {
            Self::Ocean1D {
                mass: mass[0],
                ocean: ocean[0],
                normal,
            }
        } else {
            Self::Ocean3D {
                nr: mass.len(),
                mass: mass.to_vec(),
                ocean: ocean.to_vec(),
                normal,
            }
        }
    }

    /// Ring size the point needs for its division, `None` if it works
    /// order by order.
    pub fn ring(&self) -> Option<usize> {
        match self {
            Self::ThreeD { nr, .. } | Self::Ocean3D { nr, .. } => Some(*nr),
            _ => None,
        }
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::ThreeD { inv_mass, .. } => inv_mass.len() * 8,
            Self::Ocean3D { mass, ocean, .. } => (mass.len() + ocean.len()) * 8,
            _ => 0,
        }
    }
}

/// `(1/m) (I - m_o / (m + m_o) n nᵀ) f` for a vector `[s, φ, z]`.
fn ocean_divide<T>(f: [T; 3], mass: f64, ocean: f64, n: [f64; 2]) -> [T; 3]
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<f64, Output = T>,
{
    let inv = 1.0 / mass;
    let k = ocean / (mass + ocean);
    let fn_ = f[0] * n[0] + f[2] * n[1];
    [
        (f[0] - fn_ * (k * n[0])) * inv,
        f[1] * inv,
        (f[2] - fn_ * (k * n[1])) * inv,
    ]
}

/// Inverse masses of every point of one kind on one worker.
#[derive(Debug)]
pub struct PointMasses {
    dof: usize,
    masses: Vec<PointMass>,
    coeff: ScratchRegion<Complex64>,
    phys: ScratchRegion<f64>,
}

impl PointMasses {
    /// Masses for points carrying `dof` components per order (1 or 3).
    ///
    /// Scratch for the largest 3-D ring is allocated here.
    pub fn new(dof: usize, masses: Vec<PointMass>) -> Self {
        let max_nr = masses.iter().filter_map(PointMass::ring).max().unwrap_or(0);
        Self {
            dof,
            coeff: ScratchRegion::new("point mass ring", (max_nr / 2 + 1) * dof),
            phys: ScratchRegion::new("point mass ring", max_nr * dof),
            masses,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Per-point masses.
    pub fn masses(&self) -> &[PointMass] {
        &self.masses
    }

    /// Largest ring size among 3-D points.
    pub fn max_nr(&self) -> usize {
        self.masses.iter().filter_map(PointMass::ring).max().unwrap_or(0)
    }

    /// Number of points with 3-D masses.
    pub fn ring_count(&self) -> usize {
        self.masses.iter().filter(|m| m.ring().is_some()).count()
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.masses.iter().map(PointMass::memory_bytes).sum::<usize>()
            + self.masses.len() * std::mem::size_of::<PointMass>()
            + self.coeff.memory_bytes()
            + self.phys.memory_bytes()
    }

    /// Overwrite the acceleration with `M⁻¹ f`.
    pub fn accelerate(
        &mut self,
        tf: &TransformProvider,
        state: &mut KinematicState,
    ) -> Result<(), ResourceInitializationError> {
        let dof = self.dof;
        let mult = if dof == 1 {
            Multiplicity::One
        } else {
            Multiplicity::Three
        };
        let (layout, force, accel) = state.acceleration_view();
        for (p, mass) in self.masses.iter().enumerate() {
            let range = layout.range(p);
            let f = &force[range.clone()];
            let a = &mut accel[range];
            match mass {
                PointMass::OneD { inv_mass } => {
                    for (ai, fi) in a.iter_mut().zip(f) {
                        *ai = *fi * *inv_mass;
                    }
                }
                PointMass::Ocean1D {
                    mass,
                    ocean,
                    normal,
                } => {
                    for (ac, fc) in a.chunks_exact_mut(3).zip(f.chunks_exact(3)) {
                        let out = ocean_divide([fc[0], fc[1], fc[2]], *mass, *ocean, *normal);
                        ac.copy_from_slice(&out);
                    }
                }
                PointMass::ThreeD { nr, inv_mass } => {
                    let [coeffs] = self.coeff.carve([(nr / 2 + 1) * dof])?;
                    let [ring] = self.phys.carve([nr * dof])?;
                    load(coeffs, f);
                    tf.inverse(mult, *nr, coeffs, ring)?;
                    for (k, sample) in ring.chunks_exact_mut(dof).enumerate() {
                        for v in sample {
                            *v *= inv_mass[k];
                        }
                    }
                    tf.forward(mult, *nr, ring, coeffs)?;
                    a.copy_from_slice(&coeffs[..a.len()]);
                }
                PointMass::Ocean3D {
                    nr,
                    mass,
                    ocean,
                    normal,
                } => {
                    let [coeffs] = self.coeff.carve([(nr / 2 + 1) * dof])?;
                    let [ring] = self.phys.carve([nr * dof])?;
                    load(coeffs, f);
                    tf.inverse(mult, *nr, coeffs, ring)?;
                    for (k, sample) in ring.chunks_exact_mut(3).enumerate() {
                        let out =
                            ocean_divide([sample[0], sample[1], sample[2]], mass[k], ocean[k], *normal);
                        sample.copy_from_slice(&out);
                    }
                    tf.forward(mult, *nr, ring, coeffs)?;
                    a.copy_from_slice(&coeffs[..a.len()]);
                }
            }
        }
        Ok(())
    }
}

/// Copy the carried orders and zero the rest of the transform range.
fn load(coeffs: &mut [Complex64], f: &[Complex64]) {
    coeffs[..f.len()].copy_from_slice(f);
    coeffs[f.len()..].fill(ZERO);
}
