//! Quadrature-weighted material tables and the isotropic stress law.
//!
//! Moduli are stored premultiplied by the integration weight `W` of
//! their point, so the stress produced by the kernels is already the
//! weighted stress the transpose gradient expects.

use std::ops::{Add, Mul, Sub};

use ringsem_core::NPOINTS_ELEM;

const N: usize = NPOINTS_ELEM;

/// Elastic moduli of a solid element.
#[derive(Clone, Debug, PartialEq)]
pub enum SolidMaterial {
    /// Moduli constant along the ring; stress is formed per order.
    Axisymmetric {
        /// `λ W` per point.
        lambda: [f64; N],
        /// `μ W` per point (unrelaxed when attenuating).
        mu: [f64; N],
    },
    /// Moduli varying along the ring; stress is formed per ring sample.
    Ring {
        /// Ring size the tables are sampled on.
        nr: usize,
        /// `λ W` at `[k * NPOINTS_ELEM + p]`.
        lambda: Vec<f64>,
        /// `μ W` at `[k * NPOINTS_ELEM + p]`.
        mu: Vec<f64>,
    },
}

impl SolidMaterial {
    /// Whether stress must be formed on the physical ring.
    pub fn is_ring(&self) -> bool {
        matches!(self, Self::Ring { .. })
    }

    /// Whether every modulus is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Axisymmetric { lambda, mu } => lambda.iter().chain(mu).all(|v| v.is_finite()),
            Self::Ring { lambda, mu, .. } => lambda.iter().chain(mu).all(|v| v.is_finite()),
        }
    }

    /// Heap memory held by the tables in bytes.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::Axisymmetric { .. } => 0,
            Self::Ring { lambda, mu, .. } => (lambda.len() + mu.len()) * 8,
        }
    }
}

/// Inverse density of a fluid element.
#[derive(Clone, Debug, PartialEq)]
pub enum FluidMaterial {
    /// `W / ρ` per point.
    Axisymmetric {
        /// `W / ρ` per point.
        inv_rho: [f64; N],
    },
    /// `W / ρ` per ring sample.
    Ring {
        /// Ring size the table is sampled on.
        nr: usize,
        /// `W / ρ` at `[k * NPOINTS_ELEM + p]`.
        inv_rho: Vec<f64>,
    },
}

impl FluidMaterial {
    /// Whether the product must be formed on the physical ring.
    pub fn is_ring(&self) -> bool {
        matches!(self, Self::Ring { .. })
    }

    /// Whether every entry is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Axisymmetric { inv_rho } => inv_rho.iter().all(|v| v.is_finite()),
            Self::Ring { inv_rho, .. } => inv_rho.iter().all(|v| v.is_finite()),
        }
    }

    /// Heap memory held by the table in bytes.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::Axisymmetric { .. } => 0,
            Self::Ring { inv_rho, .. } => inv_rho.len() * 8,
        }
    }
}

// ── Tensor helpers ─────────────────────────────────────────────────

/// Symmetric strain `[ss, φφ, zz, φz, sz, sφ]` of point `p` from a
/// component-major 9-component gradient.
pub fn strain<T>(g: &[T], p: usize) -> [T; 6]
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    let at = |c: usize| g[c * N + p];
    [
        at(0),
        at(4),
        at(8),
        (at(5) + at(7)) * 0.5,
        (at(2) + at(6)) * 0.5,
        (at(1) + at(3)) * 0.5,
    ]
}

/// Isotropic stress `λ tr(ε) I + 2 μ ε` in the strain's component order.
pub fn isotropic_stress<T>(e: [T; 6], lambda: f64, mu: f64) -> [T; 6]
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    let tr = (e[0] + e[1] + e[2]) * lambda;
    let two_mu = 2.0 * mu;
    [
        tr + e[0] * two_mu,
        tr + e[1] * two_mu,
        tr + e[2] * two_mu,
        e[3] * two_mu,
        e[4] * two_mu,
        e[5] * two_mu,
    ]
}

/// Deviatoric part of a symmetric tensor in the strain's component order.
pub fn deviator<T>(e: [T; 6]) -> [T; 6]
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
{
    let mean = (e[0] + e[1] + e[2]) * (1.0 / 3.0);
    [e[0] - mean, e[1] - mean, e[2] - mean, e[3], e[4], e[5]]
}

/// Full 9-component form of a symmetric tensor, in gradient order.
pub fn expand<T: Copy>(s: [T; 6]) -> [T; 9] {
    [s[0], s[5], s[4], s[5], s[1], s[3], s[4], s[3], s[2]]
}
