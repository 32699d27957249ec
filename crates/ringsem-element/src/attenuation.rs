//! Memory variables of standard-linear-solid attenuation.
//!
//! Each relaxation mechanism `l` carries a memory stress `Rₗ` per order,
//! point and strain component, advanced once per step with
//! `Rₗ ← αₗ Rₗ + cₗ (β1ₗ εⁿ⁺¹ + β0ₗ εⁿ)` on the deviatoric strain and
//! subtracted from the elastic stress.

use num_complex::Complex64;
use ringsem_core::NPOINTS_ELEM;

use crate::material::deviator;

const N: usize = NPOINTS_ELEM;
const WIDTH: usize = 6 * N;

/// Per-step recursion coefficients of one mechanism.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlsCoefficients {
    /// `exp(-dt / τ)`.
    pub alpha: f64,
    /// Weight of the previous strain.
    pub beta0: f64,
    /// Weight of the current strain.
    pub beta1: f64,
}

/// Attenuation state of one solid element.
#[derive(Clone, Debug, PartialEq)]
pub struct AttenuationMemory {
    sls: Vec<SlsCoefficients>,
    /// `2 yₗ μ_R W` at `[l * NPOINTS_ELEM + p]`.
    weights: Vec<f64>,
    orders: usize,
    /// Memory stress at `[(l * orders + m) * 6N + c * N + p]`.
    memory: Vec<Complex64>,
    /// Deviatoric strain of the previous step at `[m * 6N + c * N + p]`.
    previous: Vec<Complex64>,
}

impl AttenuationMemory {
    /// Zeroed memory for `orders` azimuthal orders.
    ///
    /// `weights` must hold one value per mechanism and point.
    pub fn new(sls: Vec<SlsCoefficients>, weights: Vec<f64>, orders: usize) -> Self {
        debug_assert_eq!(weights.len(), sls.len() * N);
        let zero = Complex64::new(0.0, 0.0);
        Self {
            memory: vec![zero; sls.len() * orders * WIDTH],
            previous: vec![zero; orders * WIDTH],
            sls,
            weights,
            orders,
        }
    }

    /// Number of mechanisms.
    pub fn n_sls(&self) -> usize {
        self.sls.len()
    }

    /// Advance the memory of order `m` with the current strain and
    /// subtract it from the weighted stress. Both slices hold `6N`
    /// values in component-major order.
    pub fn apply(&mut self, m: usize, strain: &[Complex64], stress: &mut [Complex64]) {
        let prev = &mut self.previous[m * WIDTH..(m + 1) * WIDTH];
        for p in 0..N {
            let e = deviator(std::array::from_fn(|c| strain[c * N + p]));
            for (l, coef) in self.sls.iter().enumerate() {
                let w = self.weights[l * N + p];
                let base = (l * self.orders + m) * WIDTH;
                for (c, &ec) in e.iter().enumerate() {
                    let i = c * N + p;
                    let r = &mut self.memory[base + i];
                    *r = *r * coef.alpha + (ec * coef.beta1 + prev[i] * coef.beta0) * w;
                    stress[i] -= *r;
                }
            }
            for (c, &ec) in e.iter().enumerate() {
                prev[c * N + p] = ec;
            }
        }
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        (self.memory.len() + self.previous.len()) * std::mem::size_of::<Complex64>()
            + self.weights.len() * 8
    }
}
