//! Gradient of azimuthal Fourier coefficients in cylindrical coordinates.
//!
//! A field `f(s, φ, z) = Σ fₘ(s, z) e^{imφ}` has, for each order `m`,
//! the meridional derivatives `∂s fₘ`, `∂z fₘ` (from the GLL derivative
//! matrix and the inverse element Jacobian) and the azimuthal derivative
//! `(im / s) fₘ`. Element-local arrays are component-major: component
//! `c` of point `p` lives at `c * NPOINTS_ELEM + p`, with points
//! numbered `p = i * NPOINTS_EDGE + j` (`i` along ξ, `j` along η).
//!
//! Vector gradients use the order
//! `[ss, sφ, sz, φs, φφ, φz, zs, zφ, zz]` where `ab = ∂_a u_b`
//! including the curvature terms of the φ row.

use num_complex::Complex64;
use ringsem_core::{NPOINTS_EDGE, NPOINTS_ELEM};

use crate::gll::DerivativeMatrix;

const N: usize = NPOINTS_ELEM;
const E: usize = NPOINTS_EDGE;
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Gradient tables of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientOperator {
    deriv: DerivativeMatrix,
    dxi_ds: [f64; N],
    deta_ds: [f64; N],
    dxi_dz: [f64; N],
    deta_dz: [f64; N],
    inv_s: [f64; N],
    jacobian: [f64; N],
}

impl GradientOperator {
    /// Tables for an element whose GLL points sit at `coords[p] = [s, z]`.
    pub fn new(deriv: &DerivativeMatrix, coords: &[[f64; 2]; N]) -> Self {
        let mut op = Self {
            deriv: *deriv,
            dxi_ds: [0.0; N],
            deta_ds: [0.0; N],
            dxi_dz: [0.0; N],
            deta_dz: [0.0; N],
            inv_s: [0.0; N],
            jacobian: [0.0; N],
        };
        for i in 0..E {
            for j in 0..E {
                let p = i * E + j;
                let (mut ds_dxi, mut dz_dxi, mut ds_deta, mut dz_deta) = (0.0, 0.0, 0.0, 0.0);
                for a in 0..E {
                    ds_dxi += deriv[i][a] * coords[a * E + j][0];
                    dz_dxi += deriv[i][a] * coords[a * E + j][1];
                    ds_deta += deriv[j][a] * coords[i * E + a][0];
                    dz_deta += deriv[j][a] * coords[i * E + a][1];
                }
                let det = ds_dxi * dz_deta - ds_deta * dz_dxi;
                op.jacobian[p] = det;
                op.dxi_ds[p] = dz_deta / det;
                op.dxi_dz[p] = -ds_deta / det;
                op.deta_ds[p] = -dz_dxi / det;
                op.deta_dz[p] = ds_dxi / det;
                op.inv_s[p] = 1.0 / coords[p][0];
            }
        }
        op
    }

    /// Signed Jacobian determinant `∂(s, z) / ∂(ξ, η)` at every point.
    pub fn jacobian(&self) -> &[f64; N] {
        &self.jacobian
    }

    /// Whether every table entry is finite.
    pub fn is_finite(&self) -> bool {
        [
            &self.dxi_ds,
            &self.deta_ds,
            &self.dxi_dz,
            &self.deta_dz,
            &self.inv_s,
            &self.jacobian,
        ]
        .iter()
        .all(|t| t.iter().all(|v| v.is_finite()))
    }

    /// `∂s f` and `∂z f` of a 25-point scalar.
    fn meridional(&self, f: &[Complex64], ds: &mut [Complex64; N], dz: &mut [Complex64; N]) {
        for i in 0..E {
            for j in 0..E {
                let p = i * E + j;
                let (mut dxi, mut deta) = (ZERO, ZERO);
                for a in 0..E {
                    dxi += f[a * E + j] * self.deriv[i][a];
                    deta += f[i * E + a] * self.deriv[j][a];
                }
                ds[p] = dxi * self.dxi_ds[p] + deta * self.deta_ds[p];
                dz[p] = dxi * self.dxi_dz[p] + deta * self.deta_dz[p];
            }
        }
    }

    /// Add the transpose of [`meridional`](Self::meridional) applied to
    /// `(gs, gz)` into `out`.
    fn meridional_adjoint(&self, gs: &[Complex64], gz: &[Complex64], out: &mut [Complex64]) {
        let mut txi = [ZERO; N];
        let mut teta = [ZERO; N];
        for p in 0..N {
            txi[p] = gs[p] * self.dxi_ds[p] + gz[p] * self.dxi_dz[p];
            teta[p] = gs[p] * self.deta_ds[p] + gz[p] * self.deta_dz[p];
        }
        for i in 0..E {
            for j in 0..E {
                let p = i * E + j;
                for a in 0..E {
                    out[a * E + j] += txi[p] * self.deriv[i][a];
                    out[i * E + a] += teta[p] * self.deriv[j][a];
                }
            }
        }
    }

    /// Gradient `[∂s, (im/s), ∂z] f` of a scalar of order `m`.
    ///
    /// `f` holds 25 values, `out` 75.
    pub fn scalar(&self, m: usize, f: &[Complex64], out: &mut [Complex64]) {
        let mut ds = [ZERO; N];
        let mut dz = [ZERO; N];
        self.meridional(f, &mut ds, &mut dz);
        let im = Complex64::new(0.0, m as f64);
        for p in 0..N {
            out[p] = ds[p];
            out[N + p] = im * f[p] * self.inv_s[p];
            out[2 * N + p] = dz[p];
        }
    }

    /// Conjugate transpose of [`scalar`](Self::scalar): `out` (25)
    /// is overwritten with `Gₘᴴ t` for `t` of 75 values.
    pub fn scalar_adjoint(&self, m: usize, t: &[Complex64], out: &mut [Complex64]) {
        let neg_im = Complex64::new(0.0, -(m as f64));
        for p in 0..N {
            out[p] = neg_im * t[N + p] * self.inv_s[p];
        }
        self.meridional_adjoint(&t[..N], &t[2 * N..3 * N], &mut out[..N]);
    }

    /// Gradient of a vector `[us, uφ, uz]` of order `m`.
    ///
    /// `u` holds 75 values, `out` 225.
    pub fn vector(&self, m: usize, u: &[Complex64], out: &mut [Complex64]) {
        let im = Complex64::new(0.0, m as f64);
        let (us, rest) = u.split_at(N);
        let (up, uz) = rest.split_at(N);
        let mut ds = [ZERO; N];
        let mut dz = [ZERO; N];
        for (c, comp) in [us, up, uz].into_iter().enumerate() {
            self.meridional(comp, &mut ds, &mut dz);
            out[c * N..(c + 1) * N].copy_from_slice(&ds);
            out[(6 + c) * N..(7 + c) * N].copy_from_slice(&dz);
        }
        for p in 0..N {
            let r = self.inv_s[p];
            out[3 * N + p] = (im * us[p] - up[p]) * r;
            out[4 * N + p] = (im * up[p] + us[p]) * r;
            out[5 * N + p] = im * uz[p] * r;
        }
    }

    /// Conjugate transpose of [`vector`](Self::vector): `out` (75) is
    /// overwritten with `Gₘᴴ t` for `t` of 225 values.
    pub fn vector_adjoint(&self, m: usize, t: &[Complex64], out: &mut [Complex64]) {
        let neg_im = Complex64::new(0.0, -(m as f64));
        for p in 0..N {
            let r = self.inv_s[p];
            let (t3, t4, t5) = (t[3 * N + p], t[4 * N + p], t[5 * N + p]);
            out[p] = (neg_im * t3 + t4) * r;
            out[N + p] = (neg_im * t4 - t3) * r;
            out[2 * N + p] = neg_im * t5 * r;
        }
        for c in 0..3 {
            let (gs, gz) = (&t[c * N..(c + 1) * N], &t[(6 + c) * N..(7 + c) * N]);
            self.meridional_adjoint(gs, gz, &mut out[c * N..(c + 1) * N]);
        }
    }
}
