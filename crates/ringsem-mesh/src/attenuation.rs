//! Standard-linear-solid fit of a constant quality factor.
//!
//! A set of `n` standard linear solids with relaxation times `τₗ` and
//! strengths `yₗ` has, to first order in `y`, the inverse quality
//! factor
//!
//! ```text
//! Q⁻¹(ω) = Σ yₗ ωτₗ / (1 + ω²τₗ²)
//! ```
//!
//! The relaxation times are spread log-uniformly across the band and
//! the strengths are the least-squares solution of `Q⁻¹(ω) = 1` at
//! frequencies sampling the band; a region with quality factor `Q` uses
//! `yₗ / Q`.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use ringsem_core::{AttenuationConfig, ConfigError};
use ringsem_element::SlsCoefficients;

/// Fit frequencies per mechanism.
const SAMPLES_PER_SLS: usize = 10;

/// Relaxation fit parameters of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct AttenuationBuilder {
    n_sls: usize,
    f_min: f64,
    f_max: f64,
}

impl AttenuationBuilder {
    /// Builder for the configured band.
    pub fn new(config: &AttenuationConfig) -> Self {
        Self {
            n_sls: config.n_sls,
            f_min: config.f_min,
            f_max: config.f_max,
        }
    }

    /// Number of mechanisms.
    pub fn n_sls(&self) -> usize {
        self.n_sls
    }

    /// Fit the mechanisms and derive the recursion coefficients at `dt`.
    pub fn build(&self, dt: f64) -> Result<AttenuationTable, ConfigError> {
        if self.n_sls == 0 {
            return Err(ConfigError::InvalidParameter {
                key: "ATTENUATION_NSLS".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(self.f_min > 0.0 && self.f_min < self.f_max && self.f_max.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                key: "ATTENUATION_F_MAX".into(),
                reason: format!("band [{}, {}] is empty", self.f_min, self.f_max),
            });
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidParameter {
                key: "TIME_DELTA_T".into(),
                reason: format!("must be finite and positive, got {dt}"),
            });
        }

        let tau: Vec<f64> = log_spaced(self.f_min, self.f_max, self.n_sls)
            .into_iter()
            .map(|f| 1.0 / (2.0 * PI * f))
            .rev()
            .collect();
        let shortest_tau = tau.iter().copied().fold(f64::INFINITY, f64::min);
        if shortest_tau < 2.0 * dt {
            return Err(ConfigError::AttenuationBand { shortest_tau, dt });
        }

        let omega: Vec<f64> =
            log_spaced(self.f_min, self.f_max, SAMPLES_PER_SLS * self.n_sls)
                .into_iter()
                .map(|f| 2.0 * PI * f)
                .collect();
        let a = DMatrix::from_fn(omega.len(), tau.len(), |k, l| debye(omega[k], tau[l]));
        let b = DVector::from_element(omega.len(), 1.0);
        let y = a
            .svd(true, true)
            .solve(&b, 1e-14)
            .map_err(|reason| ConfigError::InvalidParameter {
                key: "ATTENUATION_NSLS".into(),
                reason: format!("constant-Q fit failed: {reason}"),
            })?;

        let sls = tau.iter().map(|&t| recursion(dt, t)).collect();
        Ok(AttenuationTable {
            tau,
            y: y.iter().copied().collect(),
            sls,
        })
    }
}

/// `n` frequencies spread log-uniformly over `[lo, hi]`; one mechanism
/// sits at the geometric centre.
fn log_spaced(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![(lo * hi).sqrt()];
    }
    let (a, b) = (lo.ln(), hi.ln());
    (0..n)
        .map(|i| (a + (b - a) * i as f64 / (n - 1) as f64).exp())
        .collect()
}

/// Loss of one mechanism at unit strength.
fn debye(omega: f64, tau: f64) -> f64 {
    let x = omega * tau;
    x / (1.0 + x * x)
}

fn recursion(dt: f64, tau: f64) -> SlsCoefficients {
    let alpha = (-dt / tau).exp();
    let r = (1.0 - alpha) * tau / dt;
    SlsCoefficients {
        alpha,
        beta0: r - alpha,
        beta1: 1.0 - r,
    }
}

/// Fitted mechanisms at one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct AttenuationTable {
    tau: Vec<f64>,
    y: Vec<f64>,
    sls: Vec<SlsCoefficients>,
}

impl AttenuationTable {
    /// Relaxation times, longest first.
    pub fn tau(&self) -> &[f64] {
        &self.tau
    }

    /// Strengths for `Q = 1`.
    pub fn unit_strengths(&self) -> &[f64] {
        &self.y
    }

    /// Per-step recursion coefficients.
    pub fn coefficients(&self) -> &[SlsCoefficients] {
        &self.sls
    }

    /// Strength of mechanism `l` for quality factor `q`.
    pub fn strength(&self, l: usize, q: f64) -> f64 {
        self.y[l] / q
    }

    /// Unrelaxed over relaxed modulus, `1 + Σ yₗ / q`.
    pub fn modulus_ratio(&self, q: f64) -> f64 {
        1.0 + self.y.iter().map(|y| y / q).sum::<f64>()
    }

    /// Quality factor the mechanisms produce at frequency `f` for a
    /// target `q`.
    pub fn quality(&self, q: f64, f: f64) -> f64 {
        let omega = 2.0 * PI * f;
        let loss: f64 = self
            .tau
            .iter()
            .zip(&self.y)
            .map(|(&t, &y)| y / q * debye(omega, t))
            .sum();
        1.0 / loss
    }
}
