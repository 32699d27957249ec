//! Model-provider traits consumed by the mesher.
//!
//! Every provider is a pure function of the spatial coordinate. The
//! mesher holds them as `Arc<dyn ...>` so one set of providers can be
//! shared by all partition workers.

/// Isotropic material at one location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// P-wave speed, m/s.
    pub vp: f64,
    /// S-wave speed, m/s. Zero marks a fluid.
    pub vs: f64,
    /// Density, kg/m³.
    pub rho: f64,
    /// Bulk quality factor.
    pub q_kappa: f64,
    /// Shear quality factor.
    pub q_mu: f64,
}

impl Material {
    /// Whether the material carries no shear strength.
    pub fn is_fluid(&self) -> bool {
        self.vs == 0.0
    }

    /// Shear modulus μ = ρ vs².
    pub fn mu(&self) -> f64 {
        self.rho * self.vs * self.vs
    }

    /// First Lamé parameter λ = ρ (vp² − 2 vs²).
    pub fn lambda(&self) -> f64 {
        self.rho * (self.vp * self.vp - 2.0 * self.vs * self.vs)
    }

    /// Bulk modulus κ = ρ (vp² − 4/3 vs²).
    pub fn kappa(&self) -> f64 {
        self.rho * (self.vp * self.vp - 4.0 / 3.0 * self.vs * self.vs)
    }

    /// Whether every property is finite and physically admissible.
    pub fn is_valid(&self) -> bool {
        self.vp.is_finite()
            && self.vs.is_finite()
            && self.rho.is_finite()
            && self.vp > 0.0
            && self.vs >= 0.0
            && self.rho > 0.0
            && self.vp * self.vp > 4.0 / 3.0 * self.vs * self.vs
    }
}

/// Relative 3-D perturbation of a material.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Perturbation {
    /// Relative change of vp.
    pub dvp: f64,
    /// Relative change of vs.
    pub dvs: f64,
    /// Relative change of density.
    pub drho: f64,
}

impl Perturbation {
    /// Apply the perturbation to a reference material.
    pub fn apply(&self, m: &Material) -> Material {
        Material {
            vp: m.vp * (1.0 + self.dvp),
            vs: m.vs * (1.0 + self.dvs),
            rho: m.rho * (1.0 + self.drho),
            ..*m
        }
    }

    /// Whether the perturbation changes nothing.
    pub fn is_zero(&self) -> bool {
        self.dvp == 0.0 && self.dvs == 0.0 && self.drho == 0.0
    }
}

/// Radially layered background model and its meridional mesh outline.
///
/// Stands in for an Exodus mesh file: it provides the radial element
/// boundaries, the number of elements across the meshed colatitude
/// band, and the material of each radial element row.
pub trait ExodusModel: Send + Sync {
    /// Radial element boundaries in metres, strictly increasing.
    fn radial_nodes(&self) -> &[f64];

    /// Number of elements along colatitude.
    fn theta_elements(&self) -> usize;

    /// Material at radius `r` inside radial element row `row`.
    ///
    /// The row disambiguates discontinuities sitting on a boundary.
    fn material(&self, row: usize, r: f64) -> Material;

    /// Outer radius of the model.
    fn outer_radius(&self) -> f64 {
        self.radial_nodes().last().copied().unwrap_or(0.0)
    }

    /// Human-readable model name.
    fn name(&self) -> &str;
}

/// Azimuthal ring size as a function of meridional position.
pub trait NrField: Send + Sync {
    /// Number of azimuthal samples at `(r, theta)`.
    fn nr(&self, r: f64, theta: f64) -> usize;
}

/// 3-D volumetric heterogeneity.
pub trait Volumetric3D: Send + Sync {
    /// Perturbation at `(r, theta, phi)`.
    fn perturbation(&self, r: f64, theta: f64, phi: f64) -> Perturbation;

    /// Human-readable model name.
    fn name(&self) -> &str;
}

/// Topography of internal and external boundaries.
///
/// The offset is axisymmetric so element geometry stays a property of
/// the meridional plane.
pub trait Geometric3D: Send + Sync {
    /// Radial displacement in metres of the reference point `(r, theta)`.
    fn radial_offset(&self, r: f64, theta: f64) -> f64;
}

/// Load of an ocean layer that is not meshed explicitly.
pub trait OceanLoad3D: Send + Sync {
    /// Water column height in metres above the surface point `(theta, phi)`.
    fn water_column(&self, theta: f64, phi: f64) -> f64;

    /// Density of sea water in kg/m³.
    fn water_density(&self) -> f64 {
        1025.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granite() -> Material {
        Material {
            vp: 6000.0,
            vs: 3500.0,
            rho: 2700.0,
            q_kappa: 57823.0,
            q_mu: 600.0,
        }
    }

    #[test]
    fn lame_parameters() {
        let m = granite();
        assert!((m.mu() - 2700.0 * 3500.0 * 3500.0).abs() < 1e-3);
        assert!((m.lambda() + 2.0 * m.mu() - m.rho * m.vp * m.vp).abs() < 1e-3);
        assert!(m.is_valid());
        assert!(!m.is_fluid());
    }

    #[test]
    fn fluid_detection() {
        let water = Material {
            vp: 1450.0,
            vs: 0.0,
            rho: 1020.0,
            q_kappa: 57823.0,
            q_mu: 0.0,
        };
        assert!(water.is_fluid());
        assert!(water.is_valid());
        assert_eq!(water.mu(), 0.0);
    }

    #[test]
    fn perturbation_scales_properties() {
        let p = Perturbation {
            dvp: 0.1,
            dvs: -0.1,
            drho: 0.0,
        };
        let m = p.apply(&granite());
        assert!((m.vp - 6600.0).abs() < 1e-9);
        assert!((m.vs - 3150.0).abs() < 1e-9);
        assert_eq!(m.rho, 2700.0);
        assert!(Perturbation::default().is_zero());
    }
}
