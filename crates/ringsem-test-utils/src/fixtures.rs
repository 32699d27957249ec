//! Small planets, sources and 3-D providers.
//!
//! The planets are a few elements deep and a handful wide so a full
//! preloop takes milliseconds. Radii are in metres.

use ringsem_core::{
    Geometric3D, Material, OceanLoad3D, Perturbation, SolverConfig, StfConfig, Volumetric3D,
};
use ringsem_mesh::{Layer, LayeredModel, Location};
use ringsem_source::{Mechanism, Source};

pub const INNER_RADIUS: f64 = 1000e3;
pub const OUTER_RADIUS: f64 = 2000e3;

pub fn rock() -> Material {
    Material {
        vp: 6000.0,
        vs: 3500.0,
        rho: 2700.0,
        q_kappa: 57823.0,
        q_mu: 600.0,
    }
}

pub fn water() -> Material {
    Material {
        vp: 1450.0,
        vs: 0.0,
        rho: 1020.0,
        q_kappa: 57823.0,
        q_mu: 0.0,
    }
}

/// Homogeneous rock shell, 2 rows by `columns` columns.
pub fn small_planet(columns: usize) -> LayeredModel {
    LayeredModel::homogeneous(INNER_RADIUS, OUTER_RADIUS, 2, columns, rock())
}

/// Rock, a water layer, then rock again: two solid–fluid interfaces.
pub fn ocean_world(columns: usize) -> LayeredModel {
    LayeredModel::new(
        "ocean world",
        vec![
            Layer {
                r_bottom: INNER_RADIUS,
                r_top: 1400e3,
                rows: 1,
                material: rock(),
            },
            Layer {
                r_bottom: 1400e3,
                r_top: 1600e3,
                rows: 1,
                material: water(),
            },
            Layer {
                r_bottom: 1600e3,
                r_top: OUTER_RADIUS,
                rows: 2,
                material: rock(),
            },
        ],
        columns,
    )
}

/// A shallow source away from the poles.
pub fn shallow(theta: f64) -> Location {
    Location {
        depth: 20e3,
        theta,
        phi: 0.0,
    }
}

/// An isotropic moment tensor of `m0` newton metres.
pub fn explosion(location: Location, m0: f64) -> Source {
    Source::new(
        location,
        Mechanism::MomentTensor {
            rr: m0,
            tt: m0,
            pp: m0,
            rt: 0.0,
            rp: 0.0,
            tp: 0.0,
        },
    )
    .expect("valid explosion")
}

/// A downward point force of `f` newtons.
pub fn vertical_force(location: Location, f: f64) -> Source {
    Source::new(
        location,
        Mechanism::Force {
            r: -f,
            theta: 0.0,
            phi: 0.0,
        },
    )
    .expect("valid force")
}

/// Default configuration with a Gaussian pulse of `half_duration`
/// seconds recorded for `record_length` seconds.
pub fn quick_config(half_duration: f64, record_length: f64) -> SolverConfig {
    SolverConfig {
        stf: StfConfig {
            half_duration,
            record_length,
            ..StfConfig::default()
        },
        loop_info_interval: 1_000_000,
        ..SolverConfig::default()
    }
}

/// Density and shear-velocity anomaly varying as `cos φ`.
pub struct CosineBlob {
    pub amplitude: f64,
}

impl Volumetric3D for CosineBlob {
    fn perturbation(&self, _r: f64, theta: f64, phi: f64) -> Perturbation {
        let a = self.amplitude * theta.sin() * phi.cos();
        Perturbation {
            dvp: 0.0,
            dvs: a,
            drho: 0.5 * a,
        }
    }

    fn name(&self) -> &str {
        "cosine blob"
    }
}

/// Topography growing linearly from zero at the inner radius.
pub struct TiltedSurface {
    pub amplitude: f64,
}

impl Geometric3D for TiltedSurface {
    fn radial_offset(&self, r: f64, theta: f64) -> f64 {
        let f = ((r - INNER_RADIUS) / (OUTER_RADIUS - INNER_RADIUS)).clamp(0.0, 1.0);
        self.amplitude * f * theta.cos()
    }
}

/// A uniform ocean of `depth` metres.
pub struct UniformOcean {
    pub depth: f64,
}

impl OceanLoad3D for UniformOcean {
    fn water_column(&self, _theta: f64, _phi: f64) -> f64 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringsem_core::ExodusModel;

    #[test]
    fn planets_span_the_shell() {
        let p = small_planet(6);
        assert_eq!(p.radial_nodes(), &[INNER_RADIUS, 1500e3, OUTER_RADIUS]);
        let o = ocean_world(6);
        assert_eq!(o.radial_nodes().len(), 5);
        assert!(o.material(1, 1500e3).is_fluid());
        assert!(!o.material(2, 1700e3).is_fluid());
    }

    #[test]
    fn tilted_surface_is_fixed_at_the_bottom() {
        let t = TiltedSurface { amplitude: 5e3 };
        assert_eq!(t.radial_offset(INNER_RADIUS, 0.3), 0.0);
        assert!((t.radial_offset(OUTER_RADIUS, 0.0) - 5e3).abs() < 1e-9);
    }
}
