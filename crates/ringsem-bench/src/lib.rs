//! Benchmark profiles for the ringsem solver.
//!
//! Provides pre-built [`Preloop`] profiles for benchmarking:
//!
//! - [`reference_profile`]: a layered elastic planet with 1-D materials
//! - [`heterogeneous_profile`]: the same planet with a 3-D plume, an
//!   ocean load and attenuation, so every element carries ring materials
//! - [`prepared`]: run the preloop of a profile on a single worker

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use ringsem::prelude::*;

/// Upper mantle rock.
pub const MANTLE: Material = Material {
    vp: 8000.0,
    vs: 4500.0,
    rho: 3300.0,
    q_kappa: 57823.0,
    q_mu: 300.0,
};

/// Sea water.
pub const SEA: Material = Material {
    vp: 1450.0,
    vs: 0.0,
    rho: 1020.0,
    q_kappa: 57823.0,
    q_mu: 0.0,
};

/// A shell with an internal fluid layer, `columns` elements wide.
pub fn layered_planet(columns: usize) -> LayeredModel {
    LayeredModel::new(
        "bench planet",
        vec![
            Layer {
                r_bottom: 3000e3,
                r_top: 4500e3,
                rows: 3,
                material: MANTLE,
            },
            Layer {
                r_bottom: 4500e3,
                r_top: 4800e3,
                rows: 1,
                material: SEA,
            },
            Layer {
                r_bottom: 4800e3,
                r_top: 6000e3,
                rows: 3,
                material: MANTLE,
            },
        ],
        columns,
    )
}

/// A hot, slow plume centred on `theta0`, varying as `cos φ` in azimuth.
#[derive(Clone, Copy, Debug)]
pub struct Plume {
    /// Colatitude of the plume axis in radians.
    pub theta0: f64,
    /// Peak relative slowdown.
    pub strength: f64,
}

impl Volumetric3D for Plume {
    fn perturbation(&self, _r: f64, theta: f64, phi: f64) -> Perturbation {
        let d = (theta - self.theta0) / 0.2;
        let a = -self.strength * (-d * d).exp() * (0.5 + 0.5 * phi.cos());
        Perturbation {
            dvp: a,
            dvs: 1.5 * a,
            drho: 0.3 * a,
        }
    }

    fn name(&self) -> &str {
        "plume"
    }
}

/// Uniform ocean used by the heterogeneous profile.
#[derive(Clone, Copy, Debug)]
pub struct FlatOcean;

impl OceanLoad3D for FlatOcean {
    fn water_column(&self, _theta: f64, _phi: f64) -> f64 {
        4e3
    }
}

fn explosion() -> Source {
    let m0 = 1e18;
    let location = Location {
        depth: 30e3,
        theta: 1.0,
        phi: 0.0,
    };
    let mechanism = Mechanism::MomentTensor {
        rr: m0,
        tt: m0,
        pp: m0,
        rt: 0.0,
        rp: 0.0,
        tp: 0.0,
    };
    match Source::new(location, mechanism) {
        Ok(source) => source,
        Err(e) => panic!("bench source rejected: {e}"),
    }
}

/// Long enough that a benchmark never runs out of steps.
fn config() -> SolverConfig {
    SolverConfig {
        stf: StfConfig {
            half_duration: 30.0,
            record_length: 1e5,
            ..StfConfig::default()
        },
        loop_info_interval: u64::MAX,
        stability_interval: 100,
        ..SolverConfig::default()
    }
}

/// Elastic layered planet with `columns` element columns and rings of
/// `nr` samples.
pub fn reference_profile(columns: usize, nr: usize) -> Preloop {
    let built = Preloop::new(
        config(),
        Arc::new(layered_planet(columns)),
        Arc::new(UniformNrField::new(nr)),
        explosion(),
    );
    match built {
        Ok(preloop) => preloop,
        Err(e) => panic!("bench profile rejected: {e}"),
    }
}

/// [`reference_profile`] with a plume, an ocean load and attenuation.
pub fn heterogeneous_profile(columns: usize, nr: usize) -> Preloop {
    let mut config = config();
    config.attenuation = Some(AttenuationConfig {
        n_sls: 3,
        f_min: 0.001,
        f_max: 0.05,
    });
    let built = Preloop::new(
        config,
        Arc::new(layered_planet(columns)),
        Arc::new(UniformNrField::new(nr)),
        explosion(),
    );
    match built {
        Ok(preloop) => preloop
            .with_volumetric_3d(Arc::new(Plume {
                theta0: 1.2,
                strength: 0.05,
            }))
            .with_ocean_load_3d(Arc::new(FlatOcean)),
        Err(e) => panic!("bench profile rejected: {e}"),
    }
}

/// Run the preloop of `preloop` on a single worker.
pub fn prepared(preloop: &Preloop) -> Prepared {
    match preloop.prepare(Communicator::solo()) {
        Ok(p) => p,
        Err(e) => panic!("bench preloop failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_prepare() {
        let p = prepared(&reference_profile(4, 5));
        assert!(p.dt > 0.0);
        assert!(p.newmark.nsteps() > 100);
        let h = prepared(&heterogeneous_profile(4, 5));
        assert_eq!(h.dt, h.stable_dt);
        assert_eq!(h.mesh_report, None);
    }

    #[test]
    fn plume_is_a_slowdown() {
        let plume = Plume {
            theta0: 1.0,
            strength: 0.1,
        };
        let p = plume.perturbation(5000e3, 1.0, 0.0);
        assert!((p.dvp + 0.1).abs() < 1e-12);
        assert!(p.dvs < p.dvp);
        assert_eq!(plume.perturbation(5000e3, 1.0, std::f64::consts::PI).dvp, 0.0);
    }
}
