//! Integration test: the full preloop pipeline and a short run.
//!
//! Covers the release hand-over from mesh to domain, the source time
//! function contract, configuration validation before any mesh work,
//! and end-to-end runs with receivers and every 3-D provider attached.

use std::sync::Arc;

use indexmap::IndexMap;
use ringsem::prelude::*;
use ringsem::mesh::MeshPhase;
use ringsem_test_utils::fixtures::{
    explosion, ocean_world, quick_config, shallow, small_planet, vertical_force, CosineBlob,
    TiltedSurface, UniformOcean,
};

fn preloop(config: SolverConfig, columns: usize, nr: usize) -> Preloop {
    Preloop::new(
        config,
        Arc::new(small_planet(columns)),
        Arc::new(UniformNrField::new(nr)),
        vertical_force(shallow(1.1), 1e15),
    )
    .unwrap()
}

#[test]
fn release_leaves_mesh_empty() {
    let p = preloop(quick_config(20.0, 20.0), 6, 3);
    let prepared = p.prepare(Communicator::solo()).unwrap();
    assert_eq!(prepared.mesh.phase(), MeshPhase::Released);
    assert_eq!(prepared.mesh.element_count(), 0);
    let domain = prepared.newmark.domain().unwrap();
    assert_eq!(domain.element_count(), 12);
    assert_eq!(domain.sources().len(), 1);
    assert_eq!(domain.nsteps(), prepared.stf.len());
    assert!(prepared.dt > 0.0 && prepared.dt <= prepared.stable_dt * (1.0 + 1e-12));
    assert!(prepared.timings.is_empty());
    assert!(prepared.mesh_report.is_none());
}

#[test]
fn source_time_function_contract() {
    let config = StfConfig {
        kind: StfKind::Gauss,
        half_duration: 1.0,
        decay: 1.628,
        record_length: 10.0,
    };
    let stf = SourceTimeFunction::new(&config, 0.01).unwrap();
    let n_before = (1.5f64 * 1.0 / 0.01).ceil() as usize;
    let n_after = (10.0f64 / 0.01).ceil() as usize;
    assert_eq!(stf.len(), n_before + n_after + 1);
    assert_eq!(stf.shift(), n_before as f64 * 0.01);
    let peak = stf
        .samples()
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > stf.samples()[best] { i } else { best });
    let nearest_origin = (0..stf.len())
        .min_by(|a, b| stf.time(*a).abs().total_cmp(&stf.time(*b).abs()))
        .unwrap();
    assert_eq!(peak, nearest_origin);
}

#[test]
fn invalid_configuration_fails_before_meshing() {
    let mut config = quick_config(20.0, 20.0);
    config.courant = -1.0;
    let err = Preloop::new(
        config,
        Arc::new(small_planet(6)),
        Arc::new(UniformNrField::new(3)),
        vertical_force(shallow(1.1), 1.0),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameter { ref key, .. } if key == "TIME_COURANT"));

    let mut params = IndexMap::new();
    params.insert("TIME_RECORD_LENGTH".to_string(), "100".to_string());
    assert!(matches!(
        SolverConfig::from_params(&params),
        Err(ConfigError::MissingParameter { .. })
    ));
    params.insert("SOURCE_HALF_DURATION".to_string(), "5".to_string());
    params.insert("SOURCE_TIME_FUNCTION".to_string(), "boxcar".to_string());
    assert!(SolverConfig::from_params(&params).is_err());
    params.insert("SOURCE_TIME_FUNCTION".to_string(), "ricker".to_string());
    let parsed = SolverConfig::from_params(&params).unwrap();
    assert_eq!(parsed.stf.kind, StfKind::Ricker);
}

#[test]
fn too_many_partitions_are_rejected() {
    let mut config = quick_config(20.0, 20.0);
    config.partitions = 5;
    let err = run_partitioned(&preloop(config, 4, 3)).unwrap_err();
    assert!(matches!(
        err,
        SolverError::Config(ConfigError::InvalidPartition { .. })
    ));
}

#[test]
fn short_run_records_motion() {
    let mut receivers = ReceiverCollection::new(1);
    receivers.add("NEAR", shallow(1.15)).unwrap();
    receivers.add("FAR", shallow(2.0)).unwrap();
    let p = preloop(quick_config(20.0, 60.0), 6, 5).with_receivers(receivers);
    let outputs = run_partitioned(&p).unwrap();
    assert_eq!(outputs.len(), 1);
    let out = &outputs[0];
    assert_eq!(out.metrics.steps as usize, out.domain.nsteps());
    let taps = out.domain.taps();
    assert_eq!(taps.len(), 2);
    let near = taps.iter().find(|t| t.name() == "NEAR").unwrap();
    assert!(near.trace().iter().all(|s| s.iter().all(|v| v.is_finite())));
    assert!(near.trace().iter().any(|s| s.iter().any(|v| *v != 0.0)));
}

#[test]
fn three_dimensional_run_stays_finite() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    let mut config = quick_config(20.0, 30.0);
    config.attenuation = Some(AttenuationConfig {
        n_sls: 3,
        f_min: 0.001,
        f_max: 0.01,
    });
    config.diagnose_preloop = true;
    let p = Preloop::new(
        config,
        Arc::new(ocean_world(6)),
        Arc::new(UniformNrField::new(5)),
        explosion(shallow(1.2), 1e17),
    )
    .unwrap()
    .with_volumetric_3d(Arc::new(CosineBlob { amplitude: 0.05 }))
    .with_geometric_3d(Arc::new(TiltedSurface { amplitude: 2e3 }))
    .with_ocean_load_3d(Arc::new(UniformOcean { depth: 3e3 }))
    .with_mesh_test(true);

    let prepared = p.prepare(Communicator::solo()).unwrap();
    let report = prepared.mesh_report.clone().unwrap();
    assert_eq!(report.elements, 24);
    assert!(!prepared.timings.is_empty());
    assert!(prepared.timings.iter().any(|t| t.name == "weighted mesh"));

    let mut newmark = prepared.newmark;
    newmark.solve().unwrap();
    let domain = newmark.finalize().unwrap();
    assert!(domain.stability_norm().is_finite());
    assert!(domain.stability_norm() > 0.0);
    assert!(!domain.coupling().is_empty());
}
