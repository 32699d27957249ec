//! Integration test: a partitioned run agrees with itself at partition
//! boundaries and with a serial run everywhere.

use std::collections::HashMap;
use std::sync::Arc;

use num_complex::Complex64;
use ringsem::prelude::*;
use ringsem_test_utils::fixtures::{explosion, ocean_world, quick_config, shallow};

fn preloop(partitions: usize) -> Preloop {
    let mut config = quick_config(20.0, 40.0);
    config.partitions = partitions;
    let mut receivers = ReceiverCollection::new(1);
    receivers.add("A", shallow(0.6)).unwrap();
    receivers.add("B", shallow(1.6)).unwrap();
    receivers.add("C", shallow(2.5)).unwrap();
    Preloop::new(
        config,
        Arc::new(ocean_world(9)),
        Arc::new(UniformNrField::new(5)),
        explosion(shallow(1.2), 1e17),
    )
    .unwrap()
    .with_receivers(receivers)
}

/// Final solid displacement of every point, keyed by global id.
fn displacement_by_id(domain: &Domain) -> Vec<(u32, Vec<Complex64>)> {
    let state = domain.solid();
    domain
        .solid_global_ids()
        .iter()
        .enumerate()
        .map(|(p, &id)| (id, state.displ[state.layout().range(p)].to_vec()))
        .collect()
}

#[test]
fn shared_points_agree_bit_for_bit() {
    let outputs = run_partitioned(&preloop(3)).unwrap();
    assert_eq!(outputs.len(), 3);
    assert!(outputs.iter().all(|o| o.domain.element_count() > 0));

    let mut seen: HashMap<u32, (usize, Vec<Complex64>)> = HashMap::new();
    let mut shared = 0;
    for out in &outputs {
        for (id, values) in displacement_by_id(&out.domain) {
            match seen.get(&id) {
                Some((rank, first)) => {
                    shared += 1;
                    assert_eq!(
                        first, &values,
                        "point {id} differs between ranks {rank} and {}",
                        out.rank
                    );
                }
                None => {
                    seen.insert(id, (out.rank, values));
                }
            }
        }
    }
    assert!(shared > 0);
}

#[test]
fn partitioned_run_matches_serial_run() {
    let serial = run_partitioned(&preloop(1)).unwrap();
    let parallel = run_partitioned(&preloop(3)).unwrap();
    assert_eq!(serial[0].dt, parallel[0].dt);

    let reference: HashMap<u32, Vec<Complex64>> =
        displacement_by_id(&serial[0].domain).into_iter().collect();
    let scale = reference
        .values()
        .flatten()
        .map(|c| c.norm())
        .fold(0.0, f64::max);
    assert!(scale > 0.0);

    let mut covered = 0;
    for out in &parallel {
        for (id, values) in displacement_by_id(&out.domain) {
            let expected = &reference[&id];
            assert_eq!(expected.len(), values.len());
            for (a, b) in expected.iter().zip(&values) {
                assert!((a - b).norm() <= 1e-8 * scale, "point {id}: {a} vs {b}");
            }
            covered += 1;
        }
    }
    assert!(covered >= reference.len());

    let serial_taps = serial[0].domain.taps().len();
    let parallel_taps: usize = parallel.iter().map(|o| o.domain.taps().len()).sum();
    assert_eq!(serial_taps, 3);
    assert_eq!(parallel_taps, 3);
}
