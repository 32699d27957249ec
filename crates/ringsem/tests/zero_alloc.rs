//! Integration test: once the preloop is done, time steps never touch
//! the heap.
//!
//! The counting allocator is installed for this whole test binary, so
//! the file holds only allocation tests. It also reports allocations made
//! inside `forbid_allocations`, the scope every debug-build time step
//! runs in.

use std::sync::Arc;

use ringsem::prelude::*;
use ringsem::types::alloc_guard::forbid_allocations;
use ringsem_test_utils::fixtures::{
    explosion, ocean_world, quick_config, shallow, CosineBlob, UniformOcean,
};
use ringsem_test_utils::{count_allocations, CountingAllocator};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

fn prepared(config: SolverConfig) -> Prepared {
    let mut receivers = ReceiverCollection::new(2);
    receivers.add("STA", shallow(1.3)).unwrap();
    Preloop::new(
        config,
        Arc::new(ocean_world(6)),
        Arc::new(UniformNrField::new(5)),
        explosion(shallow(1.2), 1e17),
    )
    .unwrap()
    .with_volumetric_3d(Arc::new(CosineBlob { amplitude: 0.05 }))
    .with_ocean_load_3d(Arc::new(UniformOcean { depth: 3e3 }))
    .with_receivers(receivers)
    .prepare(Communicator::solo())
    .unwrap()
}

#[test]
fn steps_do_not_allocate() {
    let mut config = quick_config(20.0, 200.0);
    config.stability_interval = 5;
    let mut newmark = prepared(config).newmark;
    assert!(newmark.advance().unwrap());

    let (results, allocations) = count_allocations(|| {
        let mut ok = 0;
        for _ in 0..20 {
            if matches!(newmark.advance(), Ok(true)) {
                ok += 1;
            }
        }
        ok
    });
    assert_eq!(results, 20);
    assert_eq!(allocations, 0);
    assert!(newmark.domain().unwrap().taps()[0].trace().len() > 1);
}

#[test]
fn attenuating_steps_do_not_allocate() {
    let mut config = quick_config(20.0, 200.0);
    config.attenuation = Some(AttenuationConfig {
        n_sls: 3,
        f_min: 0.001,
        f_max: 0.01,
    });
    let mut newmark = prepared(config).newmark;
    assert!(newmark.advance().unwrap());

    let ((), allocations) = count_allocations(|| {
        for _ in 0..10 {
            let _ = newmark.advance();
        }
    });
    assert_eq!(allocations, 0);
    assert_eq!(newmark.step(), 11);
}

#[test]
fn the_counter_sees_allocations() {
    let (v, allocations) = count_allocations(|| vec![1u8; 64]);
    assert_eq!(v.len(), 64);
    assert!(allocations >= 1);
}

#[test]
fn forbidden_scope_reports_an_allocation() {
    let (v, violations) = forbid_allocations(|| vec![7u8; 32]);
    assert_eq!(v.len(), 32);
    assert_eq!(violations, 1);

    let (_, outside) = count_allocations(|| vec![7u8; 32]);
    assert_eq!(outside, 1);
    let ((), quiet) = forbid_allocations(|| {});
    assert_eq!(quiet, 0);
}

#[test]
fn guarded_steps_report_nothing() {
    let mut newmark = prepared(quick_config(20.0, 200.0)).newmark;
    assert!(newmark.advance().unwrap());
    let (stepped, violations) = forbid_allocations(|| newmark.advance());
    assert!(stepped.unwrap());
    assert_eq!(violations, 0);
}
