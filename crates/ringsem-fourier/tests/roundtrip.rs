//! Forward-then-inverse round trip at every multiplicity.

use num_complex::Complex64;
use proptest::prelude::*;
use ringsem_fourier::{Multiplicity, TransformContext};

const MAX_NR: usize = 24;

fn arb_multiplicity() -> impl Strategy<Value = Multiplicity> {
    prop::sample::select(Multiplicity::ALL.to_vec())
}

fn arb_case() -> impl Strategy<Value = (Multiplicity, usize, Vec<f64>)> {
    (arb_multiplicity(), 1..=MAX_NR).prop_flat_map(|(mult, nr)| {
        prop::collection::vec(-1.0e3..1.0e3f64, nr * mult.width())
            .prop_map(move |data| (mult, nr, data))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn forward_then_inverse_recovers_samples((mult, nr, phys) in arb_case()) {
        let mut ctx = TransformContext::new();
        ctx.initialize(MAX_NR).unwrap();
        let provider = ctx.provider().unwrap();

        let w = mult.width();
        let mut coeffs = vec![Complex64::new(0.0, 0.0); (nr / 2 + 1) * w];
        let mut back = vec![0.0; nr * w];
        provider.forward(mult, nr, &phys, &mut coeffs).unwrap();
        provider.inverse(mult, nr, &coeffs, &mut back).unwrap();

        let scale = phys.iter().fold(1.0f64, |a, x| a.max(x.abs()));
        for (a, b) in phys.iter().zip(&back) {
            prop_assert!((a - b).abs() <= 1e-10 * scale, "{} vs {}", a, b);
        }
    }
}

#[test]
fn every_ring_size_round_trips_a_single_harmonic() {
    let mut ctx = TransformContext::new();
    ctx.initialize(MAX_NR).unwrap();
    let provider = ctx.provider().unwrap();
    for nr in 1..=MAX_NR {
        let m = (nr - 1) / 2;
        let phys: Vec<f64> = (0..nr)
            .map(|k| {
                let phi = 2.0 * std::f64::consts::PI * k as f64 / nr as f64;
                1.0 + (m as f64 * phi + 0.3).cos()
            })
            .collect();
        let mut coeffs = vec![Complex64::new(0.0, 0.0); nr / 2 + 1];
        let mut back = vec![0.0; nr];
        provider
            .forward(Multiplicity::One, nr, &phys, &mut coeffs)
            .unwrap();
        provider
            .inverse(Multiplicity::One, nr, &coeffs, &mut back)
            .unwrap();
        for (a, b) in phys.iter().zip(&back) {
            assert!((a - b).abs() < 1e-12, "nr={nr}: {a} vs {b}");
        }
    }
}
