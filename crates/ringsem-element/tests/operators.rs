//! Algebraic properties of the element stiffness operators.

use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ringsem_arena::{FieldLayout, KinematicState};
use ringsem_core::{ElementId, NPOINTS_EDGE, NPOINTS_ELEM};
use ringsem_element::{
    Element, FluidElement, FluidMaterial, GllBasis, GradientOperator, SolidElement, SolidMaterial,
    Workspaces,
};
use ringsem_fourier::TransformContext;

const N: usize = NPOINTS_ELEM;
const E: usize = NPOINTS_EDGE;
const NR: usize = 6;
const ORDERS: usize = 3;

fn coords() -> [[f64; 2]; N] {
    let b = GllBasis::new();
    let mut c = [[0.0; 2]; N];
    for i in 0..E {
        for j in 0..E {
            let r = 3.0 + 0.4 * (b.nodes[i] + 1.0);
            let theta = 0.9 + 0.2 * (b.nodes[j] + 1.0);
            c[i * E + j] = [r * theta.sin(), r * theta.cos()];
        }
    }
    c
}

fn weights(op: &GradientOperator, xy: &[[f64; 2]; N]) -> [f64; N] {
    let b = GllBasis::new();
    std::array::from_fn(|p| {
        b.weights[p / E] * b.weights[p % E] * op.jacobian()[p].abs() * xy[p][0]
    })
}

fn gradient() -> (GradientOperator, [f64; N]) {
    let xy = coords();
    let op = GradientOperator::new(&GllBasis::new().deriv, &xy);
    let w = weights(&op, &xy);
    (op, w)
}

fn solid(ring: bool) -> SolidElement {
    let (op, w) = gradient();
    let lambda: [f64; N] = std::array::from_fn(|p| 2.0 * w[p]);
    let mu: [f64; N] = std::array::from_fn(|p| 1.5 * w[p]);
    let material = if ring {
        SolidMaterial::Ring {
            nr: NR,
            lambda: (0..NR).flat_map(|_| lambda).collect(),
            mu: (0..NR).flat_map(|_| mu).collect(),
        }
    } else {
        SolidMaterial::Axisymmetric { lambda, mu }
    };
    let points: [u32; N] = std::array::from_fn(|p| p as u32);
    SolidElement::new(ElementId(0), NR, points, op, material, None)
}

fn fluid(ring: bool) -> FluidElement {
    let (op, w) = gradient();
    let inv_rho: [f64; N] = std::array::from_fn(|p| w[p] / 1.2);
    let material = if ring {
        FluidMaterial::Ring {
            nr: NR,
            inv_rho: (0..NR).flat_map(|_| inv_rho).collect(),
        }
    } else {
        FluidMaterial::Axisymmetric { inv_rho }
    };
    let points: [u32; N] = std::array::from_fn(|p| p as u32);
    FluidElement::new(ElementId(1), NR, points, op, material)
}

fn setup() -> (TransformContext, Workspaces) {
    let mut ctx = TransformContext::new();
    ctx.initialize(NR).unwrap();
    let mut ws = Workspaces::new();
    ws.init_workspace(NR / 2).unwrap();
    (ctx, ws)
}

/// Random coefficients of a real field: order zero is real.
fn random_field(rng: &mut ChaCha8Rng, dof: usize) -> Vec<Complex64> {
    (0..ORDERS * dof * N)
        .map(|i| {
            let im = if i < dof * N { 0.0 } else { rng.gen::<f64>() - 0.5 };
            Complex64::new(rng.gen::<f64>() - 0.5, im)
        })
        .collect()
}

/// Inner product of real fields given by their coefficients.
fn inner(a: &[Complex64], b: &[Complex64], dof: usize) -> f64 {
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| {
            let weight = if i < dof * N { 1.0 } else { 2.0 };
            weight * (x.conj() * y).re
        })
        .sum()
}

fn apply_solid(el: &SolidElement, u: &[Complex64]) -> Vec<Complex64> {
    let (ctx, mut ws) = setup();
    let mut ku = vec![Complex64::new(0.0, 0.0); u.len()];
    el.apply_stiffness(&mut ws.solid, ctx.provider().unwrap(), u, &mut ku)
        .unwrap();
    ku
}

fn apply_fluid(el: &FluidElement, u: &[Complex64]) -> Vec<Complex64> {
    let (ctx, mut ws) = setup();
    let mut ku = vec![Complex64::new(0.0, 0.0); u.len()];
    el.apply_stiffness(&mut ws.fluid, ctx.provider().unwrap(), u, &mut ku)
        .unwrap();
    ku
}

#[test]
fn solid_stiffness_is_symmetric_and_semidefinite() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for ring in [false, true] {
        let el = solid(ring);
        for _ in 0..5 {
            let x = random_field(&mut rng, 3);
            let y = random_field(&mut rng, 3);
            let kx = apply_solid(&el, &x);
            let ky = apply_solid(&el, &y);
            let a = inner(&x, &ky, 3);
            let b = inner(&kx, &y, 3);
            assert!((a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0), "{a} vs {b}");
            assert!(inner(&x, &kx, 3) >= 0.0);
        }
    }
}

#[test]
fn fluid_stiffness_is_symmetric_and_semidefinite() {
    let mut rng = ChaCha8Rng::seed_from_u64(43);
    for ring in [false, true] {
        let el = fluid(ring);
        for _ in 0..5 {
            let x = random_field(&mut rng, 1);
            let y = random_field(&mut rng, 1);
            let kx = apply_fluid(&el, &x);
            let ky = apply_fluid(&el, &y);
            let a = inner(&x, &ky, 1);
            let b = inner(&kx, &y, 1);
            assert!((a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0), "{a} vs {b}");
            assert!(inner(&x, &kx, 1) >= 0.0);
        }
    }
}

#[test]
fn ring_material_matches_axisymmetric_when_uniform() {
    let mut rng = ChaCha8Rng::seed_from_u64(44);
    let x = random_field(&mut rng, 3);
    let a = apply_solid(&solid(false), &x);
    let b = apply_solid(&solid(true), &x);
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.norm()));
    for (p, q) in a.iter().zip(&b) {
        assert!((p - q).norm() <= 1e-10 * scale);
    }
}

#[test]
fn rigid_translations_produce_no_force() {
    let el = solid(false);
    let zero = Complex64::new(0.0, 0.0);

    // translation along the axis lives in order zero
    let mut uz = vec![zero; ORDERS * 3 * N];
    for p in 0..N {
        uz[2 * N + p] = Complex64::new(1.0, 0.0);
    }
    // translation across the axis lives in order one
    let mut ux = vec![zero; ORDERS * 3 * N];
    for p in 0..N {
        ux[3 * N + p] = Complex64::new(0.5, 0.0);
        ux[3 * N + N + p] = Complex64::new(0.0, 0.5);
    }
    for u in [uz, ux] {
        let ku = apply_solid(&el, &u);
        let max = ku.iter().fold(0.0f64, |m, v| m.max(v.norm()));
        assert!(max < 1e-10, "residual force {max}");
    }
}

#[test]
fn update_scatters_negative_stiffness() {
    let mut rng = ChaCha8Rng::seed_from_u64(45);
    let (ctx, mut ws) = setup();
    let x = random_field(&mut rng, 3);
    let expected = apply_solid(&solid(false), &x);

    let mut state = KinematicState::new(FieldLayout::new(3, vec![ORDERS; N]));
    for p in 0..N {
        for m in 0..ORDERS {
            for c in 0..3 {
                state.displ[p * ORDERS * 3 + m * 3 + c] = x[m * 3 * N + c * N + p];
            }
        }
    }
    let mut fluid_state = KinematicState::new(FieldLayout::new(1, Vec::new()));
    let mut el = Element::Solid(solid(false));
    el.update(&mut ws, ctx.provider().unwrap(), &mut state, &mut fluid_state)
        .unwrap();
    for p in 0..N {
        for m in 0..ORDERS {
            for c in 0..3 {
                let got = state.force[p * ORDERS * 3 + m * 3 + c];
                let want = -expected[m * 3 * N + c * N + p];
                assert!((got - want).norm() < 1e-12);
            }
        }
    }
}

#[test]
fn update_without_workspace_fails() {
    let mut ctx = TransformContext::new();
    ctx.initialize(NR).unwrap();
    let mut ws = Workspaces::new();
    let mut state = KinematicState::new(FieldLayout::new(1, vec![ORDERS; N]));
    let mut solid_state = KinematicState::new(FieldLayout::new(3, Vec::new()));
    let mut el = Element::Fluid(fluid(false));
    assert!(el
        .update(&mut ws, ctx.provider().unwrap(), &mut solid_state, &mut state)
        .is_err());
}
