//! Opt-in checks of the element operators.
//!
//! Every local element stiffness must be self-adjoint and positive
//! semi-definite under the inner product of real fields,
//! `⟨x, y⟩ = Σₘ cₘ Re(x̄ₘ · yₘ)` with `c₀ = 1` and `cₘ = 2`. A power
//! iteration on `M⁻¹K` with the element's own mass bounds the largest
//! eigenvalue of the assembled system, which bounds the stable step of
//! the central-difference scheme by `2 / √λ`.

use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use ringsem_core::{NumericalError, PointId, SolverError, NPOINTS_ELEM};
use ringsem_element::{Element, ElementKind, Workspaces};
use ringsem_fourier::{TransformContext, TransformProvider};

use crate::geometry::{ElementGeometry, Geometry};
use crate::weighted::Providers;

const N: usize = NPOINTS_ELEM;
const SEED: u64 = 0x5eed_2b1f;
const POWER_ITERATIONS: usize = 60;
const ASYMMETRY_TOLERANCE: f64 = 1e-8;

/// Outcome of [`Mesh::test`](crate::Mesh::test).
#[derive(Clone, Debug, PartialEq)]
pub struct MeshReport {
    /// Number of elements checked.
    pub elements: usize,
    /// Largest element eigenvalue of `M⁻¹K`.
    pub max_eigenvalue: f64,
    /// Stable step bound `2 / √λ`.
    pub dt_bound: f64,
}

/// Real-field inner product; `width` values per order.
fn dot(x: &[Complex64], y: &[Complex64], width: usize) -> f64 {
    x.iter()
        .zip(y)
        .enumerate()
        .map(|(i, (a, b))| {
            let c = if i < width { 1.0 } else { 2.0 };
            c * (a.conj() * b).re
        })
        .sum()
}

fn random_field(rng: &mut ChaCha8Rng, len: usize, width: usize) -> Vec<Complex64> {
    (0..len)
        .map(|i| {
            let re = rng.gen_range(-1.0..1.0);
            let im = if i < width {
                0.0
            } else {
                rng.gen_range(-1.0..1.0)
            };
            Complex64::new(re, im)
        })
        .collect()
}

fn apply(
    e: &Element,
    ws: &mut Workspaces,
    tf: &TransformProvider,
    x: &[Complex64],
    kx: &mut [Complex64],
) -> Result<(), SolverError> {
    match e {
        Element::Solid(s) => s.apply_stiffness(&mut ws.solid, tf, x, kx)?,
        Element::Fluid(f) => f.apply_stiffness(&mut ws.fluid, tf, x, kx)?,
    }
    Ok(())
}

/// Element-local lumped mass per point.
fn element_mass(g: &ElementGeometry, prov: &Providers<'_>) -> Result<[f64; N], NumericalError> {
    let mut mass = [0.0; N];
    for (p, m) in mass.iter_mut().enumerate() {
        let mat = prov.reference(g, p);
        let density = match g.kind {
            ElementKind::Solid => mat.rho,
            ElementKind::Fluid => 1.0 / mat.kappa(),
        };
        *m = g.weight[p] * density;
        if !(m.is_finite() && *m > 0.0) {
            return Err(NumericalError::NonPositiveMass {
                point: PointId(g.lattice[p]),
                value: *m,
            });
        }
    }
    Ok(mass)
}

fn check_element(
    e: &Element,
    g: &ElementGeometry,
    prov: &Providers<'_>,
    ws: &mut Workspaces,
    tf: &TransformProvider,
    rng: &mut ChaCha8Rng,
) -> Result<f64, SolverError> {
    let (dof, orders) = match e {
        Element::Solid(s) => (3, s.orders()),
        Element::Fluid(f) => (1, f.orders()),
    };
    let width = dof * N;
    let len = orders * width;
    let mass = element_mass(g, prov)?;

    let x = random_field(rng, len, width);
    let y = random_field(rng, len, width);
    let mut kx = vec![Complex64::new(0.0, 0.0); len];
    let mut ky = kx.clone();
    apply(e, ws, tf, &x, &mut kx)?;
    apply(e, ws, tf, &y, &mut ky)?;

    let norm = |v: &[Complex64]| dot(v, v, width).sqrt();
    let scale = (norm(&kx) * norm(&y)).max(f64::MIN_POSITIVE);
    let asymmetry = (dot(&y, &kx, width) - dot(&ky, &x, width)).abs() / scale;
    if asymmetry > ASYMMETRY_TOLERANCE {
        return Err(NumericalError::NotSelfAdjoint {
            element: g.id,
            asymmetry,
        }
        .into());
    }
    let rayleigh = dot(&x, &kx, width) / dot(&x, &x, width);
    if rayleigh < -ASYMMETRY_TOLERANCE * norm(&kx) / norm(&x) {
        return Err(NumericalError::NotPositiveSemiDefinite {
            element: g.id,
            rayleigh,
        }
        .into());
    }

    let mut v = x;
    let mut kv = kx;
    for _ in 0..POWER_ITERATIONS {
        for (i, (vi, ki)) in v.iter_mut().zip(&kv).enumerate() {
            *vi = *ki / mass[i % N];
        }
        let n = norm(&v);
        if n == 0.0 {
            return Ok(0.0);
        }
        v.iter_mut().for_each(|vi| *vi /= n);
        apply(e, ws, tf, &v, &mut kv)?;
    }
    let mv: Vec<Complex64> = v.iter().enumerate().map(|(i, vi)| *vi * mass[i % N]).collect();
    Ok(dot(&v, &kv, width) / dot(&v, &mv, width))
}

fn check_all(
    geom: &Geometry,
    prov: &Providers<'_>,
    elements: &[Element],
    tf: &TransformProvider,
    max_nr: usize,
) -> Result<f64, SolverError> {
    let mut ws = Workspaces::new();
    ws.init_workspace(max_nr / 2)?;
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut max_eigenvalue: f64 = 0.0;
    for (e, g) in elements.iter().zip(geom.local_elements()) {
        let lambda = check_element(e, g, prov, &mut ws, tf, &mut rng)?;
        max_eigenvalue = max_eigenvalue.max(lambda);
    }
    Ok(max_eigenvalue)
}

/// Check every local element.
pub(crate) fn check(
    geom: &Geometry,
    prov: &Providers<'_>,
    elements: &[Element],
) -> Result<MeshReport, SolverError> {
    let max_nr = elements.iter().map(Element::nr).max().unwrap_or(1).max(1);
    let mut tf = TransformContext::new();
    tf.initialize(max_nr)?;
    let result = check_all(geom, prov, elements, tf.provider()?, max_nr);
    tf.finalize()?;
    let max_eigenvalue = result?;
    let dt_bound = if max_eigenvalue > 0.0 {
        2.0 / max_eigenvalue.sqrt()
    } else {
        f64::INFINITY
    };
    debug!(
        elements = elements.len(),
        max_eigenvalue, dt_bound, "element operators checked"
    );
    Ok(MeshReport {
        elements: elements.len(),
        max_eigenvalue,
        dt_bound,
    })
}
