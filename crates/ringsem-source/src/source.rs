//! Point sources and their spatial force patterns.
//!
//! A source at `(r₀, θ₀, φ₀)` acts on the GLL points of the solid
//! element containing `(r₀, θ₀)`, weighted by the Lagrange interpolants
//! `ℓₚ = ℓₐ(ξ₀)ℓ_b(η₀)`. Its azimuthal dependence is a Dirac at `φ₀`,
//! so order `m` receives `e^{-imφ₀} / 2π` of it.
//!
//! A point force contributes `ℓₚ F` directly. A moment tensor acts
//! through the gradient of the test functions: with `Tₚ = ℓₚ M` written
//! in the cylindrical frame, the pattern of order `m` is `Gₘᴴ T`.

use std::f64::consts::PI;
use std::fmt::Write as _;

use num_complex::Complex64;
use tracing::debug;

use ringsem_core::spectral::max_order;
use ringsem_core::{ConfigError, NumericalError, SolverError, NPOINTS_ELEM};
use ringsem_element::{ElementKind, GradientOperator};
use ringsem_engine::{Domain, SourceTerm};
use ringsem_mesh::{ElementFrame, Location, Mesh};

const N: usize = NPOINTS_ELEM;
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// What the source exerts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mechanism {
    /// A force with components along `r`, `θ` and `φ`, in newtons.
    Force {
        /// Radial component.
        r: f64,
        /// Colatitudinal component.
        theta: f64,
        /// Azimuthal component.
        phi: f64,
    },
    /// A moment tensor in the spherical frame, in newton metres.
    MomentTensor {
        /// `M_rr`.
        rr: f64,
        /// `M_θθ`.
        tt: f64,
        /// `M_φφ`.
        pp: f64,
        /// `M_rθ`.
        rt: f64,
        /// `M_rφ`.
        rp: f64,
        /// `M_θφ`.
        tp: f64,
    },
}

impl Mechanism {
    fn is_finite(&self) -> bool {
        match *self {
            Self::Force { r, theta, phi } => [r, theta, phi].iter().all(|v| v.is_finite()),
            Self::MomentTensor {
                rr,
                tt,
                pp,
                rt,
                rp,
                tp,
            } => [rr, tt, pp, rt, rp, tp].iter().all(|v| v.is_finite()),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Force { .. } => "point force",
            Self::MomentTensor { .. } => "moment tensor",
        }
    }
}

/// A point source.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    location: Location,
    mechanism: Mechanism,
}

impl Source {
    /// A source of `mechanism` at `location`.
    pub fn new(location: Location, mechanism: Mechanism) -> Result<Self, ConfigError> {
        let Location { depth, theta, phi } = location;
        if !(depth.is_finite() && depth >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                key: "SOURCE_DEPTH".into(),
                reason: format!("must be finite and non-negative, got {depth}"),
            });
        }
        if !(theta.is_finite() && (0.0..=PI).contains(&theta)) || !phi.is_finite() {
            return Err(ConfigError::InvalidParameter {
                key: "SOURCE_COLATITUDE".into(),
                reason: format!("({theta}, {phi}) is not a valid direction"),
            });
        }
        if !mechanism.is_finite() {
            return Err(ConfigError::InvalidParameter {
                key: "SOURCE_MECHANISM".into(),
                reason: "components must be finite".into(),
            });
        }
        Ok(Self {
            location,
            mechanism,
        })
    }

    /// Where the source sits.
    pub fn location(&self) -> Location {
        self.location
    }

    /// What the source exerts.
    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Force pattern on this worker, `None` if another worker owns the
    /// source element.
    pub fn pattern(&self, mesh: &Mesh) -> Result<Option<SourceTerm>, SolverError> {
        let Location { depth, theta, phi } = self.location;
        let located = mesh.locate(mesh.outer_radius() - depth, theta)?;
        if located.kind == ElementKind::Fluid {
            return Err(ConfigError::InvalidParameter {
                key: "SOURCE_DEPTH".into(),
                reason: format!("a source at depth {depth} lies in a fluid layer"),
            }
            .into());
        }
        if located.owner != mesh.partition().rank() {
            return Ok(None);
        }
        let frame = mesh.frame(located.element)?;
        let basis = mesh.basis();
        let lx = basis.lagrange(located.xi);
        let le = basis.lagrange(located.eta);
        let weights: [f64; N] = std::array::from_fn(|p| lx[p / lx.len()] * le[p % le.len()]);

        let orders = max_order(frame.nr) + 1;
        let mut coeffs = vec![vec![ZERO; 3 * orders]; N];
        match self.mechanism {
            Mechanism::Force { r, theta: ft, phi: fp } => {
                let (sin, cos) = theta.sin_cos();
                let force = [r * sin + ft * cos, fp, r * cos - ft * sin];
                for m in 0..orders {
                    let phase = azimuthal_phase(m, phi);
                    for (p, c) in coeffs.iter_mut().enumerate() {
                        for k in 0..3 {
                            c[3 * m + k] = phase * (weights[p] * force[k]);
                        }
                    }
                }
            }
            Mechanism::MomentTensor { .. } => {
                let tensor = self.cylindrical_tensor(theta);
                moment_pattern(mesh, &frame, &weights, &tensor, phi, orders, &mut coeffs)?;
            }
        }

        let pattern: Vec<(u32, Vec<Complex64>)> = frame
            .local
            .iter()
            .zip(coeffs)
            .filter_map(|(local, c)| {
                let local = (*local)?;
                c.iter().any(|v| v.norm() > 0.0).then_some((local, c))
            })
            .collect();
        debug!(
            element = %located.element,
            points = pattern.len(),
            orders,
            mechanism = self.mechanism.as_str(),
            "source pattern built"
        );
        Ok(Some(SourceTerm::new(pattern)))
    }

    /// Add the source to `domain` if this worker owns it.
    ///
    /// Returns whether a term was added.
    pub fn release(&self, mesh: &Mesh, domain: &mut Domain) -> Result<bool, SolverError> {
        match self.pattern(mesh)? {
            Some(term) => {
                domain.add_source(term);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The moment tensor rotated into `(s, φ, z)` at colatitude `theta`.
    fn cylindrical_tensor(&self, theta: f64) -> [[f64; 3]; 3] {
        let Mechanism::MomentTensor {
            rr,
            tt,
            pp,
            rt,
            rp,
            tp,
        } = self.mechanism
        else {
            return [[0.0; 3]; 3];
        };
        let m = [[rr, rt, rp], [rt, tt, tp], [rp, tp, pp]];
        let (sin, cos) = theta.sin_cos();
        // Rows: s, φ, z in terms of r, θ, φ.
        let q = [[sin, cos, 0.0], [0.0, 0.0, 1.0], [cos, -sin, 0.0]];
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..3)
                    .flat_map(|k| (0..3).map(move |l| (k, l)))
                    .map(|(k, l)| q[i][k] * m[k][l] * q[j][l])
                    .sum();
            }
        }
        out
    }

    /// Multi-line summary.
    pub fn verbose(&self) -> String {
        let Location { depth, theta, phi } = self.location;
        let mut out = format!(
            "source: {} at depth {depth} m, colatitude {:.4} deg, azimuth {:.4} deg\n",
            self.mechanism.as_str(),
            theta.to_degrees(),
            phi.to_degrees()
        );
        match self.mechanism {
            Mechanism::Force { r, theta, phi } => {
                let _ = writeln!(out, "  F = ({r:e}, {theta:e}, {phi:e})");
            }
            Mechanism::MomentTensor {
                rr,
                tt,
                pp,
                rt,
                rp,
                tp,
            } => {
                let _ = writeln!(
                    out,
                    "  M = ({rr:e}, {tt:e}, {pp:e}, {rt:e}, {rp:e}, {tp:e})"
                );
            }
        }
        out
    }
}

fn azimuthal_phase(m: usize, phi: f64) -> Complex64 {
    Complex64::from_polar(1.0 / (2.0 * PI), -(m as f64) * phi)
}

fn moment_pattern(
    mesh: &Mesh,
    frame: &ElementFrame,
    weights: &[f64; N],
    tensor: &[[f64; 3]; 3],
    phi: f64,
    orders: usize,
    coeffs: &mut [Vec<Complex64>],
) -> Result<(), SolverError> {
    let gradient = GradientOperator::new(&mesh.basis().deriv, &frame.coords);
    if !gradient.is_finite() {
        return Err(NumericalError::NonFiniteOperator {
            element: frame.id,
            what: "source gradient",
        }
        .into());
    }
    let mut t = vec![ZERO; 9 * N];
    let mut out = vec![ZERO; 3 * N];
    for m in 0..orders {
        let phase = azimuthal_phase(m, phi);
        // Row `3d + c` holds the derivative along `d` of component `c`.
        for d in 0..3 {
            for c in 0..3 {
                for p in 0..N {
                    t[(3 * d + c) * N + p] = phase * (weights[p] * tensor[d][c]);
                }
            }
        }
        gradient.vector_adjoint(m, &t, &mut out);
        for (p, cp) in coeffs.iter_mut().enumerate() {
            for c in 0..3 {
                cp[3 * m + c] = out[c * N + p];
            }
        }
    }
    Ok(())
}
