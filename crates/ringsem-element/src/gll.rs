//! Gauss–Lobatto–Legendre basis of the element edges.
//!
//! The interior nodes are the roots of `P'_N`, obtained with the
//! Golub–Welsch method as eigenvalues of the Jacobi matrix of the
//! `(1, 1)` Jacobi polynomials.

use nalgebra::{DMatrix, SymmetricEigen};
use ringsem_core::{NPOINTS_EDGE, NPOL};

/// Derivative matrix: `deriv[i][j] = ℓ_j'(ξ_i)`.
pub type DerivativeMatrix = [[f64; NPOINTS_EDGE]; NPOINTS_EDGE];

/// Nodes, weights and derivative matrix of the 1-D GLL basis.
#[derive(Clone, Debug, PartialEq)]
pub struct GllBasis {
    /// Nodes on `[-1, 1]`, ascending.
    pub nodes: [f64; NPOINTS_EDGE],
    /// Quadrature weights.
    pub weights: [f64; NPOINTS_EDGE],
    /// Lagrange derivative matrix.
    pub deriv: DerivativeMatrix,
}

/// Legendre polynomial `P_n(x)` by the three-term recurrence.
fn legendre(n: usize, x: f64) -> f64 {
    let (mut p0, mut p1) = (1.0, x);
    if n == 0 {
        return p0;
    }
    for k in 1..n {
        let kf = k as f64;
        let p2 = ((2.0 * kf + 1.0) * x * p1 - kf * p0) / (kf + 1.0);
        p0 = p1;
        p1 = p2;
    }
    p1
}

impl GllBasis {
    /// Basis of order [`NPOL`].
    pub fn new() -> Self {
        let n_inner = NPOL - 1;
        let jacobi = DMatrix::from_fn(n_inner, n_inner, |r, c| {
            let k = r.max(c);
            if r.abs_diff(c) == 1 {
                let kf = k as f64;
                (kf * (kf + 2.0) / ((2.0 * kf + 1.0) * (2.0 * kf + 3.0))).sqrt()
            } else {
                0.0
            }
        });
        let mut inner: Vec<f64> = SymmetricEigen::new(jacobi).eigenvalues.iter().copied().collect();
        inner.sort_by(f64::total_cmp);

        let mut nodes = [0.0; NPOINTS_EDGE];
        nodes[0] = -1.0;
        nodes[NPOL] = 1.0;
        nodes[1..NPOL].copy_from_slice(&inner);

        let nf = NPOL as f64;
        let mut weights = [0.0; NPOINTS_EDGE];
        let mut pn = [0.0; NPOINTS_EDGE];
        for (i, &x) in nodes.iter().enumerate() {
            pn[i] = legendre(NPOL, x);
            weights[i] = 2.0 / (nf * (nf + 1.0) * pn[i] * pn[i]);
        }

        let mut deriv = [[0.0; NPOINTS_EDGE]; NPOINTS_EDGE];
        for i in 0..NPOINTS_EDGE {
            for j in 0..NPOINTS_EDGE {
                deriv[i][j] = if i != j {
                    pn[i] / (pn[j] * (nodes[i] - nodes[j]))
                } else if i == 0 {
                    -nf * (nf + 1.0) / 4.0
                } else if i == NPOL {
                    nf * (nf + 1.0) / 4.0
                } else {
                    0.0
                };
            }
        }

        Self {
            nodes,
            weights,
            deriv,
        }
    }

    /// Lagrange basis values `ℓ_j(x)` at an arbitrary `x` in `[-1, 1]`.
    pub fn lagrange(&self, x: f64) -> [f64; NPOINTS_EDGE] {
        let mut out = [1.0; NPOINTS_EDGE];
        for (j, lj) in out.iter_mut().enumerate() {
            for (k, &xk) in self.nodes.iter().enumerate() {
                if k != j {
                    *lj *= (x - xk) / (self.nodes[j] - xk);
                }
            }
        }
        out
    }
}

impl Default for GllBasis {
    fn default() -> Self {
        Self::new()
    }
}
