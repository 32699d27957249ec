//! Time-step independent geometry of the meridional mesh.
//!
//! The mesh is a structured grid of `rows × columns` quadrilaterals in
//! `(r, θ)`. GLL points form a global lattice of
//! `(4·rows + 1) × (4·columns + 1)` points; lattice point `(I, J)` has
//! id `I · (4·columns + 1) + J`. A point on a solid–fluid boundary
//! exists once in the solid point set and once in the fluid point set,
//! both under its lattice id.
//!
//! Every worker builds the geometry of the whole mesh: partition
//! boundaries, shared-point holders and point masses then follow from
//! the same data on every worker.

use smallvec::SmallVec;

use ringsem_core::spectral::max_order;
use ringsem_core::{
    ConfigError, ElementId, ExodusModel, Geometric3D, NrField, NPOINTS_EDGE, NPOINTS_ELEM, NPOL,
};
use ringsem_element::{ElementKind, GllBasis, GradientOperator};

use crate::partition::Partition;

const N: usize = NPOINTS_ELEM;
const E: usize = NPOINTS_EDGE;

/// Marks a lattice point without a local index.
pub(crate) const NONE: u32 = u32::MAX;

/// Geometry of one element.
#[derive(Clone, Debug)]
pub(crate) struct ElementGeometry {
    pub id: ElementId,
    pub row: usize,
    pub kind: ElementKind,
    pub owner: usize,
    pub nr: usize,
    /// Reference radius of every point, before topography.
    pub r_ref: [f64; N],
    /// `[r, θ]` of every point.
    pub polar: [[f64; 2]; N],
    /// `[s, z]` of every point.
    pub coords: [[f64; 2]; N],
    pub lattice: [u32; N],
    /// Integration weight `w_a w_b |J| s` of every point.
    pub weight: [f64; N],
}

impl ElementGeometry {
    /// Derivative of `[s, z]` along η at point `p`.
    pub fn tangent(&self, basis: &GllBasis, p: usize) -> [f64; 2] {
        let (a, b) = (p / E, p % E);
        let mut t = [0.0; 2];
        for k in 0..E {
            let c = self.coords[a * E + k];
            t[0] += basis.deriv[b][k] * c[0];
            t[1] += basis.deriv[b][k] * c[1];
        }
        t
    }

    /// Quadrature-weighted area normal of the η-edge through point `p`,
    /// oriented outward (`sign = 1`) or inward (`sign = -1`).
    pub fn edge_normal(&self, basis: &GllBasis, p: usize, sign: f64) -> [f64; 2] {
        let t = self.tangent(basis, p);
        let len = (t[0] * t[0] + t[1] * t[1]).sqrt();
        let mut n = [t[1] / len, -t[0] / len];
        let theta = self.polar[p][1];
        if n[0] * theta.sin() + n[1] * theta.cos() < 0.0 {
            n = [-n[0], -n[1]];
        }
        let area = basis.weights[p % E] * len * self.coords[p][0] * sign;
        [n[0] * area, n[1] * area]
    }
}

/// Global geometry and local point numbering of one worker.
#[derive(Clone, Debug)]
pub(crate) struct Geometry {
    pub radii: Vec<f64>,
    pub thetas: Vec<f64>,
    pub rows: usize,
    pub columns: usize,
    pub row_kind: Vec<ElementKind>,
    pub elements: Vec<ElementGeometry>,
    /// `(element index, point index)` of every element touching a
    /// lattice point, in ascending element id.
    pub adjacency: Vec<SmallVec<[(u32, u8); 4]>>,
    /// Largest `nr` of the adjacent solid (fluid) elements, 0 if none.
    pub solid_nr: Vec<usize>,
    pub fluid_nr: Vec<usize>,
    /// Local index per lattice point, [`NONE`] if not local.
    pub solid_local: Vec<u32>,
    pub fluid_local: Vec<u32>,
    /// Lattice id per local point.
    pub solid_points: Vec<u32>,
    pub fluid_points: Vec<u32>,
    pub rank: usize,
}

/// What the geometry is built from.
pub(crate) struct GeometryInput<'a> {
    pub model: &'a dyn ExodusModel,
    pub nr_field: &'a dyn NrField,
    pub geometric: Option<&'a dyn Geometric3D>,
    pub basis: &'a GllBasis,
    /// Half-angle of the unmeshed polar cones, radians.
    pub polar_cap: f64,
    pub partition: Partition,
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::InvalidModel { reason }
}

/// Position along an edge subdivided at the GLL nodes.
fn lattice_coordinate(bounds: &[f64], nodes: &[f64; E], index: usize) -> f64 {
    let (cell, k) = (index / NPOL, index % NPOL);
    if k == 0 {
        return bounds[cell];
    }
    let (lo, hi) = (bounds[cell], bounds[cell + 1]);
    lo + (nodes[k] + 1.0) / 2.0 * (hi - lo)
}

impl Geometry {
    pub fn build(input: &GeometryInput<'_>) -> Result<Self, ConfigError> {
        let radii = input.model.radial_nodes().to_vec();
        let columns = input.model.theta_elements();
        if radii.len() < 2 {
            return Err(invalid("model has no radial element row".into()));
        }
        if columns == 0 {
            return Err(invalid("model has no colatitude element".into()));
        }
        if radii.iter().any(|r| !r.is_finite()) {
            return Err(invalid("radial nodes must be finite".into()));
        }
        if let Some(w) = radii.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "radial nodes must increase strictly, found {} then {}",
                w[0], w[1]
            )));
        }
        if radii[0] <= 0.0 {
            return Err(invalid(format!(
                "innermost radius {} must lie above the centre",
                radii[0]
            )));
        }
        input.partition.check(columns)?;

        let rows = radii.len() - 1;
        let width = NPOL * columns + 1;
        let lattice_len = (NPOL * rows + 1) * width;
        if lattice_len > NONE as usize {
            return Err(invalid(format!("{lattice_len} lattice points exceed the id range")));
        }

        let nodes = input.basis.nodes;
        let cap = input.polar_cap;
        let thetas: Vec<f64> = (0..=columns)
            .map(|j| cap + (std::f64::consts::PI - 2.0 * cap) * j as f64 / columns as f64)
            .collect();

        let mut row_kind = Vec::with_capacity(rows);
        for row in 0..rows {
            let mid = 0.5 * (radii[row] + radii[row + 1]);
            let fluid = input.model.material(row, mid).is_fluid();
            for a in 0..E {
                let r = lattice_coordinate(&radii, &nodes, row * NPOL + a);
                let m = input.model.material(row, r);
                if !m.is_valid() {
                    return Err(invalid(format!("invalid material in row {row} at r = {r}")));
                }
                if m.is_fluid() != fluid {
                    return Err(invalid(format!("row {row} mixes fluid and solid material")));
                }
            }
            row_kind.push(if fluid {
                ElementKind::Fluid
            } else {
                ElementKind::Solid
            });
        }

        let mut elements = Vec::with_capacity(rows * columns);
        let mut adjacency: Vec<SmallVec<[(u32, u8); 4]>> = vec![SmallVec::new(); lattice_len];
        for row in 0..rows {
            for col in 0..columns {
                let index = elements.len();
                let mut g = ElementGeometry {
                    id: ElementId(index as u32),
                    row,
                    kind: row_kind[row],
                    owner: input.partition.column_owner(col, columns),
                    nr: 1,
                    r_ref: [0.0; N],
                    polar: [[0.0; 2]; N],
                    coords: [[0.0; 2]; N],
                    lattice: [0; N],
                    weight: [0.0; N],
                };
                for a in 0..E {
                    let i = row * NPOL + a;
                    let r_ref = lattice_coordinate(&radii, &nodes, i);
                    for b in 0..E {
                        let j = col * NPOL + b;
                        let theta = lattice_coordinate(&thetas, &nodes, j);
                        let r = r_ref
                            + input.geometric.map_or(0.0, |topo| topo.radial_offset(r_ref, theta));
                        let p = a * E + b;
                        g.r_ref[p] = r_ref;
                        g.polar[p] = [r, theta];
                        g.coords[p] = [r * theta.sin(), r * theta.cos()];
                        g.lattice[p] = (i * width + j) as u32;
                        adjacency[i * width + j].push((index as u32, p as u8));
                    }
                }
                let op = GradientOperator::new(&input.basis.deriv, &g.coords);
                for p in 0..N {
                    let w = input.basis.weights[p / E] * input.basis.weights[p % E];
                    g.weight[p] = w * op.jacobian()[p].abs() * g.coords[p][0];
                }
                let mid_r = 0.5 * (radii[row] + radii[row + 1]);
                let mid_theta = 0.5 * (thetas[col] + thetas[col + 1]);
                g.nr = input.nr_field.nr(mid_r, mid_theta).max(1);
                elements.push(g);
            }
        }

        let mut geometry = Self {
            radii,
            thetas,
            rows,
            columns,
            row_kind,
            elements,
            adjacency,
            solid_nr: vec![0; lattice_len],
            fluid_nr: vec![0; lattice_len],
            solid_local: vec![NONE; lattice_len],
            fluid_local: vec![NONE; lattice_len],
            solid_points: Vec::new(),
            fluid_points: Vec::new(),
            rank: input.partition.rank(),
        };
        geometry.number_points();
        Ok(geometry)
    }

    /// Point ring sizes and the ascending local numbering of both kinds.
    fn number_points(&mut self) {
        for (l, adjacent) in self.adjacency.iter().enumerate() {
            let (mut solid_local, mut fluid_local) = (false, false);
            for &(e, _) in adjacent {
                let g = &self.elements[e as usize];
                let local = g.owner == self.rank;
                match g.kind {
                    ElementKind::Solid => {
                        self.solid_nr[l] = self.solid_nr[l].max(g.nr);
                        solid_local |= local;
                    }
                    ElementKind::Fluid => {
                        self.fluid_nr[l] = self.fluid_nr[l].max(g.nr);
                        fluid_local |= local;
                    }
                }
            }
            if solid_local {
                self.solid_local[l] = self.solid_points.len() as u32;
                self.solid_points.push(l as u32);
            }
            if fluid_local {
                self.fluid_local[l] = self.fluid_points.len() as u32;
                self.fluid_points.push(l as u32);
            }
        }
    }

    /// Elements owned by this worker, ascending id.
    pub fn local_elements(&self) -> impl Iterator<Item = &ElementGeometry> {
        self.elements.iter().filter(move |g| g.owner == self.rank)
    }

    /// Azimuthal orders carried by lattice point `l` of `kind`.
    pub fn point_orders(&self, l: u32, kind: ElementKind) -> usize {
        let nr = match kind {
            ElementKind::Solid => self.solid_nr[l as usize],
            ElementKind::Fluid => self.fluid_nr[l as usize],
        };
        max_order(nr.max(1)) + 1
    }

    /// Ring size of lattice point `l` of `kind`.
    pub fn point_nr(&self, l: u32, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Solid => self.solid_nr[l as usize],
            ElementKind::Fluid => self.fluid_nr[l as usize],
        }
    }

    /// Local index of lattice point `l` of `kind`, if this worker holds it.
    pub fn local_index(&self, l: u32, kind: ElementKind) -> Option<u32> {
        let idx = match kind {
            ElementKind::Solid => self.solid_local[l as usize],
            ElementKind::Fluid => self.fluid_local[l as usize],
        };
        (idx != NONE).then_some(idx)
    }

    /// Ranks owning an element of `kind` that touches lattice point `l`,
    /// ascending.
    pub fn holders(&self, l: u32, kind: ElementKind) -> SmallVec<[usize; 4]> {
        let mut ranks: SmallVec<[usize; 4]> = self.adjacency[l as usize]
            .iter()
            .map(|&(e, _)| &self.elements[e as usize])
            .filter(|g| g.kind == kind)
            .map(|g| g.owner)
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }

    /// Outer radius of the mesh.
    pub fn outer_radius(&self) -> f64 {
        self.radii[self.rows]
    }

    /// Element and reference coordinates `(ξ, η)` containing `(r, θ)`,
    /// or `None` outside the meshed region.
    pub fn containing(&self, r: f64, theta: f64) -> Option<(usize, f64, f64)> {
        let (r0, r1) = (self.radii[0], self.radii[self.rows]);
        let (t0, t1) = (self.thetas[0], self.thetas[self.columns]);
        if !(r >= r0 && r <= r1 && theta >= t0 && theta <= t1) {
            return None;
        }
        let row = self.radii.partition_point(|&x| x <= r).saturating_sub(1).min(self.rows - 1);
        let col = self
            .thetas
            .partition_point(|&x| x <= theta)
            .saturating_sub(1)
            .min(self.columns - 1);
        let xi = reference(r, self.radii[row], self.radii[row + 1]);
        let eta = reference(theta, self.thetas[col], self.thetas[col + 1]);
        Some((row * self.columns + col, xi, eta))
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.elements.len() * std::mem::size_of::<ElementGeometry>()
            + self.adjacency.len() * std::mem::size_of::<SmallVec<[(u32, u8); 4]>>()
            + self.solid_nr.len() * 2 * std::mem::size_of::<usize>()
            + self.solid_local.len() * 2 * 4
            + (self.solid_points.len() + self.fluid_points.len()) * 4
    }
}

fn reference(x: f64, lo: f64, hi: f64) -> f64 {
    (2.0 * (x - lo) / (hi - lo) - 1.0).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Layer, LayeredModel, UniformNrField};
    use ringsem_core::Material;

    fn rock() -> Material {
        Material {
            vp: 6000.0,
            vs: 3500.0,
            rho: 2700.0,
            q_kappa: 57823.0,
            q_mu: 600.0,
        }
    }

    fn water() -> Material {
        Material {
            vp: 1500.0,
            vs: 0.0,
            rho: 1000.0,
            q_kappa: 57823.0,
            q_mu: 0.0,
        }
    }

    fn build(model: &LayeredModel, partition: Partition) -> Result<Geometry, ConfigError> {
        let basis = GllBasis::new();
        Geometry::build(&GeometryInput {
            model,
            nr_field: &UniformNrField::new(4),
            geometric: None,
            basis: &basis,
            polar_cap: 0.1,
            partition,
        })
    }

    fn layered() -> LayeredModel {
        LayeredModel::new(
            "core-mantle",
            vec![
                Layer {
                    r_bottom: 1000.0,
                    r_top: 2000.0,
                    rows: 1,
                    material: water(),
                },
                Layer {
                    r_bottom: 2000.0,
                    r_top: 3000.0,
                    rows: 2,
                    material: rock(),
                },
            ],
            4,
        )
    }

    #[test]
    fn lattice_is_shared_between_neighbours() {
        let g = build(&layered(), Partition::solo()).unwrap();
        assert_eq!(g.elements.len(), 12);
        let (a, b) = (&g.elements[4], &g.elements[5]);
        for k in 0..E {
            let left = a.lattice[k * E + NPOL];
            let right = b.lattice[k * E];
            assert_eq!(left, right);
            assert_eq!(a.coords[k * E + NPOL], b.coords[k * E]);
        }
    }

    #[test]
    fn boundary_points_exist_in_both_kinds() {
        let g = build(&layered(), Partition::solo()).unwrap();
        // Row 0 is fluid, rows 1 and 2 are solid.
        let width = NPOL * 4 + 1;
        let boundary = (NPOL * width) as u32;
        assert!(g.local_index(boundary, ElementKind::Fluid).is_some());
        assert!(g.local_index(boundary, ElementKind::Solid).is_some());
        assert!(g.local_index(0, ElementKind::Solid).is_none());
        assert_eq!(g.fluid_points.len(), (NPOL + 1) * width);
        assert_eq!(g.solid_points.len(), (2 * NPOL + 1) * width);
        assert_eq!(g.point_orders(boundary, ElementKind::Solid), 2);
    }

    #[test]
    fn weights_integrate_meridional_volume() {
        let g = build(&LayeredModel::homogeneous(1.0, 2.0, 2, 6, rock()), Partition::solo()).unwrap();
        // Σ W = ∫ s ds dz over the band = ∫∫ r² sinθ dr dθ.
        let total: f64 = g.elements.iter().flat_map(|e| e.weight).sum();
        let cap: f64 = 0.1;
        let exact = (8.0 - 1.0) / 3.0 * 2.0 * cap.cos();
        assert!((total - exact).abs() < 1e-4 * exact, "{total} vs {exact}");
    }

    #[test]
    fn partition_numbers_only_local_points() {
        let model = layered();
        let g0 = build(&model, Partition::new(0, 2).unwrap()).unwrap();
        let g1 = build(&model, Partition::new(1, 2).unwrap()).unwrap();
        assert_eq!(g0.local_elements().count(), 6);
        assert_eq!(g1.local_elements().count(), 6);
        let shared: Vec<u32> = g0
            .solid_points
            .iter()
            .copied()
            .filter(|&l| g1.local_index(l, ElementKind::Solid).is_some())
            .collect();
        // One column of lattice points across the two solid rows.
        assert_eq!(shared.len(), 2 * NPOL + 1);
        for &l in &shared {
            assert_eq!(g0.holders(l, ElementKind::Solid).as_slice(), &[0, 1]);
        }
    }

    #[test]
    fn rejects_inconsistent_models() {
        let mut bad = LayeredModel::homogeneous(2.0, 1.0, 2, 3, rock());
        assert!(matches!(
            build(&bad, Partition::solo()),
            Err(ConfigError::InvalidModel { .. })
        ));
        bad = LayeredModel::homogeneous(1.0, 2.0, 0, 3, rock());
        assert!(matches!(
            build(&bad, Partition::solo()),
            Err(ConfigError::InvalidModel { .. })
        ));
        bad = LayeredModel::homogeneous(0.0, 2.0, 2, 3, rock());
        assert!(build(&bad, Partition::solo()).is_err());
        let model = LayeredModel::homogeneous(1.0, 2.0, 2, 3, rock());
        assert!(matches!(
            build(&model, Partition::new(0, 4).unwrap()),
            Err(ConfigError::InvalidPartition { .. })
        ));
    }

    #[test]
    fn containing_maps_to_reference_square() {
        let g = build(&LayeredModel::homogeneous(1.0, 2.0, 2, 3, rock()), Partition::solo()).unwrap();
        let (e, xi, eta) = g.containing(1.75, g.thetas[1]).unwrap();
        assert_eq!(e, 3 + 1);
        assert!((xi - 0.0).abs() < 1e-12);
        assert!((eta + 1.0).abs() < 1e-12);
        assert!(g.containing(2.5, 1.0).is_none());
        assert!(g.containing(1.5, 0.01).is_none());
        let (top, xi, _) = g.containing(2.0, 1.0).unwrap();
        assert!(top >= 3 && (xi - 1.0).abs() < 1e-12);
    }

    #[test]
    fn outward_normal_on_outer_edge() {
        let basis = GllBasis::new();
        let g = build(&LayeredModel::homogeneous(1.0, 2.0, 1, 3, rock()), Partition::solo()).unwrap();
        let e = &g.elements[1];
        let p = NPOL * E + 2;
        let n = e.edge_normal(&basis, p, 1.0);
        let theta = e.polar[p][1];
        let len = (n[0] * n[0] + n[1] * n[1]).sqrt();
        assert!((n[0] / len - theta.sin()).abs() < 1e-12);
        assert!((n[1] / len - theta.cos()).abs() < 1e-12);
    }
}
