//! Time-step dependent operator construction.
//!
//! Turns the geometry of one worker into the parts its domain runs on:
//! elements with their gradient tables and weighted moduli, point
//! masses, the solid–fluid coupling of the local boundary edges and the
//! exchange plans of the shared points.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use ringsem_arena::FieldLayout;
use ringsem_core::spectral::max_order;
use ringsem_core::{
    ExodusModel, Material, NumericalError, OceanLoad3D, Perturbation, PointId, SolverError,
    Volumetric3D, NPOINTS_EDGE, NPOINTS_ELEM, NPOL,
};
use ringsem_element::{
    AttenuationMemory, Element, ElementKind, FluidElement, FluidMaterial, GllBasis,
    GradientOperator, SolidElement, SolidMaterial,
};
use ringsem_engine::{Coupling, CouplingPoint, ExchangePlan, MeshParts, PointMass};

use crate::attenuation::AttenuationTable;
use crate::geometry::{ElementGeometry, Geometry};

const N: usize = NPOINTS_ELEM;
const E: usize = NPOINTS_EDGE;

/// Material sources of the weighted build.
pub(crate) struct Providers<'a> {
    pub model: &'a dyn ExodusModel,
    pub volumetric: &'a [Arc<dyn Volumetric3D>],
    pub ocean: Option<&'a dyn OceanLoad3D>,
    pub attenuation: Option<&'a AttenuationTable>,
    pub basis: &'a GllBasis,
}

impl Providers<'_> {
    /// Reference material of point `p`.
    pub fn reference(&self, g: &ElementGeometry, p: usize) -> Material {
        self.model.material(g.row, g.r_ref[p])
    }

    /// Material of point `p` at azimuth `phi`.
    pub fn material(&self, g: &ElementGeometry, p: usize, phi: f64) -> Material {
        let m = self.reference(g, p);
        if self.volumetric.is_empty() {
            return m;
        }
        let [r, theta] = g.polar[p];
        let total = self
            .volumetric
            .iter()
            .map(|v| v.perturbation(r, theta, phi))
            .fold(Perturbation::default(), |acc, d| Perturbation {
                dvp: acc.dvp + d.dvp,
                dvs: acc.dvs + d.dvs,
                drho: acc.drho + d.drho,
            });
        total.apply(&m)
    }

    /// Materials of the element on its ring at `[k * N + p]`, or `None`
    /// when no 3-D model changes it.
    fn ring_materials(&self, g: &ElementGeometry) -> Option<Vec<Material>> {
        if self.volumetric.is_empty() {
            return None;
        }
        let mut ring = Vec::with_capacity(g.nr * N);
        let mut varies = false;
        for k in 0..g.nr {
            let phi = azimuth(k, g.nr);
            for p in 0..N {
                let m = self.material(g, p, phi);
                varies |= m != self.reference(g, p);
                ring.push(m);
            }
        }
        varies.then_some(ring)
    }

    /// Quality factor of point `p` if it attenuates.
    fn quality(&self, g: &ElementGeometry, p: usize) -> Option<(f64, &AttenuationTable)> {
        let table = self.attenuation?;
        let q = self.reference(g, p).q_mu;
        (q.is_finite() && q > 0.0).then_some((q, table))
    }
}

/// Azimuth of sample `k` on a ring of `nr`.
pub(crate) fn azimuth(k: usize, nr: usize) -> f64 {
    2.0 * PI * k as f64 / nr as f64
}

// ── Elements ───────────────────────────────────────────────────────

fn build_element(
    geom: &Geometry,
    g: &ElementGeometry,
    prov: &Providers<'_>,
) -> Result<Element, NumericalError> {
    let local = |l: u32| geom.local_index(l, g.kind).unwrap_or(0);
    let points: [u32; N] = std::array::from_fn(|p| local(g.lattice[p]));
    let gradient = GradientOperator::new(&prov.basis.deriv, &g.coords);
    if !gradient.is_finite() {
        return Err(NumericalError::NonFiniteOperator {
            element: g.id,
            what: "gradient",
        });
    }
    let ring = prov.ring_materials(g);
    let element = match g.kind {
        ElementKind::Solid => {
            let unrelaxed = |p: usize, m: &Material| {
                let ratio = prov.quality(g, p).map_or(1.0, |(q, t)| t.modulus_ratio(q));
                let mu = m.mu() * ratio;
                [(m.kappa() - 2.0 / 3.0 * mu) * g.weight[p], mu * g.weight[p]]
            };
            let material = match &ring {
                None => {
                    let (mut lambda, mut mu) = ([0.0; N], [0.0; N]);
                    for p in 0..N {
                        [lambda[p], mu[p]] = unrelaxed(p, &prov.reference(g, p));
                    }
                    SolidMaterial::Axisymmetric { lambda, mu }
                }
                Some(ring) => {
                    let (mut lambda, mut mu) = (vec![0.0; ring.len()], vec![0.0; ring.len()]);
                    for (i, m) in ring.iter().enumerate() {
                        [lambda[i], mu[i]] = unrelaxed(i % N, m);
                    }
                    SolidMaterial::Ring {
                        nr: g.nr,
                        lambda,
                        mu,
                    }
                }
            };
            let attenuation = attenuation_memory(g, prov);
            if !material.is_finite() {
                return Err(NumericalError::NonFiniteOperator {
                    element: g.id,
                    what: "material",
                });
            }
            Element::Solid(SolidElement::new(
                g.id,
                g.nr,
                points,
                gradient,
                material,
                attenuation,
            ))
        }
        ElementKind::Fluid => {
            let material = match &ring {
                None => FluidMaterial::Axisymmetric {
                    inv_rho: std::array::from_fn(|p| g.weight[p] / prov.reference(g, p).rho),
                },
                Some(ring) => FluidMaterial::Ring {
                    nr: g.nr,
                    inv_rho: ring
                        .iter()
                        .enumerate()
                        .map(|(i, m)| g.weight[i % N] / m.rho)
                        .collect(),
                },
            };
            if !material.is_finite() {
                return Err(NumericalError::NonFiniteOperator {
                    element: g.id,
                    what: "material",
                });
            }
            Element::Fluid(FluidElement::new(g.id, g.nr, points, gradient, material))
        }
    };
    Ok(element)
}

/// Memory variables of a solid element, `None` if no point attenuates.
///
/// The strengths use the reference shear modulus of each point.
fn attenuation_memory(g: &ElementGeometry, prov: &Providers<'_>) -> Option<AttenuationMemory> {
    let table = prov.attenuation?;
    let n_sls = table.coefficients().len();
    let mut weights = vec![0.0; n_sls * N];
    let mut any = false;
    for p in 0..N {
        let Some((q, _)) = prov.quality(g, p) else {
            continue;
        };
        any = true;
        let mu_w = prov.reference(g, p).mu() * g.weight[p];
        for l in 0..n_sls {
            weights[l * N + p] = 2.0 * table.strength(l, q) * mu_w;
        }
    }
    any.then(|| {
        AttenuationMemory::new(
            table.coefficients().to_vec(),
            weights,
            max_order(g.nr) + 1,
        )
    })
}

// ── Masses ─────────────────────────────────────────────────────────

fn check_mass(l: u32, ring: &[f64]) -> Result<(), NumericalError> {
    match ring.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
        Some(&value) => Err(NumericalError::NonPositiveMass {
            point: PointId(l),
            value,
        }),
        None => Ok(()),
    }
}

/// Mass of lattice point `l` of `kind`, summed over every adjacent
/// element in ascending id so all holders agree bit for bit.
fn point_mass(
    geom: &Geometry,
    prov: &Providers<'_>,
    l: u32,
    kind: ElementKind,
) -> Result<PointMass, NumericalError> {
    let nr = if prov.volumetric.is_empty() {
        1
    } else {
        geom.point_nr(l, kind).max(1)
    };
    let mut mass = vec![0.0; nr];
    for &(e, p) in &geom.adjacency[l as usize] {
        let g = &geom.elements[e as usize];
        if g.kind != kind {
            continue;
        }
        let p = p as usize;
        for (k, mk) in mass.iter_mut().enumerate() {
            let m = prov.material(g, p, azimuth(k, nr));
            let density = match kind {
                ElementKind::Solid => m.rho,
                ElementKind::Fluid => 1.0 / m.kappa(),
            };
            *mk += g.weight[p] * density;
        }
    }
    check_mass(l, &mass)?;

    if kind == ElementKind::Solid {
        if let Some(ocean) = prov.ocean {
            if let Some(loaded) = ocean_mass(geom, prov, ocean, l, &mass) {
                return Ok(loaded);
            }
        }
    }
    Ok(PointMass::from_ring(&mass))
}

/// Ocean-loaded mass of a solid surface point, `None` where the point
/// is not on the surface or carries no water.
fn ocean_mass(
    geom: &Geometry,
    prov: &Providers<'_>,
    ocean: &dyn OceanLoad3D,
    l: u32,
    mass: &[f64],
) -> Option<PointMass> {
    let width = NPOL * geom.columns + 1;
    if l as usize / width != NPOL * geom.rows {
        return None;
    }
    let mut area_normal = [0.0; 2];
    let mut theta = 0.0;
    for &(e, p) in &geom.adjacency[l as usize] {
        let g = &geom.elements[e as usize];
        if g.kind != ElementKind::Solid {
            continue;
        }
        let n = g.edge_normal(prov.basis, p as usize, 1.0);
        area_normal[0] += n[0];
        area_normal[1] += n[1];
        theta = g.polar[p as usize][1];
    }
    let area = (area_normal[0] * area_normal[0] + area_normal[1] * area_normal[1]).sqrt();
    if area == 0.0 {
        return None;
    }
    let nr = geom.point_nr(l, ElementKind::Solid).max(1);
    let water: Vec<f64> = (0..nr)
        .map(|k| {
            let h = ocean.water_column(theta, azimuth(k, nr)).max(0.0);
            ocean.water_density() * h * area
        })
        .collect();
    if water.iter().all(|&w| w == 0.0) {
        return None;
    }
    let solid: Vec<f64> = if mass.len() == nr {
        mass.to_vec()
    } else {
        vec![mass[0]; nr]
    };
    let normal = [area_normal[0] / area, area_normal[1] / area];
    Some(PointMass::ocean_from_ring(&solid, &water, normal))
}

// ── Coupling and exchange ──────────────────────────────────────────

fn coupling(geom: &Geometry, basis: &GllBasis) -> Coupling {
    let mut normals: BTreeMap<u32, [f64; 2]> = BTreeMap::new();
    let is_fluid = |row: usize| geom.row_kind.get(row) == Some(&ElementKind::Fluid);
    for g in geom.local_elements() {
        if g.kind != ElementKind::Solid {
            continue;
        }
        let mut edges = Vec::with_capacity(2);
        if g.row > 0 && is_fluid(g.row - 1) {
            edges.push((0, 1.0));
        }
        if is_fluid(g.row + 1) {
            edges.push((NPOL, -1.0));
        }
        for (a, sign) in edges {
            for b in 0..E {
                let p = a * E + b;
                let n = g.edge_normal(basis, p, sign);
                let acc = normals.entry(g.lattice[p]).or_insert([0.0; 2]);
                acc[0] += n[0];
                acc[1] += n[1];
            }
        }
    }
    let points = normals
        .into_iter()
        .filter_map(|(l, area_normal)| {
            Some(CouplingPoint {
                solid: geom.local_index(l, ElementKind::Solid)?,
                fluid: geom.local_index(l, ElementKind::Fluid)?,
                area_normal,
            })
        })
        .collect();
    Coupling::new(points)
}

fn exchange(geom: &Geometry, kind: ElementKind, layout: &FieldLayout) -> ExchangePlan {
    let points = match kind {
        ElementKind::Solid => &geom.solid_points,
        ElementKind::Fluid => &geom.fluid_points,
    };
    let shared: Vec<(u32, u32, Vec<usize>)> = points
        .iter()
        .enumerate()
        .filter_map(|(local, &l)| {
            let holders = geom.holders(l, kind);
            (holders.len() > 1).then(|| (local as u32, l, holders.to_vec()))
        })
        .collect();
    ExchangePlan::new(geom.rank, &shared, |local| layout.range(local as usize).len())
}

/// Everything the domain of this worker runs on.
pub(crate) fn build_parts(geom: &Geometry, prov: &Providers<'_>) -> Result<MeshParts, SolverError> {
    let elements = geom
        .local_elements()
        .map(|g| build_element(geom, g, prov))
        .collect::<Result<Vec<_>, _>>()?;

    let layout = |kind: ElementKind, dof: usize, points: &[u32]| {
        FieldLayout::new(
            dof,
            points.iter().map(|&l| geom.point_orders(l, kind)).collect(),
        )
    };
    let solid_layout = layout(ElementKind::Solid, 3, &geom.solid_points);
    let fluid_layout = layout(ElementKind::Fluid, 1, &geom.fluid_points);

    let solid_masses = geom
        .solid_points
        .iter()
        .map(|&l| point_mass(geom, prov, l, ElementKind::Solid))
        .collect::<Result<Vec<_>, _>>()?;
    let fluid_masses = geom
        .fluid_points
        .iter()
        .map(|&l| point_mass(geom, prov, l, ElementKind::Fluid))
        .collect::<Result<Vec<_>, _>>()?;

    let solid_exchange = exchange(geom, ElementKind::Solid, &solid_layout);
    let fluid_exchange = exchange(geom, ElementKind::Fluid, &fluid_layout);
    Ok(MeshParts {
        elements,
        coupling: coupling(geom, prov.basis),
        solid_global: geom.solid_points.clone(),
        fluid_global: geom.fluid_points.clone(),
        solid_layout,
        fluid_layout,
        solid_masses,
        fluid_masses,
        solid_exchange,
        fluid_exchange,
    })
}

// ── Stable time step ───────────────────────────────────────────────

/// Smallest `courant · h / vp` over the local elements, where `h` is the
/// shortest GLL spacing or azimuthal sample spacing of the element.
pub(crate) fn stable_dt(geom: &Geometry, prov: &Providers<'_>, courant: f64) -> f64 {
    let mut dt = f64::INFINITY;
    for g in geom.local_elements() {
        let mut h = f64::INFINITY;
        for a in 0..E {
            for b in 0..E {
                let p = a * E + b;
                let [s, z] = g.coords[p];
                if a + 1 < E {
                    let [s1, z1] = g.coords[p + E];
                    h = h.min((s1 - s).hypot(z1 - z));
                }
                if b + 1 < E {
                    let [s1, z1] = g.coords[p + 1];
                    h = h.min((s1 - s).hypot(z1 - z));
                }
                h = h.min(2.0 * PI * s / g.nr as f64);
            }
        }
        let vp_max = match prov.ring_materials(g) {
            Some(ring) => ring.iter().map(|m| m.vp).fold(0.0, f64::max),
            None => (0..N).map(|p| prov.reference(g, p).vp).fold(0.0, f64::max),
        };
        dt = dt.min(courant * h / vp_max);
    }
    dt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryInput;
    use crate::models::{Layer, LayeredModel, UniformNrField};
    use crate::partition::Partition;

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

    fn model() -> LayeredModel {
        LayeredModel::new(
            "sandwich",
            vec![
                Layer {
                    r_bottom: 1000e3,
                    r_top: 1500e3,
                    rows: 1,
                    material: rock(),
                },
                Layer {
                    r_bottom: 1500e3,
                    r_top: 2000e3,
                    rows: 1,
                    material: water(),
                },
                Layer {
                    r_bottom: 2000e3,
                    r_top: 2500e3,
                    rows: 1,
                    material: rock(),
                },
            ],
            4,
        )
    }

    fn geometry(model: &LayeredModel, partition: Partition) -> Geometry {
        let basis = GllBasis::new();
        Geometry::build(&GeometryInput {
            model,
            nr_field: &UniformNrField::new(3),
            geometric: None,
            basis: &basis,
            polar_cap: 0.1,
            partition,
        })
        .unwrap()
    }

    struct Blob;

    impl Volumetric3D for Blob {
        fn perturbation(&self, _r: f64, _theta: f64, phi: f64) -> Perturbation {
            Perturbation {
                dvp: 0.0,
                dvs: 0.0,
                drho: 0.1 * phi.cos(),
            }
        }

        fn name(&self) -> &str {
            "blob"
        }
    }

    #[test]
    fn coupling_on_both_interfaces() {
        let model = model();
        let geom = geometry(&model, Partition::solo());
        let basis = GllBasis::new();
        let c = coupling(&geom, &basis);
        let width = NPOL * 4 + 1;
        assert_eq!(c.len(), 2 * width);
        // Inner interface: solid below the fluid, normal points inward.
        let inner = c.points().first().unwrap();
        let outer = c.points().last().unwrap();
        assert!(inner.area_normal[0] < 0.0 || inner.area_normal[1] < 0.0);
        assert!(outer.area_normal[0] > 0.0 || outer.area_normal[1] > 0.0);
    }

    #[test]
    fn parts_have_consistent_sizes() {
        let model = model();
        let geom = geometry(&model, Partition::solo());
        let basis = GllBasis::new();
        let prov = Providers {
            model: &model,
            volumetric: &[],
            ocean: None,
            attenuation: None,
            basis: &basis,
        };
        let parts = build_parts(&geom, &prov).unwrap();
        assert_eq!(parts.elements.len(), 12);
        assert_eq!(parts.solid_layout.len(), parts.solid_masses.len());
        assert_eq!(parts.fluid_layout.len(), parts.fluid_masses.len());
        assert!(parts.solid_exchange.is_empty());
        assert!(parts
            .solid_masses
            .iter()
            .all(|m| matches!(m, PointMass::OneD { inv_mass } if *inv_mass > 0.0)));
    }

    #[test]
    fn volumetric_model_yields_ring_masses() {
        let model = model();
        let geom = geometry(&model, Partition::solo());
        let basis = GllBasis::new();
        let volumetric: Vec<Arc<dyn Volumetric3D>> = vec![Arc::new(Blob)];
        let prov = Providers {
            model: &model,
            volumetric: &volumetric,
            ocean: None,
            attenuation: None,
            basis: &basis,
        };
        let parts = build_parts(&geom, &prov).unwrap();
        assert!(parts
            .solid_masses
            .iter()
            .all(|m| matches!(m, PointMass::ThreeD { nr: 3, .. })));
        assert!(parts.elements.iter().all(|e| e.is_ring()));
    }

    #[test]
    fn partitions_agree_on_shared_masses() {
        let model = model();
        let basis = GllBasis::new();
        let prov = Providers {
            model: &model,
            volumetric: &[],
            ocean: None,
            attenuation: None,
            basis: &basis,
        };
        let g0 = geometry(&model, Partition::new(0, 2).unwrap());
        let g1 = geometry(&model, Partition::new(1, 2).unwrap());
        let p0 = build_parts(&g0, &prov).unwrap();
        let p1 = build_parts(&g1, &prov).unwrap();
        assert!(!p0.solid_exchange.is_empty());
        for (i, l) in p0.solid_global.iter().enumerate() {
            if let Some(j) = p1.solid_global.iter().position(|x| x == l) {
                assert_eq!(p0.solid_masses[i], p1.solid_masses[j]);
            }
        }
    }

    #[test]
    fn stable_dt_scales_with_courant() {
        let model = model();
        let geom = geometry(&model, Partition::solo());
        let basis = GllBasis::new();
        let prov = Providers {
            model: &model,
            volumetric: &[],
            ocean: None,
            attenuation: None,
            basis: &basis,
        };
        let a = stable_dt(&geom, &prov, 0.25);
        let b = stable_dt(&geom, &prov, 0.5);
        assert!(a > 0.0 && a.is_finite());
        assert!((b - 2.0 * a).abs() < 1e-12 * b);
    }
}
