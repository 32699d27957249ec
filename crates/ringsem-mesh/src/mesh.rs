//! The mesh of one worker and its build phases.
//!
//! ```text
//! Defined ──build_unweighted()──► Unweighted ──build_weighted(dt)──► Weighted ──release()──► Released
//! ```
//!
//! The unweighted build fixes geometry, topology, ring sizes and the
//! partition and yields the stable time step. The weighted build needs
//! the final `dt` (attenuation coefficients depend on it) and produces
//! the operators. Release moves them into a [`Domain`]; the mesh keeps
//! only what locating sources and receivers needs.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use ringsem_core::{
    ConfigError, ElementId, ExodusModel, Geometric3D, NrField, OceanLoad3D, PointId, SolverConfig,
    SolverError, Volumetric3D, NPOINTS_EDGE, NPOINTS_ELEM,
};
use ringsem_element::{Element, ElementKind, GllBasis};
use ringsem_engine::{Domain, MeshParts};

use crate::attenuation::{AttenuationBuilder, AttenuationTable};
use crate::diagnostics::{self, MeshReport};
use crate::geometry::{Geometry, GeometryInput};
use crate::locate::{ElementFrame, Located, Location};
use crate::partition::Partition;
use crate::weighted::{self, Providers};

const N: usize = NPOINTS_ELEM;
const E: usize = NPOINTS_EDGE;

/// Build phase of a [`Mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshPhase {
    /// Providers attached, nothing built.
    Defined,
    /// Geometry and topology built.
    Unweighted,
    /// Operators built for a fixed time step.
    Weighted,
    /// Operators moved into a domain.
    Released,
}

impl MeshPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Defined => "defined",
            Self::Unweighted => "unweighted",
            Self::Weighted => "weighted",
            Self::Released => "released",
        }
    }
}

/// Mesh of one partition worker.
pub struct Mesh {
    model: Arc<dyn ExodusModel>,
    nr_field: Arc<dyn NrField>,
    volumetric: Vec<Arc<dyn Volumetric3D>>,
    geometric: Option<Arc<dyn Geometric3D>>,
    ocean: Option<Arc<dyn OceanLoad3D>>,
    attenuation: Option<AttenuationBuilder>,
    table: Option<AttenuationTable>,
    source: Location,
    config: SolverConfig,
    partition: Partition,
    basis: GllBasis,
    phase: MeshPhase,
    geometry: Option<Geometry>,
    parts: Option<MeshParts>,
    dt: Option<f64>,
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("model", &self.model.name())
            .field("volumetric", &self.volumetric.iter().map(|v| v.name()).collect::<Vec<_>>())
            .field("geometric", &self.geometric.is_some())
            .field("ocean", &self.ocean.is_some())
            .field("attenuation", &self.attenuation)
            .field("partition", &self.partition)
            .field("phase", &self.phase)
            .field("dt", &self.dt)
            .finish_non_exhaustive()
    }
}

impl Mesh {
    /// A mesh over `model` for the worker at `partition`.
    ///
    /// `source` is only checked against the model here; the source
    /// itself is placed by its own release. Attenuation is enabled from
    /// `config.attenuation` unless replaced by
    /// [`set_att_builder`](Self::set_att_builder).
    pub fn new(
        model: Arc<dyn ExodusModel>,
        nr_field: Arc<dyn NrField>,
        source: Location,
        config: &SolverConfig,
        partition: Partition,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            model,
            nr_field,
            volumetric: Vec::new(),
            geometric: None,
            ocean: None,
            attenuation: config.attenuation.as_ref().map(AttenuationBuilder::new),
            table: None,
            source,
            config: config.clone(),
            partition,
            basis: GllBasis::new(),
            phase: MeshPhase::Defined,
            geometry: None,
            parts: None,
            dt: None,
        })
    }

    fn require(&self, phase: MeshPhase, operation: &'static str) -> Result<(), SolverError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SolverError::InvalidState {
                operation,
                state: self.phase.as_str(),
            })
        }
    }

    // ── Providers ──────────────────────────────────────────────────

    /// Add a volumetric 3-D model. Perturbations of several models add.
    pub fn set_volumetric_3d(&mut self, model: Arc<dyn Volumetric3D>) -> Result<(), SolverError> {
        self.require(MeshPhase::Defined, "add a volumetric model")?;
        self.volumetric.push(model);
        Ok(())
    }

    /// Set the boundary topography.
    pub fn set_geometric_3d(&mut self, model: Arc<dyn Geometric3D>) -> Result<(), SolverError> {
        self.require(MeshPhase::Defined, "set the topography")?;
        self.geometric = Some(model);
        Ok(())
    }

    /// Set the ocean load.
    pub fn set_ocean_load_3d(&mut self, model: Arc<dyn OceanLoad3D>) -> Result<(), SolverError> {
        self.require(MeshPhase::Defined, "set the ocean load")?;
        self.ocean = Some(model);
        Ok(())
    }

    /// Replace (or with `None` disable) the attenuation builder.
    pub fn set_att_builder(
        &mut self,
        builder: Option<AttenuationBuilder>,
    ) -> Result<(), SolverError> {
        if matches!(self.phase, MeshPhase::Weighted | MeshPhase::Released) {
            return Err(SolverError::InvalidState {
                operation: "set the attenuation builder",
                state: self.phase.as_str(),
            });
        }
        self.attenuation = builder;
        Ok(())
    }

    // ── Build ──────────────────────────────────────────────────────

    /// Build geometry and topology.
    pub fn build_unweighted(&mut self) -> Result<(), SolverError> {
        self.require(MeshPhase::Defined, "build the unweighted mesh")?;
        let radius = self.model.outer_radius();
        let inner = self.model.radial_nodes().first().copied().unwrap_or(radius);
        let depth = self.source.depth;
        if !(depth.is_finite() && depth >= 0.0 && depth <= radius - inner) {
            return Err(ConfigError::SourceOutsideModel { depth, radius }.into());
        }
        let geometry = Geometry::build(&GeometryInput {
            model: self.model.as_ref(),
            nr_field: self.nr_field.as_ref(),
            geometric: self.geometric.as_deref(),
            basis: &self.basis,
            polar_cap: self.config.polar_cap_deg.to_radians(),
            partition: self.partition,
        })?;
        let (t0, t1) = (geometry.thetas[0], geometry.thetas[geometry.columns]);
        if !(self.source.theta >= t0 && self.source.theta <= t1) {
            return Err(ConfigError::InvalidParameter {
                key: "SOURCE_COLATITUDE".into(),
                reason: format!(
                    "{} rad lies outside the meshed band [{t0}, {t1}]",
                    self.source.theta
                ),
            }
            .into());
        }
        debug!(
            rank = self.partition.rank(),
            rows = geometry.rows,
            columns = geometry.columns,
            local_elements = geometry.local_elements().count(),
            solid_points = geometry.solid_points.len(),
            fluid_points = geometry.fluid_points.len(),
            "unweighted mesh built"
        );
        self.geometry = Some(geometry);
        self.phase = MeshPhase::Unweighted;
        Ok(())
    }

    fn geometry(&self, operation: &'static str) -> Result<&Geometry, SolverError> {
        self.geometry.as_ref().ok_or(SolverError::InvalidState {
            operation,
            state: self.phase.as_str(),
        })
    }

    fn providers(&self) -> Providers<'_> {
        Providers {
            model: self.model.as_ref(),
            volumetric: &self.volumetric,
            ocean: self.ocean.as_deref(),
            attenuation: self.table.as_ref(),
            basis: &self.basis,
        }
    }

    /// Largest element ring size of this worker.
    pub fn get_max_nr(&self) -> Result<usize, SolverError> {
        let geometry = self.geometry("query the ring size")?;
        Ok(geometry.local_elements().map(|g| g.nr).max().unwrap_or(1))
    }

    /// Stable time step of this worker's elements.
    ///
    /// The run uses the minimum over all workers.
    pub fn get_delta_t(&self) -> Result<f64, SolverError> {
        let geometry = self.geometry("compute the stable time step")?;
        Ok(weighted::stable_dt(
            geometry,
            &self.providers(),
            self.config.courant,
        ))
    }

    /// Build the operators for time step `dt`.
    pub fn build_weighted(&mut self, dt: f64) -> Result<(), SolverError> {
        self.require(MeshPhase::Unweighted, "build the weighted mesh")?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidParameter {
                key: "TIME_DELTA_T".into(),
                reason: format!("must be finite and positive, got {dt}"),
            }
            .into());
        }
        self.table = match &self.attenuation {
            Some(builder) => Some(builder.build(dt)?),
            None => None,
        };
        let geometry = self.geometry("build the weighted mesh")?;
        let parts = weighted::build_parts(geometry, &self.providers())?;
        debug!(
            rank = self.partition.rank(),
            elements = parts.elements.len(),
            coupling = parts.coupling.len(),
            solid_shared = parts.solid_exchange.shared_points(),
            fluid_shared = parts.fluid_exchange.shared_points(),
            dt,
            "weighted mesh built"
        );
        self.parts = Some(parts);
        self.dt = Some(dt);
        self.phase = MeshPhase::Weighted;
        Ok(())
    }

    /// Check every element operator. Expensive; never run implicitly.
    pub fn test(&self) -> Result<MeshReport, SolverError> {
        self.require(MeshPhase::Weighted, "test the mesh")?;
        let geometry = self.geometry("test the mesh")?;
        let elements = self.parts.as_ref().map_or(&[][..], |p| &p.elements[..]);
        let report = diagnostics::check(geometry, &self.providers(), elements)?;
        if let Some(dt) = self.dt {
            if dt > report.dt_bound {
                info!(
                    rank = self.partition.rank(),
                    dt,
                    dt_bound = report.dt_bound,
                    "time step exceeds the element eigenvalue bound"
                );
            }
        }
        Ok(report)
    }

    /// Move the operators into `domain`.
    pub fn release(&mut self, domain: &mut Domain) -> Result<(), SolverError> {
        self.require(MeshPhase::Weighted, "release the mesh")?;
        let parts = self.parts.take().ok_or(SolverError::InvalidState {
            operation: "release the mesh",
            state: "empty",
        })?;
        domain.attach_mesh(parts)?;
        self.phase = MeshPhase::Released;
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Current phase.
    pub fn phase(&self) -> MeshPhase {
        self.phase
    }

    /// Number of elements held, zero once released.
    pub fn element_count(&self) -> usize {
        self.parts.as_ref().map_or(0, |p| p.elements.len())
    }

    /// The elements held before release.
    pub fn elements(&self) -> &[Element] {
        self.parts.as_ref().map_or(&[][..], |p| &p.elements[..])
    }

    /// Time step of the weighted build.
    pub fn dt(&self) -> Option<f64> {
        self.dt
    }

    /// This worker's partition.
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// The GLL basis of the elements.
    pub fn basis(&self) -> &GllBasis {
        &self.basis
    }

    /// Outer radius of the model.
    pub fn outer_radius(&self) -> f64 {
        self.model.outer_radius()
    }

    /// The model.
    pub fn model(&self) -> &dyn ExodusModel {
        self.model.as_ref()
    }

    /// Location of the source the mesh was defined for.
    pub fn source_location(&self) -> Location {
        self.source
    }

    /// Element containing `(r, θ)` and the GLL point nearest to it.
    pub fn locate(&self, r: f64, theta: f64) -> Result<Located, SolverError> {
        let geometry = self.geometry("locate a point")?;
        let Some((index, xi, eta)) = geometry.containing(r, theta) else {
            let radius = geometry.outer_radius();
            if r >= geometry.radii[0] && r <= radius {
                return Err(ConfigError::InvalidParameter {
                    key: "COLATITUDE".into(),
                    reason: format!("{theta} rad lies outside the meshed band"),
                }
                .into());
            }
            return Err(ConfigError::SourceOutsideModel {
                depth: radius - r,
                radius,
            }
            .into());
        };
        let g = &geometry.elements[index];
        let nearest = |x: f64| {
            let mut best = 0;
            for (k, node) in self.basis.nodes.iter().enumerate() {
                if (node - x).abs() < (self.basis.nodes[best] - x).abs() {
                    best = k;
                }
            }
            best
        };
        let p = nearest(xi) * E + nearest(eta);
        Ok(Located {
            element: g.id,
            kind: g.kind,
            owner: g.owner,
            xi,
            eta,
            point: PointId(g.lattice[p]),
            point_polar: g.polar[p],
        })
    }

    /// Geometry and local numbering of element `id`.
    pub fn frame(&self, id: ElementId) -> Result<ElementFrame, SolverError> {
        let geometry = self.geometry("describe an element")?;
        let g = geometry
            .elements
            .get(id.0 as usize)
            .ok_or(ConfigError::InvalidModel {
                reason: format!("element {id} does not exist"),
            })?;
        let local: [Option<u32>; N] =
            std::array::from_fn(|p| geometry.local_index(g.lattice[p], g.kind));
        let orders: [usize; N] =
            std::array::from_fn(|p| geometry.point_orders(g.lattice[p], g.kind));
        Ok(ElementFrame {
            id: g.id,
            kind: g.kind,
            nr: g.nr,
            owner: g.owner,
            coords: g.coords,
            polar: g.polar,
            local,
            orders,
        })
    }

    /// Local index and carried orders of lattice point `point` of
    /// `kind`, if this worker holds it.
    pub fn local_point(&self, point: PointId, kind: ElementKind) -> Option<(u32, usize)> {
        let geometry = self.geometry.as_ref()?;
        let local = geometry.local_index(point.0, kind)?;
        Some((local, geometry.point_orders(point.0, kind)))
    }

    /// Ranks holding lattice point `point` of `kind`, ascending.
    pub fn holders(&self, point: PointId, kind: ElementKind) -> Vec<usize> {
        self.geometry
            .as_ref()
            .map(|g| g.holders(point.0, kind).to_vec())
            .unwrap_or_default()
    }

    /// Multi-line summary.
    pub fn verbose(&self) -> String {
        let mut out = format!(
            "mesh '{}' on worker {}/{} ({})\n",
            self.model.name(),
            self.partition.rank(),
            self.partition.size(),
            self.phase.as_str()
        );
        if let Some(g) = &self.geometry {
            let _ = writeln!(
                out,
                "  grid {} x {} elements, {} local\n  points: {} solid, {} fluid local",
                g.rows,
                g.columns,
                g.local_elements().count(),
                g.solid_points.len(),
                g.fluid_points.len()
            );
            let _ = writeln!(out, "  geometry memory {} bytes", g.memory_bytes());
        }
        let names: Vec<&str> = self.volumetric.iter().map(|v| v.name()).collect();
        let _ = writeln!(
            out,
            "  3-D: volumetric [{}], topography {}, ocean {}",
            names.join(", "),
            if self.geometric.is_some() { "on" } else { "off" },
            if self.ocean.is_some() { "on" } else { "off" }
        );
        match &self.table {
            Some(t) => {
                let _ = writeln!(out, "  attenuation: {} SLS", t.coefficients().len());
            }
            None => out.push_str("  attenuation: off\n"),
        }
        out
    }
}
