//! The runtime domain of one worker.
//!
//! A [`Domain`] is filled once by the preloop: the mesh releases its
//! elements, point masses, coupling and exchange plans, the source and
//! the source time function add their injection terms, the receivers
//! add their taps. After [`initialize`](Domain::initialize) sizes the
//! transforms and workspaces, only the kinematic state changes.
//!
//! # Step order
//!
//! [`update`](Domain::update) computes the acceleration of one step:
//!
//! 1. zero the force fields,
//! 2. element stiffness,
//! 3. solid-to-fluid coupling from the solid displacement,
//! 4. fluid boundary exchange,
//! 5. fluid acceleration,
//! 6. fluid-to-solid coupling from the fluid acceleration,
//! 7. source injection,
//! 8. solid boundary exchange,
//! 9. solid acceleration,
//! 10. receiver taps.

use std::fmt::Write as _;

use ringsem_arena::{FieldLayout, KinematicState};
use ringsem_core::{ResourceInitializationError, SolverError};
use ringsem_element::{Element, ElementKind, Workspaces};
use ringsem_fourier::{TransformContext, TransformProvider};
use tracing::debug;

use crate::comm::Communicator;
use crate::coupling::Coupling;
use crate::exchange::ExchangePlan;
use crate::mass::{PointMass, PointMasses};
use crate::source::SourceTerm;
use crate::tap::ReceiverTap;

/// Everything the mesh hands over on release.
#[derive(Debug)]
pub struct MeshParts {
    /// Local elements, in ascending id order.
    pub elements: Vec<Element>,
    /// Coefficient layout of the local solid points.
    pub solid_layout: FieldLayout,
    /// Coefficient layout of the local fluid points.
    pub fluid_layout: FieldLayout,
    /// Global id of every local solid point.
    pub solid_global: Vec<u32>,
    /// Global id of every local fluid point.
    pub fluid_global: Vec<u32>,
    /// Mass of every local solid point.
    pub solid_masses: Vec<PointMass>,
    /// Mass of every local fluid point.
    pub fluid_masses: Vec<PointMass>,
    /// Solid–fluid boundary terms of the local edges.
    pub coupling: Coupling,
    /// Shared solid points.
    pub solid_exchange: ExchangePlan,
    /// Shared fluid points.
    pub fluid_exchange: ExchangePlan,
}

/// Sampled source time function.
#[derive(Clone, Debug, Default, PartialEq)]
struct Stf {
    samples: Vec<f64>,
    dt: f64,
    shift: f64,
}

/// Runtime state container of one worker.
#[derive(Debug)]
pub struct Domain {
    comm: Communicator,
    transforms: TransformContext,
    workspaces: Workspaces,
    elements: Vec<Element>,
    solid: KinematicState,
    fluid: KinematicState,
    solid_global: Vec<u32>,
    fluid_global: Vec<u32>,
    solid_mass: PointMasses,
    fluid_mass: PointMasses,
    coupling: Coupling,
    solid_exchange: ExchangePlan,
    fluid_exchange: ExchangePlan,
    sources: Vec<SourceTerm>,
    stf: Stf,
    taps: Vec<ReceiverTap>,
    attached: bool,
}

impl Domain {
    /// An empty domain for the worker behind `comm`.
    ///
    /// `transforms` is the (uninitialized) transform context this
    /// worker will use.
    pub fn new(comm: Communicator, transforms: TransformContext) -> Self {
        Self {
            comm,
            transforms,
            workspaces: Workspaces::new(),
            elements: Vec::new(),
            solid: KinematicState::new(FieldLayout::new(3, Vec::new())),
            fluid: KinematicState::new(FieldLayout::new(1, Vec::new())),
            solid_global: Vec::new(),
            fluid_global: Vec::new(),
            solid_mass: PointMasses::new(3, Vec::new()),
            fluid_mass: PointMasses::new(1, Vec::new()),
            coupling: Coupling::default(),
            solid_exchange: ExchangePlan::empty(),
            fluid_exchange: ExchangePlan::empty(),
            sources: Vec::new(),
            stf: Stf::default(),
            taps: Vec::new(),
            attached: false,
        }
    }

    // ── Release targets ────────────────────────────────────────────

    /// Take ownership of the mesh contents. Allowed once.
    pub fn attach_mesh(&mut self, parts: MeshParts) -> Result<(), SolverError> {
        if self.attached {
            return Err(SolverError::InvalidState {
                operation: "attach a mesh",
                state: "mesh already attached",
            });
        }
        self.elements = parts.elements;
        self.solid = KinematicState::new(parts.solid_layout);
        self.fluid = KinematicState::new(parts.fluid_layout);
        self.solid_global = parts.solid_global;
        self.fluid_global = parts.fluid_global;
        self.solid_mass = PointMasses::new(3, parts.solid_masses);
        self.fluid_mass = PointMasses::new(1, parts.fluid_masses);
        self.coupling = parts.coupling;
        self.solid_exchange = parts.solid_exchange;
        self.fluid_exchange = parts.fluid_exchange;
        self.attached = true;
        Ok(())
    }

    /// Add a source injection term.
    pub fn add_source(&mut self, term: SourceTerm) {
        self.sources.push(term);
    }

    /// Install the sampled source time function.
    pub fn set_stf(&mut self, samples: Vec<f64>, dt: f64, shift: f64) {
        self.stf = Stf { samples, dt, shift };
    }

    /// Add a receiver tap.
    pub fn add_tap(&mut self, tap: ReceiverTap) {
        self.taps.push(tap);
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Plan transforms and size the workspaces for the largest ring of
    /// any element or point.
    pub fn initialize(&mut self) -> Result<(), ResourceInitializationError> {
        let max_nr = self
            .elements
            .iter()
            .map(Element::nr)
            .chain([self.solid_mass.max_nr(), self.fluid_mass.max_nr()])
            .max()
            .unwrap_or(1)
            .max(1);
        self.transforms.initialize(max_nr)?;
        self.workspaces.init_workspace(max_nr / 2)?;
        debug!(
            rank = self.comm.rank(),
            max_nr,
            workspace_bytes = self.workspaces.memory_bytes(),
            "domain initialized"
        );
        Ok(())
    }

    /// Whether the transforms are live.
    pub fn is_initialized(&self) -> bool {
        self.transforms.provider().is_ok()
    }

    /// Release the transforms, persisting the plan cache if configured.
    pub fn finalize(&mut self) -> Result<(), ResourceInitializationError> {
        self.transforms.finalize()
    }

    // ── Time step ──────────────────────────────────────────────────

    /// Compute the acceleration of step `step` from the current
    /// displacement.
    ///
    /// Step `step` sits at time `step * dt - shift`, see
    /// [`step_time`](Self::step_time). The source is driven by the source
    /// time function sample of that step, and is silent past its end.
    pub fn update(&mut self, step: usize) -> Result<(), SolverError> {
        self.solid.zero_force();
        self.fluid.zero_force();
        let tf = self.transforms.provider()?;

        for element in &mut self.elements {
            element.update(&mut self.workspaces, tf, &mut self.solid, &mut self.fluid)?;
        }

        self.coupling.solid_to_fluid(&self.solid, &mut self.fluid);
        self.fluid_exchange.assemble(&self.comm, &mut self.fluid)?;
        self.fluid_mass.accelerate(tf, &mut self.fluid)?;
        self.coupling.fluid_to_solid(&self.fluid, &mut self.solid);

        let amplitude = self.stf.samples.get(step).copied().unwrap_or(0.0);
        for source in &self.sources {
            source.inject(amplitude, &mut self.solid);
        }
        self.solid_exchange.assemble(&self.comm, &mut self.solid)?;
        self.solid_mass.accelerate(tf, &mut self.solid)?;

        for tap in &mut self.taps {
            tap.record(step, &self.solid);
        }
        Ok(())
    }

    /// Largest local displacement (or potential) magnitude; infinity if
    /// any value is not finite.
    pub fn stability_norm(&self) -> f64 {
        self.solid
            .max_displacement()
            .max(self.fluid.max_displacement())
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The worker's communicator.
    pub fn comm(&self) -> &Communicator {
        &self.comm
    }

    /// Local elements.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of local elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Solid kinematic state.
    pub fn solid(&self) -> &KinematicState {
        &self.solid
    }

    /// Fluid kinematic state.
    pub fn fluid(&self) -> &KinematicState {
        &self.fluid
    }

    pub(crate) fn states_mut(&mut self) -> (&mut KinematicState, &mut KinematicState) {
        (&mut self.solid, &mut self.fluid)
    }

    /// Global ids of the local solid points.
    pub fn solid_global_ids(&self) -> &[u32] {
        &self.solid_global
    }

    /// Global ids of the local fluid points.
    pub fn fluid_global_ids(&self) -> &[u32] {
        &self.fluid_global
    }

    /// Solid–fluid coupling.
    pub fn coupling(&self) -> &Coupling {
        &self.coupling
    }

    /// Source injection terms.
    pub fn sources(&self) -> &[SourceTerm] {
        &self.sources
    }

    /// Receiver taps.
    pub fn taps(&self) -> &[ReceiverTap] {
        &self.taps
    }

    /// Source time function samples.
    pub fn stf(&self) -> &[f64] {
        &self.stf.samples
    }

    /// Time step the source time function was sampled at.
    pub fn dt(&self) -> f64 {
        self.stf.dt
    }

    /// Time between the first sample and the origin.
    pub fn shift(&self) -> f64 {
        self.stf.shift
    }

    /// Time of step `step` relative to the origin, `step * dt - shift`.
    pub fn step_time(&self, step: usize) -> f64 {
        step as f64 * self.stf.dt - self.stf.shift
    }

    /// Number of time steps of the run.
    pub fn nsteps(&self) -> usize {
        self.stf.samples.len()
    }

    /// Estimated memory held by this domain in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.elements.iter().map(Element::memory_bytes).sum::<usize>()
            + self.solid.memory_bytes()
            + self.fluid.memory_bytes()
            + self.solid_mass.memory_bytes()
            + self.fluid_mass.memory_bytes()
            + self.coupling.memory_bytes()
            + self.solid_exchange.memory_bytes()
            + self.fluid_exchange.memory_bytes()
            + self.sources.iter().map(SourceTerm::memory_bytes).sum::<usize>()
            + self.taps.iter().map(ReceiverTap::memory_bytes).sum::<usize>()
            + self.stf.samples.len() * 8
            + self.workspaces.memory_bytes()
            + self
                .transforms
                .provider()
                .map_or(0, TransformProvider::memory_bytes)
    }

    /// Human-readable summary of the domain.
    pub fn verbose(&self) -> String {
        let count = |kind: ElementKind| self.elements.iter().filter(|e| e.kind() == kind).count();
        let ring = self.elements.iter().filter(|e| e.is_ring()).count();
        let attenuating = self
            .elements
            .iter()
            .filter(|e| matches!(e, Element::Solid(s) if s.is_attenuating()))
            .count();
        let max_nr = self.elements.iter().map(Element::nr).max().unwrap_or(0);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Domain (worker {} of {})",
            self.comm.rank(),
            self.comm.size()
        );
        let _ = writeln!(
            out,
            "  elements       : {} solid, {} fluid ({} 3-D, {} attenuating)",
            count(ElementKind::Solid),
            count(ElementKind::Fluid),
            ring,
            attenuating
        );
        let _ = writeln!(
            out,
            "  points         : {} solid ({} 3-D mass), {} fluid ({} 3-D mass)",
            self.solid_mass.len(),
            self.solid_mass.ring_count(),
            self.fluid_mass.len(),
            self.fluid_mass.ring_count()
        );
        let _ = writeln!(
            out,
            "  shared points  : {} solid, {} fluid",
            self.solid_exchange.shared_points(),
            self.fluid_exchange.shared_points()
        );
        let _ = writeln!(out, "  coupling       : {} pairs", self.coupling.len());
        let _ = writeln!(out, "  max ring size  : {max_nr}");
        let _ = writeln!(
            out,
            "  sources / taps : {} / {}",
            self.sources.len(),
            self.taps.len()
        );
        let _ = writeln!(
            out,
            "  memory         : {:.3} MB",
            self.memory_bytes() as f64 / (1024.0 * 1024.0)
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::CouplingPoint;

    fn parts() -> MeshParts {
        MeshParts {
            elements: Vec::new(),
            solid_layout: FieldLayout::new(3, vec![2]),
            fluid_layout: FieldLayout::new(1, vec![2]),
            solid_global: vec![4],
            fluid_global: vec![9],
            solid_masses: vec![PointMass::OneD { inv_mass: 1.0 }],
            fluid_masses: vec![PointMass::OneD { inv_mass: 0.5 }],
            coupling: Coupling::new(vec![CouplingPoint {
                solid: 0,
                fluid: 0,
                area_normal: [0.0, 1.0],
            }]),
            solid_exchange: ExchangePlan::empty(),
            fluid_exchange: ExchangePlan::empty(),
        }
    }

    #[test]
    fn mesh_attaches_once() {
        let mut domain = Domain::new(Communicator::solo(), TransformContext::new());
        domain.attach_mesh(parts()).unwrap();
        assert!(matches!(
            domain.attach_mesh(parts()),
            Err(SolverError::InvalidState { .. })
        ));
        assert_eq!(domain.solid_global_ids(), &[4]);
    }

    #[test]
    fn update_before_initialize_fails() {
        let mut domain = Domain::new(Communicator::solo(), TransformContext::new());
        domain.attach_mesh(parts()).unwrap();
        assert!(matches!(
            domain.update(0),
            Err(SolverError::Resource(
                ResourceInitializationError::NotInitialized { .. }
            ))
        ));
        domain.initialize().unwrap();
        assert!(matches!(
            domain.initialize(),
            Err(ResourceInitializationError::AlreadyInitialized { .. })
        ));
        domain.update(0).unwrap();
    }

    #[test]
    fn solid_motion_reaches_the_fluid_acceleration() {
        let mut domain = Domain::new(Communicator::solo(), TransformContext::new());
        domain.attach_mesh(parts()).unwrap();
        domain.initialize().unwrap();
        domain.solid.displ[2] = num_complex::Complex64::new(3.0, 0.0);
        domain.update(0).unwrap();
        // Fluid: f = n·u = 3, a = f / m = 1.5. Solid: f = -n χ̈.
        assert_eq!(domain.fluid().accel[0].re, 1.5);
        assert_eq!(domain.solid().accel[2].re, -1.5);
    }

    #[test]
    fn steps_map_to_shifted_times() {
        let mut domain = Domain::new(Communicator::solo(), TransformContext::new());
        domain.set_stf(vec![0.0; 12], 0.5, 2.0);
        assert_eq!(domain.step_time(0), -2.0);
        assert_eq!(domain.step_time(4), 0.0);
        assert_eq!(domain.step_time(10), 3.0);
        assert_eq!(domain.nsteps(), 12);
    }

    #[test]
    fn verbose_reports_counts() {
        let mut domain = Domain::new(Communicator::solo(), TransformContext::new());
        domain.attach_mesh(parts()).unwrap();
        let report = domain.verbose();
        assert!(report.starts_with("Domain (worker 0 of 1)\n"));
        assert!(report.contains("1 solid"));
        assert!(report.contains("  coupling       : 1 pairs\n"));
        assert_eq!(report.lines().count(), 8);
        assert!(report.ends_with(" MB\n"));
        assert!(domain.memory_bytes() > 0);
    }
}
