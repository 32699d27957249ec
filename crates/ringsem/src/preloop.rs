//! The preloop pipeline of one worker.
//!
//! ```text
//! Mesh::new ─► build_unweighted ─► min-reduce dt ─► build_weighted(dt)
//!     ─► SourceTimeFunction ─► Domain ◄─ release(mesh, source, stf, receivers)
//!     ─► Domain::initialize ─► Newmark
//! ```
//!
//! Configuration is validated before any mesh work. The only collective
//! in the pipeline is the time-step reduction; every other stage is
//! local to the worker.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, info_span};

use ringsem_core::{
    ConfigError, ExodusModel, Geometric3D, NrField, OceanLoad3D, SolverConfig, SolverError,
    Volumetric3D,
};
use ringsem_engine::{Communicator, Domain, Newmark, SolveMetrics};
use ringsem_fourier::TransformContext;
use ringsem_mesh::{Mesh, MeshReport, Partition};
use ringsem_source::{ReceiverCollection, Source, SourceTimeFunction};

use crate::timer::{StageTimer, StageTiming};

/// Everything a run is built from.
///
/// A `Preloop` is immutable once assembled and shared by all workers.
pub struct Preloop {
    config: SolverConfig,
    model: Arc<dyn ExodusModel>,
    nr_field: Arc<dyn NrField>,
    volumetric: Vec<Arc<dyn Volumetric3D>>,
    geometric: Option<Arc<dyn Geometric3D>>,
    ocean: Option<Arc<dyn OceanLoad3D>>,
    source: Source,
    receivers: ReceiverCollection,
    mesh_test: bool,
}

impl fmt::Debug for Preloop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preloop")
            .field("config", &self.config)
            .field("model", &self.model.name())
            .field("volumetric", &self.volumetric.len())
            .field("geometric", &self.geometric.is_some())
            .field("ocean", &self.ocean.is_some())
            .field("source", &self.source)
            .field("receivers", &self.receivers.len())
            .field("mesh_test", &self.mesh_test)
            .finish()
    }
}

/// A worker ready to enter the time loop.
#[derive(Debug)]
pub struct Prepared {
    /// The time-loop driver owning the domain.
    pub newmark: Newmark,
    /// The released mesh, kept for locating.
    pub mesh: Mesh,
    /// The source time function.
    pub stf: SourceTimeFunction,
    /// Global stable step before the user factor.
    pub stable_dt: f64,
    /// Step of the run.
    pub dt: f64,
    /// Outcome of the operator check, if requested.
    pub mesh_report: Option<MeshReport>,
    /// Stage durations, empty unless preloop diagnosis is enabled.
    pub timings: Vec<StageTiming>,
}

/// What a worker hands back after its time loop.
#[derive(Debug)]
pub struct WorkerOutput {
    /// Rank of the worker.
    pub rank: usize,
    /// Step of the run.
    pub dt: f64,
    /// Time-loop metrics.
    pub metrics: SolveMetrics,
    /// The finalized domain with its state and receiver traces.
    pub domain: Domain,
}

impl Preloop {
    /// A run of `source` through `model`.
    ///
    /// Fails if `config` does not validate. Receivers sample every
    /// `config.record_interval` steps unless replaced.
    pub fn new(
        config: SolverConfig,
        model: Arc<dyn ExodusModel>,
        nr_field: Arc<dyn NrField>,
        source: Source,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let receivers = ReceiverCollection::new(config.record_interval);
        Ok(Self {
            config,
            model,
            nr_field,
            volumetric: Vec::new(),
            geometric: None,
            ocean: None,
            source,
            receivers,
            mesh_test: false,
        })
    }

    /// Add a volumetric 3-D model.
    pub fn with_volumetric_3d(mut self, model: Arc<dyn Volumetric3D>) -> Self {
        self.volumetric.push(model);
        self
    }

    /// Set the topography.
    pub fn with_geometric_3d(mut self, model: Arc<dyn Geometric3D>) -> Self {
        self.geometric = Some(model);
        self
    }

    /// Set the ocean load.
    pub fn with_ocean_load_3d(mut self, model: Arc<dyn OceanLoad3D>) -> Self {
        self.ocean = Some(model);
        self
    }

    /// Replace the receivers.
    pub fn with_receivers(mut self, receivers: ReceiverCollection) -> Self {
        self.receivers = receivers;
        self
    }

    /// Run the element operator check after the weighted build.
    pub fn with_mesh_test(mut self, enabled: bool) -> Self {
        self.mesh_test = enabled;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The source.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The receivers.
    pub fn receivers(&self) -> &ReceiverCollection {
        &self.receivers
    }

    /// Transform context for worker `rank`.
    ///
    /// Only rank 0 reads and writes the plan cache.
    pub fn transforms(&self, rank: usize) -> TransformContext {
        match &self.config.transform_cache {
            Some(path) if rank == 0 => TransformContext::with_cache(path.clone()),
            _ => TransformContext::new(),
        }
    }

    fn define_mesh(&self, partition: Partition) -> Result<Mesh, SolverError> {
        let mut mesh = Mesh::new(
            Arc::clone(&self.model),
            Arc::clone(&self.nr_field),
            self.source.location(),
            &self.config,
            partition,
        )?;
        for v in &self.volumetric {
            mesh.set_volumetric_3d(Arc::clone(v))?;
        }
        if let Some(g) = &self.geometric {
            mesh.set_geometric_3d(Arc::clone(g))?;
        }
        if let Some(o) = &self.ocean {
            mesh.set_ocean_load_3d(Arc::clone(o))?;
        }
        Ok(mesh)
    }

    /// Run the pipeline for the worker behind `comm`.
    pub fn prepare(&self, comm: Communicator) -> Result<Prepared, SolverError> {
        let rank = comm.rank();
        let _span = info_span!("preloop", rank).entered();
        let mut timer = StageTimer::new(self.config.diagnose_preloop);
        let partition = Partition::new(rank, comm.size())?;

        timer.begin("mesh definition");
        let mut mesh = self.define_mesh(partition)?;
        timer.end();

        timer.begin("unweighted mesh");
        mesh.build_unweighted()?;
        timer.end();

        timer.begin("time step");
        let stable_dt = comm.all_reduce_min(mesh.get_delta_t()?)?;
        let dt = self.config.resolve_dt(stable_dt);
        timer.end();
        if rank == 0 {
            info!(
                stable_dt,
                dt,
                factor = self.config.dt_factor,
                "time step selected"
            );
        }

        timer.begin("weighted mesh");
        mesh.build_weighted(dt)?;
        timer.end();

        let mesh_report = if self.mesh_test {
            Some(timer.stage("mesh test", || mesh.test())?)
        } else {
            None
        };

        timer.begin("source time function");
        let stf = SourceTimeFunction::new(&self.config.stf, dt)?;
        timer.end();
        if rank == 0 {
            debug!("{}", stf.verbose());
        }

        timer.begin("computational domain");
        let mut domain = Domain::new(comm, self.transforms(rank));
        timer.stage("release mesh", || mesh.release(&mut domain))?;
        timer.stage("release source", || self.source.release(&mesh, &mut domain))?;
        timer.stage("release stf", || stf.release(&mut domain));
        timer.stage("release receivers", || {
            self.receivers.release(&mesh, &mut domain)
        })?;
        timer.stage("initialize", || domain.initialize())?;
        debug!("{}", domain.verbose());
        timer.end();

        let newmark = Newmark::new(domain, &self.config)?;
        if timer.is_enabled() && rank == 0 {
            info!("preloop stages\n{}", timer.report());
        }
        Ok(Prepared {
            newmark,
            mesh,
            stf,
            stable_dt,
            dt,
            mesh_report,
            timings: timer.stages().to_vec(),
        })
    }

    /// Prepare, solve and finalize the worker behind `comm`.
    pub fn run(&self, comm: Communicator) -> Result<WorkerOutput, SolverError> {
        let rank = comm.rank();
        let Prepared {
            mut newmark, dt, ..
        } = self.prepare(comm)?;
        let metrics = newmark.solve()?.clone();
        let mut domain = newmark.finalize()?;
        domain.finalize()?;
        Ok(WorkerOutput {
            rank,
            dt,
            metrics,
            domain,
        })
    }
}
