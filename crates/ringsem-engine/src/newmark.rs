//! Explicit Newmark time integration.
//!
//! [`Newmark`] owns a [`Domain`] and advances it one step at a time:
//!
//! 1. predictor `u += dt v + dt²/2 a`, `v += dt/2 a`,
//! 2. [`Domain::update`] computes the new acceleration,
//! 3. corrector `v += dt/2 a`.
//!
//! The number of steps is the length of the source time function; step
//! `n` sits at time `n dt - shift`. Every `stability_interval` steps the
//! workers reduce their stability norms to a global maximum and abort
//! with [`NumericalInstabilityError`] if it is not finite or exceeds the
//! ceiling. Every worker sees the same global value, so all of them stop
//! at the same step.
//!
//! # Lifecycle
//!
//! `Constructed → Solving → Finalized`. [`finalize()`](Newmark::finalize)
//! hands the domain back; any later call fails with
//! [`SolverError::InvalidState`].

use std::time::Instant;

use ringsem_arena::KinematicState;
use ringsem_core::{NumericalInstabilityError, SolverConfig, SolverError, StepId};
use tracing::{error, info};

use crate::domain::Domain;
use crate::metrics::SolveMetrics;

/// Lifecycle state of a [`Newmark`] driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewmarkState {
    /// Built, no step taken yet.
    Constructed,
    /// At least one step taken.
    Solving,
    /// Domain handed back; no further use.
    Finalized,
}

impl NewmarkState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Constructed => "constructed",
            Self::Solving => "solving",
            Self::Finalized => "finalized",
        }
    }
}

/// The time-integration driver of one worker.
#[derive(Debug)]
pub struct Newmark {
    domain: Option<Domain>,
    state: NewmarkState,
    dt: f64,
    t0: f64,
    nsteps: usize,
    step: usize,
    loop_info_interval: u64,
    stability_interval: u64,
    stability_ceiling: f64,
    metrics: SolveMetrics,
    started: Option<Instant>,
}

/// One predictor, update and corrector pass. Returns the global
/// stability norm when `check` is set.
fn integrate(
    domain: &mut Domain,
    step: usize,
    dt: f64,
    check: bool,
) -> Result<Option<f64>, SolverError> {
    {
        let (solid, fluid) = domain.states_mut();
        predict(solid, dt);
        predict(fluid, dt);
    }
    domain.update(step)?;
    {
        let (solid, fluid) = domain.states_mut();
        correct(solid, dt);
        correct(fluid, dt);
    }
    if !check {
        return Ok(None);
    }
    let local = domain.stability_norm();
    Ok(Some(domain.comm().all_reduce_max(local)?))
}

fn predict(state: &mut KinematicState, dt: f64) {
    let half = 0.5 * dt;
    let half_sq = 0.5 * dt * dt;
    for ((u, v), a) in state
        .displ
        .iter_mut()
        .zip(state.veloc.iter_mut())
        .zip(&state.accel)
    {
        *u += *v * dt + *a * half_sq;
        *v += *a * half;
    }
}

fn correct(state: &mut KinematicState, dt: f64) {
    let half = 0.5 * dt;
    for (v, a) in state.veloc.iter_mut().zip(&state.accel) {
        *v += *a * half;
    }
}

impl Newmark {
    /// Take ownership of an initialized domain.
    ///
    /// Step size, shift and step count come from the domain's source
    /// time function; intervals and the ceiling from `config`.
    pub fn new(domain: Domain, config: &SolverConfig) -> Result<Self, SolverError> {
        if !domain.is_initialized() {
            return Err(SolverError::InvalidState {
                operation: "start the time loop",
                state: "domain not initialized",
            });
        }
        if domain.dt().is_nan() || domain.dt() <= 0.0 {
            return Err(SolverError::InvalidState {
                operation: "start the time loop",
                state: "no source time function released",
            });
        }
        Ok(Self {
            dt: domain.dt(),
            t0: -domain.shift(),
            nsteps: domain.nsteps(),
            domain: Some(domain),
            state: NewmarkState::Constructed,
            step: 0,
            loop_info_interval: config.loop_info_interval.max(1),
            stability_interval: config.stability_interval.max(1),
            stability_ceiling: config.stability_ceiling,
            metrics: SolveMetrics::default(),
            started: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NewmarkState {
        self.state
    }

    /// Steps completed so far.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Total number of steps.
    pub fn nsteps(&self) -> usize {
        self.nsteps
    }

    /// Time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Time of the next step.
    pub fn time(&self) -> f64 {
        self.t0 + self.step as f64 * self.dt
    }

    /// Metrics of the loop so far.
    pub fn metrics(&self) -> &SolveMetrics {
        &self.metrics
    }

    /// The owned domain, until finalized.
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    fn live_domain(&mut self, operation: &'static str) -> Result<&mut Domain, SolverError> {
        let state = self.state;
        self.domain.as_mut().ok_or(SolverError::InvalidState {
            operation,
            state: state.as_str(),
        })
    }

    /// Take one step. Returns `false` once every step has been taken.
    pub fn advance(&mut self) -> Result<bool, SolverError> {
        if self.step >= self.nsteps {
            // Still reject use after finalize.
            self.live_domain("advance")?;
            return Ok(false);
        }
        let step = self.step;
        let done = step + 1;
        let dt = self.dt;
        let t = self.time();
        let check = (done as u64) % self.stability_interval == 0;
        let clock = Instant::now();
        let domain = self.live_domain("advance")?;
        #[cfg(debug_assertions)]
        let norm = {
            let (norm, allocations) = ringsem_core::alloc_guard::forbid_allocations(|| {
                integrate(domain, step, dt, check)
            });
            debug_assert_eq!(allocations, 0, "time step {step} allocated on the heap");
            norm?
        };
        #[cfg(not(debug_assertions))]
        let norm = integrate(domain, step, dt, check)?;
        let rank = domain.comm().rank();

        self.state = NewmarkState::Solving;
        self.step = done;
        let elapsed = clock.elapsed().as_micros() as u64;
        self.metrics.steps += 1;
        self.metrics.total_us += elapsed;
        self.metrics.last_step_us = elapsed;

        if let Some(norm) = norm {
            self.metrics.stability_checks += 1;
            self.metrics.last_norm = norm;
            if norm.is_nan() || norm > self.stability_ceiling {
                if rank == 0 {
                    error!(step, t, norm, ceiling = self.stability_ceiling, "solution unstable");
                }
                return Err(NumericalInstabilityError {
                    step: StepId(step as u64),
                    time: t,
                    norm,
                    ceiling: self.stability_ceiling,
                }
                .into());
            }
        }

        if rank == 0 && (done as u64) % self.loop_info_interval == 0 {
            let wall = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
            info!(
                step = done,
                nsteps = self.nsteps,
                t,
                wall_s = wall,
                mean_step_us = self.metrics.mean_step_us(),
                "time loop progress"
            );
        }
        Ok(true)
    }

    /// Run every remaining step.
    pub fn solve(&mut self) -> Result<&SolveMetrics, SolverError> {
        let rank = self.live_domain("solve")?.comm().rank();
        if self.started.is_none() {
            self.started = Some(Instant::now());
            if rank == 0 {
                info!(
                    nsteps = self.nsteps,
                    dt = self.dt,
                    t0 = self.t0,
                    "time loop started"
                );
            }
        }
        while self.advance()? {}
        if rank == 0 {
            let wall = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
            info!(steps = self.metrics.steps, wall_s = wall, "time loop finished");
        }
        Ok(&self.metrics)
    }

    /// Hand the domain back, ending the driver's life.
    pub fn finalize(&mut self) -> Result<Domain, SolverError> {
        let domain = self.domain.take().ok_or(SolverError::InvalidState {
            operation: "finalize",
            state: self.state.as_str(),
        })?;
        self.state = NewmarkState::Finalized;
        Ok(domain)
    }
}
