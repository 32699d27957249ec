//! Ring transform plans.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use ringsem_core::ResourceInitializationError;

use crate::multiplicity::Multiplicity;

/// Shape of a ring plan, as stored in the plan cache.
///
/// A plan rebuilt by a different FFT backend may need other scratch
/// sizes; a record that no longer matches marks the size for replanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlanRecord {
    /// Ring size.
    pub nr: usize,
    /// Scratch length of the forward plan.
    pub forward_scratch: usize,
    /// Scratch length of the inverse plan.
    pub inverse_scratch: usize,
}

/// Buffers one ring plan works in, sized once at planning.
#[derive(Clone)]
struct RingBuffers {
    ring: Vec<f64>,
    spectrum: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

/// Real-input FFT plans for one ring size.
///
/// Each multiplicity column is gathered into the plan's own buffers, so
/// a transform never allocates.
#[derive(Clone)]
pub struct RingPlan {
    nr: usize,
    inv_nr: f64,
    r2c: Arc<dyn RealToComplex<f64>>,
    c2r: Arc<dyn ComplexToReal<f64>>,
    buffers: RefCell<RingBuffers>,
}

impl fmt::Debug for RingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingPlan")
            .field("nr", &self.nr)
            .field("record", &self.record())
            .finish()
    }
}

impl RingPlan {
    /// Plan a ring of `nr` samples with a private planner.
    pub fn new(nr: usize) -> Self {
        Self::with_planner(&mut RealFftPlanner::new(), nr)
    }

    /// Plan a ring of `nr` samples, sharing sub-plans held by `planner`.
    ///
    /// `nr` must be at least one.
    pub fn with_planner(planner: &mut RealFftPlanner<f64>, nr: usize) -> Self {
        let nr = nr.max(1);
        let r2c = planner.plan_fft_forward(nr);
        let c2r = planner.plan_fft_inverse(nr);
        let scratch = r2c.get_scratch_len().max(c2r.get_scratch_len());
        let zero = Complex64::new(0.0, 0.0);
        Self {
            nr,
            inv_nr: 1.0 / nr as f64,
            buffers: RefCell::new(RingBuffers {
                ring: vec![0.0; nr],
                spectrum: vec![zero; nr / 2 + 1],
                scratch: vec![zero; scratch],
            }),
            r2c,
            c2r,
        }
    }

    /// Ring size.
    pub fn nr(&self) -> usize {
        self.nr
    }

    /// Number of coefficient orders produced, `nr / 2 + 1`.
    pub fn orders(&self) -> usize {
        self.nr / 2 + 1
    }

    /// Cacheable shape of this plan.
    pub fn record(&self) -> PlanRecord {
        PlanRecord {
            nr: self.nr,
            forward_scratch: self.r2c.get_scratch_len(),
            inverse_scratch: self.c2r.get_scratch_len(),
        }
    }

    /// Heap bytes held by the plan buffers.
    pub fn memory_bytes(&self) -> usize {
        let b = self.buffers.borrow();
        b.ring.len() * 8 + (b.spectrum.len() + b.scratch.len()) * 16
    }

    fn forward(
        &self,
        width: usize,
        phys: &[f64],
        coeffs: &mut [Complex64],
    ) -> Result<(), ResourceInitializationError> {
        let mut guard = self.buffers.borrow_mut();
        let RingBuffers {
            ring,
            spectrum,
            scratch,
        } = &mut *guard;
        let scratch = scratch_slice(scratch, self.r2c.get_scratch_len())?;
        for c in 0..width {
            for (x, sample) in ring.iter_mut().zip(phys.chunks_exact(width)) {
                *x = sample[c];
            }
            self.r2c
                .process_with_scratch(ring, spectrum, scratch)
                .map_err(|_| fft_error(self.nr))?;
            for (row, s) in coeffs.chunks_exact_mut(width).zip(spectrum.iter()) {
                row[c] = *s * self.inv_nr;
            }
        }
        Ok(())
    }

    fn inverse(
        &self,
        width: usize,
        coeffs: &[Complex64],
        phys: &mut [f64],
    ) -> Result<(), ResourceInitializationError> {
        let nr = self.nr;
        let mut guard = self.buffers.borrow_mut();
        let RingBuffers {
            ring,
            spectrum,
            scratch,
        } = &mut *guard;
        let scratch = scratch_slice(scratch, self.c2r.get_scratch_len())?;
        for c in 0..width {
            for (s, row) in spectrum.iter_mut().zip(coeffs.chunks_exact(width)) {
                *s = row[c];
            }
            // Order zero and Nyquist are real.
            spectrum[0].im = 0.0;
            if nr % 2 == 0 {
                spectrum[nr / 2].im = 0.0;
            }
            self.c2r
                .process_with_scratch(spectrum, ring, scratch)
                .map_err(|_| fft_error(nr))?;
            for (sample, &x) in phys.chunks_exact_mut(width).zip(ring.iter()) {
                sample[c] = x;
            }
        }
        Ok(())
    }
}

fn scratch_slice(
    scratch: &mut [Complex64],
    len: usize,
) -> Result<&mut [Complex64], ResourceInitializationError> {
    let capacity = scratch.len();
    scratch
        .get_mut(..len)
        .ok_or(ResourceInitializationError::WorkspaceTooSmall {
            resource: "transform scratch",
            required: len,
            capacity,
        })
}

fn fft_error(nr: usize) -> ResourceInitializationError {
    ResourceInitializationError::WorkspaceTooSmall {
        resource: "transform plan",
        required: nr,
        capacity: nr,
    }
}

/// The set of plans for every ring size up to `max_nr`.
///
/// Immutable once built; obtained from a live
/// [`TransformContext`](crate::TransformContext).
#[derive(Clone, Debug)]
pub struct TransformProvider {
    /// `plans[nr - 1]` serves rings of `nr` samples.
    plans: Vec<RingPlan>,
}

impl TransformProvider {
    pub(crate) fn from_plans(plans: Vec<RingPlan>) -> Self {
        Self { plans }
    }

    /// Largest supported ring size.
    pub fn max_nr(&self) -> usize {
        self.plans.len()
    }

    /// All plans, indexed by `nr - 1`.
    pub fn plans(&self) -> &[RingPlan] {
        &self.plans
    }

    /// Cache records of all plans.
    pub fn records(&self) -> Vec<PlanRecord> {
        self.plans.iter().map(RingPlan::record).collect()
    }

    /// Heap bytes held by the plan buffers.
    pub fn memory_bytes(&self) -> usize {
        self.plans.iter().map(RingPlan::memory_bytes).sum()
    }

    fn plan(&self, nr: usize) -> Result<&RingPlan, ResourceInitializationError> {
        nr.checked_sub(1)
            .and_then(|i| self.plans.get(i))
            .ok_or(ResourceInitializationError::WorkspaceTooSmall {
                resource: "transform provider",
                required: nr,
                capacity: self.plans.len(),
            })
    }

    fn check_len(required: usize, capacity: usize) -> Result<(), ResourceInitializationError> {
        if capacity < required {
            return Err(ResourceInitializationError::WorkspaceTooSmall {
                resource: "transform buffer",
                required,
                capacity,
            });
        }
        Ok(())
    }

    /// Ring samples to coefficients of orders `0..=nr / 2`.
    pub fn forward(
        &self,
        mult: Multiplicity,
        nr: usize,
        phys: &[f64],
        coeffs: &mut [Complex64],
    ) -> Result<(), ResourceInitializationError> {
        let plan = self.plan(nr)?;
        let w = mult.width();
        Self::check_len(nr * w, phys.len())?;
        Self::check_len(plan.orders() * w, coeffs.len())?;
        plan.forward(w, phys, coeffs)
    }

    /// Coefficients of orders `0..=nr / 2` to ring samples.
    ///
    /// The imaginary parts of order zero and of the Nyquist order are
    /// ignored.
    pub fn inverse(
        &self,
        mult: Multiplicity,
        nr: usize,
        coeffs: &[Complex64],
        phys: &mut [f64],
    ) -> Result<(), ResourceInitializationError> {
        let plan = self.plan(nr)?;
        let w = mult.width();
        Self::check_len(plan.orders() * w, coeffs.len())?;
        Self::check_len(nr * w, phys.len())?;
        plan.inverse(w, coeffs, phys)
    }
}
