//! Lifecycle owner of the transform plans.

use std::collections::HashMap;
use std::path::PathBuf;

use realfft::RealFftPlanner;
use ringsem_core::ResourceInitializationError;
use tracing::{debug, warn};

use crate::cache::PlanCache;
use crate::plan::{PlanRecord, RingPlan, TransformProvider};

const RESOURCE: &str = "transform provider";

/// State of a [`TransformContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never initialized.
    Uninitialized,
    /// Plans are live.
    Initialized,
    /// Plans were released by `finalize()`.
    Finalized,
}

/// Per-worker owner of the transform plans.
///
/// Replaces process-wide mutable state: each worker (and each test)
/// holds its own context, and the state flag rejects out-of-order use.
#[derive(Debug)]
pub struct TransformContext {
    state: LifecycleState,
    provider: Option<TransformProvider>,
    cache: Option<PlanCache>,
    planned_fresh: usize,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformContext {
    /// Context without a plan cache.
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            provider: None,
            cache: None,
            planned_fresh: 0,
        }
    }

    /// Context that checks plans against the records at `path` on
    /// initialization and writes the records back on finalization.
    pub fn with_cache(path: impl Into<PathBuf>) -> Self {
        Self {
            cache: Some(PlanCache::new(path)),
            ..Self::new()
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Number of plans the last initialization found no matching cache
    /// record for.
    pub fn planned_fresh(&self) -> usize {
        self.planned_fresh
    }

    /// Build plans for every ring size in `1..=max_nr`.
    pub fn initialize(&mut self, max_nr: usize) -> Result<(), ResourceInitializationError> {
        if self.state == LifecycleState::Initialized {
            return Err(ResourceInitializationError::AlreadyInitialized { resource: RESOURCE });
        }
        let max_nr = max_nr.max(1);
        let cached = self.load_cache();
        let mut planner = RealFftPlanner::new();
        let mut plans = Vec::with_capacity(max_nr);
        let mut fresh = 0;
        for nr in 1..=max_nr {
            let plan = RingPlan::with_planner(&mut planner, nr);
            match cached.get(&nr) {
                Some(record) if *record == plan.record() => {}
                Some(record) => {
                    warn!(
                        nr,
                        cached = ?record,
                        planned = ?plan.record(),
                        "transform plan differs from its cache record"
                    );
                    fresh += 1;
                }
                None => fresh += 1,
            }
            plans.push(plan);
        }
        debug!(
            max_nr,
            cached = max_nr - fresh,
            fresh,
            "transform plans ready"
        );
        self.planned_fresh = fresh;
        self.provider = Some(TransformProvider::from_plans(plans));
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    fn load_cache(&self) -> HashMap<usize, PlanRecord> {
        let Some(cache) = &self.cache else {
            return HashMap::new();
        };
        if !cache.path().exists() {
            debug!(path = %cache.path().display(), "no transform plan cache yet");
            return HashMap::new();
        }
        match cache.load() {
            Ok(records) => records.into_iter().map(|r| (r.nr, r)).collect(),
            Err(e) => {
                warn!(
                    path = %cache.path().display(),
                    error = %e,
                    "ignoring unusable transform plan cache"
                );
                HashMap::new()
            }
        }
    }

    /// Release the plans, persisting their records first if a cache is
    /// configured and some plan had no matching record.
    pub fn finalize(&mut self) -> Result<(), ResourceInitializationError> {
        if self.state != LifecycleState::Initialized {
            return Err(ResourceInitializationError::NotInitialized { resource: RESOURCE });
        }
        if let (Some(cache), Some(provider)) = (&self.cache, &self.provider) {
            if self.planned_fresh > 0 {
                if let Err(e) = cache.store(&provider.records()) {
                    warn!(
                        path = %cache.path().display(),
                        error = %e,
                        "could not write transform plan cache"
                    );
                }
            }
        }
        self.provider = None;
        self.state = LifecycleState::Finalized;
        Ok(())
    }

    /// The live plans.
    pub fn provider(&self) -> Result<&TransformProvider, ResourceInitializationError> {
        self.provider
            .as_ref()
            .ok_or(ResourceInitializationError::NotInitialized { resource: RESOURCE })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplicity::Multiplicity;
    use num_complex::Complex64;

    #[test]
    fn double_initialize_is_rejected() {
        let mut ctx = TransformContext::new();
        ctx.initialize(8).unwrap();
        assert_eq!(
            ctx.initialize(8),
            Err(ResourceInitializationError::AlreadyInitialized { resource: RESOURCE })
        );
    }

    #[test]
    fn use_before_initialize_is_rejected() {
        let ctx = TransformContext::new();
        assert!(ctx.provider().is_err());
        let mut ctx = TransformContext::new();
        assert!(ctx.finalize().is_err());
    }

    #[test]
    fn use_after_finalize_is_rejected() {
        let mut ctx = TransformContext::new();
        ctx.initialize(4).unwrap();
        ctx.finalize().unwrap();
        assert_eq!(ctx.state(), LifecycleState::Finalized);
        assert!(ctx.provider().is_err());
        assert!(ctx.finalize().is_err());
    }

    #[test]
    fn reinitialize_reproduces_outputs() {
        let nr = 12;
        let phys: Vec<f64> = (0..nr * 3).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut first = vec![Complex64::new(0.0, 0.0); (nr / 2 + 1) * 3];
        let mut second = first.clone();

        let mut ctx = TransformContext::new();
        ctx.initialize(nr).unwrap();
        ctx.provider()
            .unwrap()
            .forward(Multiplicity::Three, nr, &phys, &mut first)
            .unwrap();
        ctx.finalize().unwrap();
        ctx.initialize(nr).unwrap();
        ctx.provider()
            .unwrap()
            .forward(Multiplicity::Three, nr, &phys, &mut second)
            .unwrap();
        assert_eq!(first, second);
    }
}
