//! Time-loop performance metrics.
//!
//! [`SolveMetrics`] is updated by [`Newmark`](crate::Newmark) after each
//! step, enabling progress reports and post-run profiling.

/// Timing and stability data of a time loop.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveMetrics {
    /// Steps completed so far.
    pub steps: u64,
    /// Wall-clock time spent inside steps, in microseconds.
    pub total_us: u64,
    /// Wall-clock time of the most recent step, in microseconds.
    pub last_step_us: u64,
    /// Number of global stability checks performed.
    pub stability_checks: u64,
    /// Global stability norm at the most recent check.
    pub last_norm: f64,
}

impl SolveMetrics {
    /// Mean wall-clock time per step, in microseconds.
    pub fn mean_step_us(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.total_us as f64 / self.steps as f64
        }
    }
}
