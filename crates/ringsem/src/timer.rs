//! Nested wall-clock timing of the preloop stages.
//!
//! Disabled timers record nothing and log nothing. An enabled timer
//! logs each finished stage as an `info!` event with its nesting level
//! and keeps the durations for [`StageTimer::report`].

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use tracing::info;

/// A finished stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageTiming {
    /// Stage name.
    pub name: &'static str,
    /// Nesting level, 0 for top-level stages.
    pub level: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Timer for nested preloop stages.
#[derive(Debug, Default)]
pub struct StageTimer {
    enabled: bool,
    open: Vec<(&'static str, Instant)>,
    finished: Vec<StageTiming>,
}

impl StageTimer {
    /// A timer that records only when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            open: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Whether stages are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open a stage nested in the currently open ones.
    pub fn begin(&mut self, name: &'static str) {
        if self.enabled {
            self.open.push((name, Instant::now()));
        }
    }

    /// Close the innermost open stage.
    pub fn end(&mut self) {
        let Some((name, start)) = self.open.pop() else {
            return;
        };
        let elapsed = start.elapsed();
        let level = self.open.len();
        info!(
            stage = name,
            level,
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            "preloop stage finished"
        );
        self.finished.push(StageTiming {
            name,
            level,
            elapsed,
        });
    }

    /// Run `f` as stage `name`.
    pub fn stage<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        self.begin(name);
        let out = f();
        self.end();
        out
    }

    /// Finished stages in completion order.
    pub fn stages(&self) -> &[StageTiming] {
        &self.finished
    }

    /// One indented line per finished stage.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for s in &self.finished {
            let _ = writeln!(
                out,
                "{:indent$}{:<28} {:>10.3} ms",
                "",
                s.name,
                s.elapsed.as_secs_f64() * 1e3,
                indent = 2 * s.level
            );
        }
        out
    }
}
