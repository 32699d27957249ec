//! Named stations recording solid displacement.

use std::f64::consts::PI;
use std::fmt::Write as _;

use tracing::{debug, warn};

use ringsem_core::{ConfigError, SolverError};
use ringsem_element::ElementKind;
use ringsem_engine::{Domain, ReceiverTap};
use ringsem_mesh::{Location, Mesh};

/// One named station.
#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    /// Unique station name.
    pub name: String,
    /// Where it sits.
    pub location: Location,
}

/// The stations of a run.
///
/// Each station records on exactly one worker: the lowest rank holding
/// the solid GLL point nearest to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReceiverCollection {
    stations: Vec<Station>,
    interval: u64,
}

impl ReceiverCollection {
    /// An empty collection sampling every `interval` steps.
    pub fn new(interval: u64) -> Self {
        Self {
            stations: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Add a station.
    pub fn add(&mut self, name: impl Into<String>, location: Location) -> Result<(), ConfigError> {
        let name = name.into();
        let invalid = |reason: String| ConfigError::InvalidReceiver {
            name: name.clone(),
            reason,
        };
        if name.trim().is_empty() {
            return Err(invalid("station name is empty".into()));
        }
        if self.stations.iter().any(|s| s.name == name) {
            return Err(invalid("duplicate station name".into()));
        }
        let Location { depth, theta, phi } = location;
        if !(depth.is_finite() && depth >= 0.0) {
            return Err(invalid(format!("depth {depth} must be finite and non-negative")));
        }
        if !(theta.is_finite() && (0.0..=PI).contains(&theta) && phi.is_finite()) {
            return Err(invalid(format!("({theta}, {phi}) is not a valid direction")));
        }
        self.stations.push(Station { name, location });
        Ok(())
    }

    /// The stations in insertion order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Number of stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether there are no stations.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Sampling interval in steps.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Add a tap to `domain` for every station recorded on this worker.
    ///
    /// The source time function must already be in the domain; it fixes
    /// the trace length. Returns the number of taps added.
    pub fn release(&self, mesh: &Mesh, domain: &mut Domain) -> Result<usize, SolverError> {
        let nsteps = domain.nsteps();
        if nsteps == 0 && !self.stations.is_empty() {
            return Err(SolverError::InvalidState {
                operation: "release receivers",
                state: "no source time function",
            });
        }
        let rank = mesh.partition().rank();
        let mut added = 0;
        for station in &self.stations {
            let invalid = |reason: String| -> SolverError {
                ConfigError::InvalidReceiver {
                    name: station.name.clone(),
                    reason,
                }
                .into()
            };
            let Location { depth, theta, phi } = station.location;
            let located = match mesh.locate(mesh.outer_radius() - depth, theta) {
                Ok(l) => l,
                Err(SolverError::Config(e)) => return Err(invalid(e.to_string())),
                Err(e) => return Err(e),
            };
            if located.kind == ElementKind::Fluid {
                return Err(invalid(format!("depth {depth} lies in a fluid layer")));
            }
            let holders = mesh.holders(located.point, ElementKind::Solid);
            if holders.first() != Some(&rank) {
                continue;
            }
            let Some((local, orders)) = mesh.local_point(located.point, ElementKind::Solid) else {
                warn!(station = %station.name, "recording worker does not hold the point");
                continue;
            };
            let [r, point_theta] = located.point_polar;
            debug!(
                station = %station.name,
                point = %located.point,
                offset = (r - (mesh.outer_radius() - depth)).abs(),
                "receiver placed"
            );
            domain.add_tap(ReceiverTap::new(
                station.name.clone(),
                local,
                orders,
                point_theta,
                phi,
                self.interval,
                nsteps,
            ));
            added += 1;
        }
        Ok(added)
    }

    /// Multi-line summary.
    pub fn verbose(&self) -> String {
        let mut out = format!(
            "receivers: {} stations, every {} steps\n",
            self.stations.len(),
            self.interval
        );
        for s in &self.stations {
            let _ = writeln!(
                out,
                "  {:<12} depth {} m, colatitude {:.4} deg, azimuth {:.4} deg",
                s.name,
                s.location.depth,
                s.location.theta.to_degrees(),
                s.location.phi.to_degrees()
            );
        }
        out
    }
}
