//! Receiver taps sampling the solid displacement.

use num_complex::Complex64;
use ringsem_arena::KinematicState;

/// One station recording displacement at a solid point.
///
/// The trace is allocated at construction for every sample the run can
/// produce; recording only writes into it.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiverTap {
    name: String,
    point: u32,
    /// `c_m e^{imφ}` with `c_0 = 1` and `c_m = 2` otherwise.
    phase: Vec<Complex64>,
    /// `[sin θ, cos θ]` of the point.
    rotation: [f64; 2],
    interval: u64,
    trace: Vec<[f64; 3]>,
    written: usize,
}

impl ReceiverTap {
    /// Tap at local solid point `point` carrying `orders` orders, at
    /// azimuth `phi` and colatitude `theta` (radians), sampled every
    /// `interval` steps of a run of `nsteps` steps.
    pub fn new(
        name: impl Into<String>,
        point: u32,
        orders: usize,
        theta: f64,
        phi: f64,
        interval: u64,
        nsteps: usize,
    ) -> Self {
        let interval = interval.max(1);
        let phase = (0..orders)
            .map(|m| {
                let c = if m == 0 { 1.0 } else { 2.0 };
                Complex64::from_polar(c, m as f64 * phi)
            })
            .collect();
        let samples = (nsteps as u64).div_ceil(interval) as usize;
        Self {
            name: name.into(),
            point,
            phase,
            rotation: [theta.sin(), theta.cos()],
            interval,
            trace: vec![[0.0; 3]; samples],
            written: 0,
        }
    }

    /// Station name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local solid point index.
    pub fn point(&self) -> u32 {
        self.point
    }

    /// Recorded samples `[u_r, u_θ, u_φ]` so far.
    pub fn trace(&self) -> &[[f64; 3]] {
        &self.trace[..self.written]
    }

    /// Steps between samples.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Heap memory held in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.name.len()
            + self.phase.len() * std::mem::size_of::<Complex64>()
            + self.trace.len() * std::mem::size_of::<[f64; 3]>()
    }

    /// Displacement `[u_r, u_θ, u_φ]` of the point at its azimuth.
    pub fn sample(&self, solid: &KinematicState) -> [f64; 3] {
        let start = solid.layout().range(self.point as usize).start;
        let mut u = [0.0; 3];
        for (m, ph) in self.phase.iter().enumerate() {
            for (c, uc) in u.iter_mut().enumerate() {
                *uc += (solid.displ[start + 3 * m + c] * *ph).re;
            }
        }
        let [sin, cos] = self.rotation;
        [u[0] * sin + u[2] * cos, u[0] * cos - u[2] * sin, u[1]]
    }

    /// Record a sample if `step` falls on the interval.
    pub fn record(&mut self, step: usize, solid: &KinematicState) {
        if step as u64 % self.interval != 0 || self.written == self.trace.len() {
            return;
        }
        self.trace[self.written] = self.sample(solid);
        self.written += 1;
    }
}
