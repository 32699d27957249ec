//! Source time functions sampled at the solver step.
//!
//! A pulse of half duration `h` is sampled from `-shift` to the record
//! length after the origin, where `shift = ⌈1.5 h / dt⌉ · dt`. Sample
//! `i` sits at `t = -shift + i·dt`, so the origin falls exactly on
//! sample `⌈1.5 h / dt⌉`.

use std::f64::consts::PI;
use std::fmt::Write as _;

use ringsem_core::{ConfigError, StfConfig, StfKind};
use ringsem_engine::Domain;
use tracing::debug;

/// Fixed-length amplitude series driving every source of the run.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceTimeFunction {
    kind: StfKind,
    dt: f64,
    half_duration: f64,
    decay: f64,
    shift: f64,
    samples: Vec<f64>,
}

fn positive(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            key: key.into(),
            reason: format!("must be positive and finite, got {value}"),
        })
    }
}

/// Error function, absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];
    let z = x.abs();
    let t = 1.0 / (1.0 + P * z);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;
    let y = 1.0 - poly * (-z * z).exp();
    if x < 0.0 {
        -y
    } else {
        y
    }
}

impl SourceTimeFunction {
    /// Sample the pulse described by `config` at step `dt`.
    pub fn new(config: &StfConfig, dt: f64) -> Result<Self, ConfigError> {
        let dt = positive("TIME_DELTA_T", dt)?;
        let half_duration = positive("SOURCE_HALF_DURATION", config.half_duration)?;
        let decay = positive("SOURCE_DECAY", config.decay)?;
        let duration = positive("TIME_RECORD_LENGTH", config.record_length)?;

        let n_before = (1.5 * half_duration / dt).ceil() as usize;
        let n_after = (duration / dt).ceil() as usize;
        let shift = n_before as f64 * dt;
        let a = decay / half_duration;
        let samples = (0..=n_before + n_after)
            .map(|i| {
                let t = -shift + i as f64 * dt;
                let x = a * t;
                match config.kind {
                    StfKind::Gauss => (-x * x).exp() * a / PI.sqrt(),
                    StfKind::Erf => 0.5 * (1.0 + erf(x)),
                    StfKind::Ricker => (1.0 - 2.0 * x * x) * (-x * x).exp(),
                }
            })
            .collect::<Vec<_>>();
        debug!(
            kind = config.kind.as_str(),
            len = samples.len(),
            shift,
            "source time function sampled"
        );
        Ok(Self {
            kind: config.kind,
            dt,
            half_duration,
            decay,
            shift,
            samples,
        })
    }

    /// Pulse shape.
    pub fn kind(&self) -> StfKind {
        self.kind
    }

    /// Sampling step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Time between the first sample and the origin.
    pub fn shift(&self) -> f64 {
        self.shift
    }

    /// Amplitude per step.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples, which is the number of time steps of the run.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed function.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of sample `i` relative to the origin.
    pub fn time(&self, i: usize) -> f64 {
        -self.shift + i as f64 * self.dt
    }

    /// Hand the samples to `domain`.
    pub fn release(&self, domain: &mut Domain) {
        domain.set_stf(self.samples.clone(), self.dt, self.shift);
    }

    /// Multi-line summary.
    pub fn verbose(&self) -> String {
        let total = self.dt * self.samples.len() as f64;
        let mut out = String::from("source time function\n");
        let _ = writeln!(out, "  time step              {}", self.dt);
        let _ = writeln!(out, "  number of steps        {}", self.samples.len());
        let _ = writeln!(out, "  total duration         {total}");
        let _ = writeln!(out, "  duration after origin  {}", total - self.shift);
        let _ = writeln!(out, "  shift before origin    {}", self.shift);
        let _ = writeln!(out, "  type                   {}", self.kind.as_str());
        let _ = writeln!(out, "  half duration          {}", self.half_duration);
        let _ = writeln!(out, "  decay factor           {}", self.decay);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(kind: StfKind, half_duration: f64, record_length: f64) -> StfConfig {
        StfConfig {
            kind,
            half_duration,
            decay: 1.628,
            record_length,
        }
    }

    #[test]
    fn length_and_shift_follow_step() {
        let stf = SourceTimeFunction::new(&config(StfKind::Gauss, 2.0, 10.0), 0.5).unwrap();
        // 6 steps before the origin, 20 after.
        assert_eq!(stf.len(), 27);
        assert_eq!(stf.shift(), 3.0);
        assert_eq!(stf.time(6), 0.0);
    }

    #[test]
    fn gauss_peaks_at_origin() {
        let stf = SourceTimeFunction::new(&config(StfKind::Gauss, 2.0, 10.0), 0.1).unwrap();
        let (peak, value) = stf
            .samples()
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |b, (i, &v)| if v > b.1 { (i, v) } else { b });
        assert_eq!(stf.time(peak), 0.0);
        let expected = 1.628 / (2.0 * PI.sqrt());
        assert!((value - expected).abs() < 1e-15);
    }

    #[test]
    fn gauss_has_unit_area() {
        let stf = SourceTimeFunction::new(&config(StfKind::Gauss, 1.0, 5.0), 0.01).unwrap();
        let area: f64 = stf.samples().iter().sum::<f64>() * stf.dt();
        assert!((area - 1.0).abs() < 1e-3, "area {area}");
    }

    #[test]
    fn erf_rises_from_zero_to_one() {
        let stf = SourceTimeFunction::new(&config(StfKind::Erf, 1.0, 5.0), 0.05).unwrap();
        let s = stf.samples();
        assert!(s[0] < 0.01);
        assert!((s[s.len() - 1] - 1.0).abs() < 1e-6);
        assert!(s.windows(2).all(|w| w[1] >= w[0] - 1e-7));
        let origin = (stf.shift() / stf.dt()).round() as usize;
        assert!((s[origin] - 0.5).abs() < 1e-8);
    }

    #[test]
    fn ricker_is_unit_at_origin_and_negative_on_flanks() {
        let stf = SourceTimeFunction::new(&config(StfKind::Ricker, 1.0, 3.0), 0.01).unwrap();
        let origin = (stf.shift() / stf.dt()).round() as usize;
        assert_eq!(stf.samples()[origin], 1.0);
        let min = stf.samples().iter().cloned().fold(f64::MAX, f64::min);
        assert!(min < -0.4);
    }

    #[test]
    fn error_function_matches_known_values() {
        assert!(erf(0.0).abs() < 1e-8);
        assert!((erf(0.5) - 0.520_499_877_8).abs() < 2e-7);
        assert!((erf(1.0) - 0.842_700_792_9).abs() < 2e-7);
        assert!((erf(-1.0) + 0.842_700_792_9).abs() < 2e-7);
        assert!((erf(3.0) - 0.999_977_909_5).abs() < 2e-7);
    }

    #[test]
    fn rejects_bad_input() {
        let bad_dt = SourceTimeFunction::new(&config(StfKind::Gauss, 1.0, 5.0), 0.0);
        assert!(matches!(bad_dt, Err(ConfigError::InvalidParameter { key, .. }) if key == "TIME_DELTA_T"));
        let bad_hdur = SourceTimeFunction::new(&config(StfKind::Gauss, -1.0, 5.0), 0.1);
        assert!(matches!(
            bad_hdur,
            Err(ConfigError::InvalidParameter { key, .. }) if key == "SOURCE_HALF_DURATION"
        ));
    }

    #[test]
    fn verbose_reports_parameters() {
        let stf = SourceTimeFunction::new(&config(StfKind::Ricker, 2.0, 10.0), 0.5).unwrap();
        let text = stf.verbose();
        assert!(text.contains("number of steps        27"));
        assert!(text.contains("shift before origin    3"));
        assert!(text.contains("ricker"));
    }

    proptest! {
        #[test]
        fn gauss_shape(hdur in 0.1f64..10.0, dt in 0.01f64..1.0, duration in 0.5f64..50.0) {
            let stf = SourceTimeFunction::new(&config(StfKind::Gauss, hdur, duration), dt).unwrap();
            let n_before = (1.5 * hdur / dt).ceil() as usize;
            let n_after = (duration / dt).ceil() as usize;
            prop_assert_eq!(stf.len(), n_before + n_after + 1);
            prop_assert_eq!(stf.shift(), n_before as f64 * dt);
            prop_assert_eq!(stf.time(n_before), 0.0);
            let s = stf.samples();
            prop_assert!(s.iter().all(|v| v.is_finite() && *v >= 0.0));
            prop_assert!(s[..n_before].windows(2).all(|w| w[1] >= w[0]));
            prop_assert!(s[n_before..].windows(2).all(|w| w[1] <= w[0]));
        }
    }
}
