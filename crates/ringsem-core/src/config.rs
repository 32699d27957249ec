//! Solver configuration and its validation.
//!
//! [`SolverConfig`] is the single input record of a run. It is either
//! built directly (tests, embedding applications) or parsed from a flat
//! key/value parameter set with [`SolverConfig::from_params`]. Either way
//! [`validate()`](SolverConfig::validate) runs before any mesh work so
//! bad input fails fast.

use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ConfigError;

// ── StfKind ────────────────────────────────────────────────────────

/// Shape of the source time function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StfKind {
    /// Normalised Gaussian pulse.
    Gauss,
    /// Error function (integral of the Gaussian): a smoothed step.
    Erf,
    /// Ricker wavelet (negative second derivative of the Gaussian).
    Ricker,
}

impl StfKind {
    /// Parameter-file spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gauss => "gauss",
            Self::Erf => "erf",
            Self::Ricker => "ricker",
        }
    }
}

impl FromStr for StfKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gauss" | "gaussian" => Ok(Self::Gauss),
            "erf" | "errorf" | "heaviside" => Ok(Self::Erf),
            "ricker" => Ok(Self::Ricker),
            other => Err(ConfigError::InvalidParameter {
                key: "SOURCE_TIME_FUNCTION".into(),
                reason: format!("unknown source time function '{other}'"),
            }),
        }
    }
}

// ── StfConfig ──────────────────────────────────────────────────────

/// Source time function parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct StfConfig {
    /// Pulse shape. Default: Gauss.
    pub kind: StfKind,
    /// Half duration of the pulse, in seconds. Required.
    pub half_duration: f64,
    /// Decay factor of the Gaussian. Default: 1.628.
    pub decay: f64,
    /// Simulated time after the origin, in seconds. Required.
    pub record_length: f64,
}

impl Default for StfConfig {
    fn default() -> Self {
        Self {
            kind: StfKind::Gauss,
            half_duration: 1.0,
            decay: 1.628,
            record_length: 10.0,
        }
    }
}

// ── AttenuationConfig ──────────────────────────────────────────────

/// Standard-linear-solid attenuation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct AttenuationConfig {
    /// Number of standard linear solids. Default: 3.
    pub n_sls: usize,
    /// Lower edge of the constant-Q band, in Hz. Default: 0.001.
    pub f_min: f64,
    /// Upper edge of the constant-Q band, in Hz. Default: 1.0.
    pub f_max: f64,
}

impl Default for AttenuationConfig {
    fn default() -> Self {
        Self {
            n_sls: 3,
            f_min: 0.001,
            f_max: 1.0,
        }
    }
}

// ── SolverConfig ───────────────────────────────────────────────────

/// Complete configuration of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Time step in seconds. Non-positive means "use the mesh stable step".
    pub dt: f64,
    /// Factor applied to the time step. Non-positive means 1.
    pub dt_factor: f64,
    /// Courant number used for the mesh stable step. Default: 0.25.
    pub courant: f64,
    /// Source time function parameters.
    pub stf: StfConfig,
    /// Progress logging interval in steps. Default: 1000.
    pub loop_info_interval: u64,
    /// Stability check interval in steps. Default: 10.
    pub stability_interval: u64,
    /// Largest displacement magnitude still considered stable. Default: 1e10.
    pub stability_ceiling: f64,
    /// Time and log each preloop stage. Default: false.
    pub diagnose_preloop: bool,
    /// Attenuation parameters, `None` for a purely elastic run.
    pub attenuation: Option<AttenuationConfig>,
    /// Half-angle in degrees of the unmeshed cone around each pole. Default: 5.
    pub polar_cap_deg: f64,
    /// Location of the transform plan cache, if any.
    pub transform_cache: Option<PathBuf>,
    /// Number of parallel workers. Default: 1.
    pub partitions: usize,
    /// Receiver sampling interval in steps. Default: 1.
    pub record_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dt: 0.0,
            dt_factor: 1.0,
            courant: 0.25,
            stf: StfConfig::default(),
            loop_info_interval: 1000,
            stability_interval: 10,
            stability_ceiling: 1e10,
            diagnose_preloop: false,
            attenuation: None,
            polar_cap_deg: 5.0,
            transform_cache: None,
            partitions: 1,
            record_interval: 1,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        key: key.into(),
        reason: reason.into(),
    }
}

fn positive(key: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, format!("must be finite and positive, got {v}")))
    }
}

impl SolverConfig {
    /// Check every field for type-independent range errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() {
            return Err(invalid("TIME_DELTA_T", format!("must be finite, got {}", self.dt)));
        }
        if !self.dt_factor.is_finite() {
            return Err(invalid(
                "TIME_DELTA_T_FACTOR",
                format!("must be finite, got {}", self.dt_factor),
            ));
        }
        positive("TIME_COURANT", self.courant)?;
        if self.courant > 1.0 {
            return Err(invalid(
                "TIME_COURANT",
                format!("must not exceed 1, got {}", self.courant),
            ));
        }
        positive("SOURCE_HALF_DURATION", self.stf.half_duration)?;
        positive("SOURCE_DECAY", self.stf.decay)?;
        positive("TIME_RECORD_LENGTH", self.stf.record_length)?;
        if self.loop_info_interval == 0 {
            return Err(invalid("OPTION_LOOP_INFO_INTERVAL", "must be at least 1"));
        }
        if self.stability_interval == 0 {
            return Err(invalid("OPTION_STABILITY_INTERVAL", "must be at least 1"));
        }
        positive("OPTION_STABILITY_CEILING", self.stability_ceiling)?;
        if !(self.polar_cap_deg > 0.0 && self.polar_cap_deg < 45.0) {
            return Err(invalid(
                "MESH_POLAR_CAP_DEG",
                format!("must lie in (0, 45), got {}", self.polar_cap_deg),
            ));
        }
        if self.partitions == 0 {
            return Err(invalid("PARTITIONS", "must be at least 1"));
        }
        if self.record_interval == 0 {
            return Err(invalid("OUTPUT_RECORD_INTERVAL", "must be at least 1"));
        }
        if let Some(att) = &self.attenuation {
            if att.n_sls == 0 {
                return Err(invalid("ATTENUATION_NSLS", "must be at least 1"));
            }
            positive("ATTENUATION_F_MIN", att.f_min)?;
            positive("ATTENUATION_F_MAX", att.f_max)?;
            if att.f_min >= att.f_max {
                return Err(invalid(
                    "ATTENUATION_F_MAX",
                    format!("band [{}, {}] is empty", att.f_min, att.f_max),
                ));
            }
        }
        Ok(())
    }

    /// Effective time step given the mesh stable step.
    ///
    /// A positive configured `dt` overrides the mesh value; the factor
    /// is applied in both cases.
    pub fn resolve_dt(&self, stable_dt: f64) -> f64 {
        let base = if self.dt > 0.0 { self.dt } else { stable_dt };
        let factor = if self.dt_factor > 0.0 {
            self.dt_factor
        } else {
            1.0
        };
        base * factor
    }

    /// Parse a flat parameter set and validate the result.
    ///
    /// `TIME_RECORD_LENGTH` and `SOURCE_HALF_DURATION` are required;
    /// every other key falls back to its default. Unknown keys are
    /// ignored.
    pub fn from_params(params: &IndexMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        let mut att = AttenuationConfig::default();
        let mut att_enabled = false;
        let mut have_length = false;
        let mut have_hdur = false;

        for (key, value) in params {
            match key.as_str() {
                "TIME_DELTA_T" => cfg.dt = parse(key, value)?,
                "TIME_DELTA_T_FACTOR" => cfg.dt_factor = parse(key, value)?,
                "TIME_COURANT" => cfg.courant = parse(key, value)?,
                "SOURCE_TIME_FUNCTION" => cfg.stf.kind = value.parse()?,
                "SOURCE_HALF_DURATION" => {
                    cfg.stf.half_duration = parse(key, value)?;
                    have_hdur = true;
                }
                "SOURCE_DECAY" => cfg.stf.decay = parse(key, value)?,
                "TIME_RECORD_LENGTH" => {
                    cfg.stf.record_length = parse(key, value)?;
                    have_length = true;
                }
                "OPTION_LOOP_INFO_INTERVAL" => cfg.loop_info_interval = parse(key, value)?,
                "OPTION_STABILITY_INTERVAL" => cfg.stability_interval = parse(key, value)?,
                "OPTION_STABILITY_CEILING" => cfg.stability_ceiling = parse(key, value)?,
                "DEVELOP_DIAGNOSE_PRELOOP" => cfg.diagnose_preloop = parse_bool(key, value)?,
                "ATTENUATION_ENABLED" => att_enabled = parse_bool(key, value)?,
                "ATTENUATION_NSLS" => att.n_sls = parse(key, value)?,
                "ATTENUATION_F_MIN" => att.f_min = parse(key, value)?,
                "ATTENUATION_F_MAX" => att.f_max = parse(key, value)?,
                "MESH_POLAR_CAP_DEG" => cfg.polar_cap_deg = parse(key, value)?,
                "TRANSFORM_CACHE_PATH" => {
                    let path = value.trim();
                    cfg.transform_cache = (!path.is_empty()).then(|| PathBuf::from(path));
                }
                "PARTITIONS" => cfg.partitions = parse(key, value)?,
                "OUTPUT_RECORD_INTERVAL" => cfg.record_interval = parse(key, value)?,
                other => debug!(key = other, "ignoring unrecognised parameter"),
            }
        }

        if !have_length {
            return Err(ConfigError::MissingParameter {
                key: "TIME_RECORD_LENGTH".into(),
            });
        }
        if !have_hdur {
            return Err(ConfigError::MissingParameter {
                key: "SOURCE_HALF_DURATION".into(),
            });
        }
        if att_enabled {
            cfg.attenuation = Some(att);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, format!("cannot parse '{value}': {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("expected a boolean, got '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn from_params_requires_record_length() {
        let err = SolverConfig::from_params(&params(&[("SOURCE_HALF_DURATION", "1.0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParameter {
                key: "TIME_RECORD_LENGTH".into()
            }
        );
    }

    #[test]
    fn from_params_parses_known_keys() {
        let cfg = SolverConfig::from_params(&params(&[
            ("TIME_RECORD_LENGTH", "50"),
            ("SOURCE_HALF_DURATION", "2.5"),
            ("SOURCE_TIME_FUNCTION", "Ricker"),
            ("TIME_DELTA_T", "0.05"),
            ("OPTION_STABILITY_INTERVAL", "25"),
            ("ATTENUATION_ENABLED", "true"),
            ("ATTENUATION_NSLS", "5"),
            ("PARTITIONS", "3"),
            ("SOMETHING_ELSE", "ignored"),
        ]))
        .unwrap();
        assert_eq!(cfg.stf.record_length, 50.0);
        assert_eq!(cfg.stf.kind, StfKind::Ricker);
        assert_eq!(cfg.dt, 0.05);
        assert_eq!(cfg.stability_interval, 25);
        assert_eq!(cfg.attenuation.as_ref().unwrap().n_sls, 5);
        assert_eq!(cfg.partitions, 3);
    }

    #[test]
    fn from_params_rejects_bad_number() {
        let err = SolverConfig::from_params(&params(&[
            ("TIME_RECORD_LENGTH", "ten"),
            ("SOURCE_HALF_DURATION", "1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref key, .. } if key == "TIME_RECORD_LENGTH"));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut cfg = SolverConfig::default();
        cfg.courant = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SolverConfig::default();
        cfg.stability_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SolverConfig::default();
        cfg.stf.half_duration = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SolverConfig::default();
        cfg.attenuation = Some(AttenuationConfig {
            n_sls: 3,
            f_min: 1.0,
            f_max: 0.5,
        });
        assert!(cfg.validate().is_err());

        let mut cfg = SolverConfig::default();
        cfg.dt = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolve_dt_prefers_configured_step() {
        let mut cfg = SolverConfig::default();
        assert_eq!(cfg.resolve_dt(0.2), 0.2);
        cfg.dt = 0.1;
        assert_eq!(cfg.resolve_dt(0.2), 0.1);
        cfg.dt_factor = 10.0;
        assert_eq!(cfg.resolve_dt(0.2), 1.0);
        cfg.dt_factor = -3.0;
        assert_eq!(cfg.resolve_dt(0.2), 0.1);
    }

    #[test]
    fn stf_kind_parse() {
        assert_eq!("gauss".parse::<StfKind>().unwrap(), StfKind::Gauss);
        assert_eq!(" ERF ".parse::<StfKind>().unwrap(), StfKind::Erf);
        assert!("boxcar".parse::<StfKind>().is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_dt_scales_the_chosen_base(
                stable in 1e-4f64..10.0,
                fixed in prop_oneof![Just(0.0f64), 1e-4f64..10.0],
                factor in 0.1f64..4.0,
            ) {
                let config = SolverConfig {
                    dt: fixed,
                    dt_factor: factor,
                    ..SolverConfig::default()
                };
                let base = if fixed > 0.0 { fixed } else { stable };
                prop_assert_eq!(config.resolve_dt(stable), base * factor);
            }

            #[test]
            fn courant_parses_back(courant in 0.01f64..1.0) {
                let text = courant.to_string();
                let p = params(&[
                    ("TIME_RECORD_LENGTH", "100"),
                    ("SOURCE_HALF_DURATION", "5"),
                    ("TIME_COURANT", text.as_str()),
                ]);
                let config = SolverConfig::from_params(&p).unwrap();
                prop_assert_eq!(config.courant, courant);
            }
        }
    }
}
