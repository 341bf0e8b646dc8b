//! Keys and value shapes of the persistent settings.

use core::fmt;

use serde::{Deserialize, Serialize};
use tk_core::{Millis, Real};

/// One persisted setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    Setpoint,
    Hysteresis,
    Enabled,
    MaxTemp,
    MinOnMs,
    MinOffMs,
    CalGain,
    CalOffset,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 8] = [
        Self::Setpoint,
        Self::Hysteresis,
        Self::Enabled,
        Self::MaxTemp,
        Self::MinOnMs,
        Self::MinOffMs,
        Self::CalGain,
        Self::CalOffset,
    ];

    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setpoint => "setpoint",
            Self::Hysteresis => "hysteresis",
            Self::Enabled => "enabled",
            Self::MaxTemp => "max_temp",
            Self::MinOnMs => "min_on_ms",
            Self::MinOffMs => "min_off_ms",
            Self::CalGain => "cal_gain",
            Self::CalOffset => "cal_offset",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Flag(bool),
    Millis(Millis),
    Real(Real),
}

impl Scalar {
    /// Numeric value; whole-number entries are accepted as reals.
    pub fn as_real(&self) -> Option<Real> {
        match *self {
            Self::Real(v) => Some(v),
            Self::Millis(v) => Some(v as Real),
            Self::Flag(_) => None,
        }
    }

    pub fn as_millis(&self) -> Option<Millis> {
        match *self {
            Self::Millis(v) => Some(v),
            Self::Real(v) if v >= 0.0 && v.fract() == 0.0 && v <= Millis::MAX as Real => {
                Some(v as Millis)
            }
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match *self {
            Self::Flag(v) => Some(v),
            _ => None,
        }
    }
}
