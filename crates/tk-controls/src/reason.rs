//! Why the regulator chose the current relay command.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one regulator tick. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Inside the hysteresis band, nothing to do.
    #[default]
    Idle,
    /// At or below the lower band edge: heating.
    BelowBand,
    /// At or above the upper band edge: not heating.
    AboveBand,
    /// Relay on for less than the minimum on time.
    MinOnHold,
    /// Relay off for less than the minimum off time.
    MinOffHold,
    /// No healthy, valid sample to act on.
    SensorStale,
    /// Temperature at or above the hard cutoff.
    OverTempCutoff,
    /// Regulation switched off by the operator.
    Disabled,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BelowBand => "below_band",
            Self::AboveBand => "above_band",
            Self::MinOnHold => "min_on_hold",
            Self::MinOffHold => "min_off_hold",
            Self::SensorStale => "sensor_stale",
            Self::OverTempCutoff => "over_temp_cutoff",
            Self::Disabled => "disabled",
        }
    }

    /// Safety reasons that switch the relay off regardless of dwell times.
    pub fn forces_off(&self) -> bool {
        matches!(self, Self::SensorStale | Self::OverTempCutoff)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_stable_names() {
        assert_eq!(Reason::OverTempCutoff.to_string(), "over_temp_cutoff");
        assert_eq!(Reason::MinOnHold.to_string(), "min_on_hold");
        assert_eq!(Reason::default(), Reason::Idle);
    }

    #[test]
    fn classification() {
        assert!(Reason::SensorStale.forces_off());
        assert!(Reason::OverTempCutoff.forces_off());
        assert!(!Reason::Disabled.forces_off());
        assert!(!Reason::AboveBand.forces_off());
    }
}
