//! The filtered, calibrated reading handed to consumers.

use serde::{Deserialize, Serialize};
use tk_core::Real;
use tk_core::timing::{Millis, elapsed};

/// One acquisition outcome.
///
/// A sample is produced for every finished conversion attempt, successful or
/// not. A failed attempt yields `valid == false` and carries forward the last
/// good value and its timestamp, so its age keeps growing; `value_c` of an
/// invalid sample must not be read as current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Filtered and calibrated temperature in °C.
    pub value_c: Real,
    /// Counter value of the last successful reading.
    pub timestamp_ms: Millis,
    /// Whether `value_c` is trustworthy.
    pub valid: bool,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            value_c: Real::NAN,
            timestamp_ms: 0,
            valid: false,
        }
    }
}

impl Sample {
    pub fn valid(value_c: Real, timestamp_ms: Millis) -> Self {
        Self {
            value_c,
            timestamp_ms,
            valid: true,
        }
    }

    /// Same reading, marked as no longer trustworthy.
    pub fn invalidated(&self) -> Self {
        Self {
            valid: false,
            ..*self
        }
    }

    /// Age relative to `now`.
    pub fn age_ms(&self, now: Millis) -> Millis {
        elapsed(now, self.timestamp_ms)
    }

    /// The value, if the sample is valid.
    pub fn value(&self) -> Option<Real> {
        self.valid.then_some(self.value_c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sample_is_invalid() {
        let s = Sample::default();
        assert!(!s.valid);
        assert!(s.value_c.is_nan());
        assert_eq!(s.value(), None);
    }

    #[test]
    fn invalidated_keeps_value_and_timestamp() {
        let s = Sample::valid(44.5, 1200);
        let stale = s.invalidated();
        assert!(!stale.valid);
        assert_eq!(stale.value_c, 44.5);
        assert_eq!(stale.timestamp_ms, 1200);
        assert_eq!(stale.age_ms(4200), 3000);
    }
}
