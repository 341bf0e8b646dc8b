//! Smoothing and calibration applied to decoded readings.
//!
//! Order is fixed: the EMA runs on the raw probe value, calibration is
//! applied to the smoothed value. Changing the calibration therefore never
//! disturbs the filter history.

use serde::{Deserialize, Serialize};
use tk_core::{Real, clamp_finite};
use tracing::warn;

/// Allowed calibration gain.
pub const GAIN_RANGE: (Real, Real) = (0.5, 1.5);

/// Allowed calibration offset in °C.
pub const OFFSET_RANGE: (Real, Real) = (-10.0, 10.0);

/// Exponential moving average: `y = α·x + (1-α)·y_prev`.
///
/// `α = 0` is a pass-through. The first input seeds the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    alpha: Real,
    value: Option<Real>,
}

impl Default for Ema {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Ema {
    pub fn new(alpha: Real) -> Self {
        Self {
            alpha: clamp_alpha(alpha),
            value: None,
        }
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }

    /// Change the weight without dropping the history.
    pub fn set_alpha(&mut self, alpha: Real) -> Real {
        self.alpha = clamp_alpha(alpha);
        self.alpha
    }

    /// Feed one raw value and return the filtered value.
    pub fn apply(&mut self, raw: Real) -> Real {
        let next = match self.value {
            Some(prev) if self.alpha > 0.0 => self.alpha * raw + (1.0 - self.alpha) * prev,
            _ => raw,
        };
        self.value = Some(next);
        next
    }
}

/// Smoothing weight clamped to `[0, 1]`; non-finite input disables smoothing.
pub fn clamp_alpha(alpha: Real) -> Real {
    clamp_finite(alpha, 0.0, 1.0, "ema alpha").unwrap_or(0.0)
}

/// Linear correction `gain·x + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub gain: Real,
    pub offset: Real,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    pub fn apply(&self, value: Real) -> Real {
        self.gain * value + self.offset
    }

    /// Set both terms. Out-of-range values are clamped, non-finite values
    /// leave the corresponding term unchanged.
    pub fn set(&mut self, gain: Real, offset: Real) {
        self.set_gain(gain);
        self.set_offset(offset);
    }

    pub fn set_gain(&mut self, gain: Real) {
        match clamp_finite(gain, GAIN_RANGE.0, GAIN_RANGE.1, "calibration gain") {
            Ok(g) => self.gain = g,
            Err(e) => warn!(error = %e, "keeping calibration gain {}", self.gain),
        }
    }

    pub fn set_offset(&mut self, offset: Real) {
        match clamp_finite(offset, OFFSET_RANGE.0, OFFSET_RANGE.1, "calibration offset") {
            Ok(o) => self.offset = o,
            Err(e) => warn!(error = %e, "keeping calibration offset {}", self.offset),
        }
    }

    /// Same calibration passed through the setter clamps.
    pub fn sanitized(self) -> Self {
        let mut cal = Self::default();
        cal.set(self.gain, self.offset);
        cal
    }
}
