//! Operator tunables for the heater regulator.
//!
//! Setters never fail. Out-of-range input is clamped into the safe range and
//! non-finite input leaves the current value in place, so the configuration
//! is always operable.

use serde::{Deserialize, Serialize};
use tk_core::{Millis, Real, clamp_finite};
use tracing::warn;

pub const SETPOINT_RANGE_C: (Real, Real) = (5.0, 70.0);
pub const HYSTERESIS_RANGE_C: (Real, Real) = (0.2, 5.0);
pub const MAX_TEMP_RANGE_C: (Real, Real) = (30.0, 80.0);
pub const DWELL_RANGE_MS: (Millis, Millis) = (1000, 600_000);

/// Regulator configuration.
///
/// `hysteresis_c` is the full width of the dead band centred on the
/// setpoint: the relay turns on at `setpoint - hysteresis/2` and off at
/// `setpoint + hysteresis/2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorConfig {
    /// Target temperature (°C).
    pub setpoint_c: Real,
    /// Full hysteresis band width (°C).
    pub hysteresis_c: Real,
    /// Hard over-temperature cutoff (°C).
    pub max_temp_c: Real,
    /// Minimum time the relay stays on once switched on.
    pub min_on_ms: Millis,
    /// Minimum time the relay stays off once switched off.
    pub min_off_ms: Millis,
    /// Regulation enabled.
    pub enabled: bool,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            setpoint_c: 45.0,
            hysteresis_c: 0.8,
            max_temp_c: 60.0,
            min_on_ms: 5000,
            min_off_ms: 5000,
            enabled: true,
        }
    }
}

impl RegulatorConfig {
    pub fn set_setpoint(&mut self, c: Real) -> Real {
        self.setpoint_c = clamp_or_keep(self.setpoint_c, c, SETPOINT_RANGE_C, "setpoint");
        self.setpoint_c
    }

    pub fn set_hysteresis(&mut self, c: Real) -> Real {
        self.hysteresis_c = clamp_or_keep(self.hysteresis_c, c, HYSTERESIS_RANGE_C, "hysteresis");
        self.hysteresis_c
    }

    pub fn set_max_temp(&mut self, c: Real) -> Real {
        self.max_temp_c = clamp_or_keep(self.max_temp_c, c, MAX_TEMP_RANGE_C, "max temperature");
        self.max_temp_c
    }

    pub fn set_min_on_ms(&mut self, ms: Millis) -> Millis {
        self.min_on_ms = ms.clamp(DWELL_RANGE_MS.0, DWELL_RANGE_MS.1);
        self.min_on_ms
    }

    pub fn set_min_off_ms(&mut self, ms: Millis) -> Millis {
        self.min_off_ms = ms.clamp(DWELL_RANGE_MS.0, DWELL_RANGE_MS.1);
        self.min_off_ms
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Half of the band width: distance from the setpoint to either edge.
    pub fn half_band(&self) -> Real {
        self.hysteresis_c * 0.5
    }

    /// Lower and upper band edges.
    pub fn band(&self) -> (Real, Real) {
        let half = self.half_band();
        (self.setpoint_c - half, self.setpoint_c + half)
    }

    /// Same configuration passed through every setter.
    pub fn sanitized(self) -> Self {
        let mut cfg = Self::default();
        cfg.set_setpoint(self.setpoint_c);
        cfg.set_hysteresis(self.hysteresis_c);
        cfg.set_max_temp(self.max_temp_c);
        cfg.set_min_on_ms(self.min_on_ms);
        cfg.set_min_off_ms(self.min_off_ms);
        cfg.set_enabled(self.enabled);
        cfg
    }
}

fn clamp_or_keep(current: Real, value: Real, range: (Real, Real), what: &'static str) -> Real {
    match clamp_finite(value, range.0, range.1, what) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "keeping {what} at {current}");
            current
        }
    }
}
