//! Read-only view of the controller for displays and the command surface.

use core::fmt;

use serde::{Deserialize, Serialize};
use tk_controls::Reason;
use tk_core::{Millis, Real};
use tk_sensor::{FaultCounters, Sample, SensorFault};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub sample: Sample,
    pub healthy: bool,
    pub relay_on: bool,
    pub reason: Reason,
    pub reason_since_ms: Millis,
    pub remaining_dwell_ms: Millis,
    pub setpoint_c: Real,
    pub hysteresis_c: Real,
    pub max_temp_c: Real,
    pub enabled: bool,
    pub last_error: Option<SensorFault>,
    pub stats: FaultCounters,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sample.value() {
            Some(t) => write!(f, "T={t:.2}C")?,
            None => f.write_str("T=--.--C")?,
        }
        write!(
            f,
            " {} relay={} reason={} sp={:.2} hys={:.2} max={:.2} en={}",
            if self.healthy { "ok" } else { "stale" },
            if self.relay_on { "ON" } else { "OFF" },
            self.reason,
            self.setpoint_c,
            self.hysteresis_c,
            self.max_temp_c,
            u8::from(self.enabled),
        )?;
        if self.remaining_dwell_ms > 0 {
            write!(f, " dwell={}ms", self.remaining_dwell_ms)?;
        }
        if let Some(fault) = self.last_error {
            write!(f, " err={}", fault.as_str())?;
        }
        Ok(())
    }
}
