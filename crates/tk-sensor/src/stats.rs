use serde::{Deserialize, Serialize};

use crate::error::SensorFault;

/// Monotonic outcome counters. Diagnostic only, reset only by constructing a
/// new acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCounters {
    pub ok: u32,
    pub timeouts: u32,
    pub crc: u32,
    pub range: u32,
    pub no_device: u32,
}

impl FaultCounters {
    pub fn record_ok(&mut self) {
        self.ok = self.ok.saturating_add(1);
    }

    pub fn record_fault(&mut self, fault: SensorFault) {
        let slot = match fault {
            SensorFault::NoDevice => &mut self.no_device,
            SensorFault::Timeout => &mut self.timeouts,
            SensorFault::CrcFail => &mut self.crc,
            SensorFault::RangeFail => &mut self.range,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total failed attempts of any kind.
    pub fn faults(&self) -> u32 {
        self.timeouts
            .saturating_add(self.crc)
            .saturating_add(self.range)
            .saturating_add(self.no_device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let mut c = FaultCounters::default();
        c.record_ok();
        c.record_fault(SensorFault::CrcFail);
        c.record_fault(SensorFault::CrcFail);
        c.record_fault(SensorFault::Timeout);
        assert_eq!(c.ok, 1);
        assert_eq!(c.crc, 2);
        assert_eq!(c.timeouts, 1);
        assert_eq!(c.faults(), 3);
    }
}
