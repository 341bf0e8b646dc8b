//! Simulated probe for host runs and tests.
//!
//! Conversions take the nominal time for the configured resolution on the
//! supplied clock. Faults are queued and consumed one per conversion.

use std::collections::VecDeque;

use tk_core::Real;
use tk_core::timing::{Clock, Millis, elapsed};

use crate::bus::{
    ProbeBus, Resolution, RomCode, SCRATCHPAD_LEN, Scratchpad, crc8, encode_scratchpad,
};

/// Fault injected into one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFault {
    /// The conversion never reports completion.
    Timeout,
    /// One scratchpad bit flips in transit.
    Corrupt,
    /// The bus reads back all zeros.
    Disconnected,
}

#[derive(Debug)]
pub struct SimProbe<C: Clock> {
    clock: C,
    address: RomCode,
    present: bool,
    temperature_c: Real,
    resolution: Resolution,
    started_at: Option<Millis>,
    active_fault: Option<ProbeFault>,
    queued: VecDeque<ProbeFault>,
    conversions: u32,
}

impl<C: Clock> SimProbe<C> {
    pub fn new(clock: C, temperature_c: Real) -> Self {
        let mut address = [0x28, 0xAA, 0x1C, 0x53, 0x12, 0x19, 0x01, 0x00];
        address[7] = crc8(&address[..7]);
        Self {
            clock,
            address,
            present: true,
            temperature_c,
            resolution: Resolution::default(),
            started_at: None,
            active_fault: None,
            queued: VecDeque::new(),
            conversions: 0,
        }
    }

    pub fn address(&self) -> RomCode {
        self.address
    }

    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    pub fn temperature_c(&self) -> Real {
        self.temperature_c
    }

    pub fn set_temperature(&mut self, temperature_c: Real) {
        self.temperature_c = temperature_c;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Queue a fault for a future conversion.
    pub fn push_fault(&mut self, fault: ProbeFault) {
        self.queued.push_back(fault);
    }

    /// Queue the same fault for the next `count` conversions.
    pub fn push_faults(&mut self, fault: ProbeFault, count: usize) {
        self.queued.extend(std::iter::repeat_n(fault, count));
    }

    /// Number of conversions started so far.
    pub fn conversions(&self) -> u32 {
        self.conversions
    }
}

impl<C: Clock> ProbeBus for SimProbe<C> {
    fn search(&mut self) -> Option<RomCode> {
        self.present.then_some(self.address)
    }

    fn set_resolution(&mut self, address: &RomCode, resolution: Resolution) {
        if self.present && *address == self.address {
            self.resolution = resolution;
        }
    }

    fn begin_conversion(&mut self, address: &RomCode) {
        self.conversions = self.conversions.wrapping_add(1);
        if !self.present || *address != self.address {
            self.started_at = None;
            self.active_fault = Some(ProbeFault::Disconnected);
            return;
        }
        self.started_at = Some(self.clock.now_ms());
        self.active_fault = self.queued.pop_front();
    }

    fn conversion_complete(&mut self) -> bool {
        match (self.active_fault, self.started_at) {
            (Some(ProbeFault::Timeout), _) => false,
            (_, Some(started)) => {
                elapsed(self.clock.now_ms(), started) >= self.resolution.conversion_ms()
            }
            // An absent device leaves the line pulled high: reads as "done".
            (_, None) => true,
        }
    }

    fn read_scratchpad(&mut self, _address: &RomCode) -> Scratchpad {
        match self.active_fault {
            Some(ProbeFault::Disconnected) => [0; SCRATCHPAD_LEN],
            Some(ProbeFault::Corrupt) => {
                let mut pad = encode_scratchpad(self.temperature_c, self.resolution);
                pad[0] ^= 0x04;
                pad
            }
            _ => encode_scratchpad(self.temperature_c, self.resolution),
        }
    }
}
