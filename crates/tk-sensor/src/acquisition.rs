//! Non-blocking probe acquisition state machine.
//!
//! ```text
//! Idle{due} --due--> StartConversion --> WaitConversion{started} --done--> Read
//!   ^                       |                   |                           |
//!   |                   no device            timeout             ok or crc/range
//!   |                       v                   v                           v
//!   +------ ok: due = now + period; fault: due = now + (period << k) -------+
//! ```
//!
//! Every finished attempt, good or bad, produces exactly one [`Sample`] which
//! is returned from [`Acquisition::poll`] and handed to the subscribers.

use serde::{Deserialize, Serialize};
use tk_core::Real;
use tk_core::timing::{Millis, after, deadline_reached, elapsed};
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::bus::{ProbeBus, Resolution, RomCode, checksum_ok, decode_temp_c, in_valid_range};
use crate::error::{SensorFault, SensorResult};
use crate::filter::{Calibration, Ema, clamp_alpha};
use crate::registry::SubscriberRegistry;
use crate::sample::Sample;
use crate::stats::FaultCounters;

pub const MIN_PERIOD_MS: Millis = 100;
pub const MAX_PERIOD_MS: Millis = 600_000;
pub const DEFAULT_PERIOD_MS: Millis = 1000;

/// A started conversion that has not completed after this long is a timeout.
pub const CONVERSION_TIMEOUT_MS: Millis = 1500;

/// A valid sample older than this many periods no longer counts as healthy.
pub const STALE_PERIODS: Millis = 5;

/// Acquisition tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Time between successful conversions.
    pub period_ms: Millis,
    /// Probe resolution, 9..=12.
    pub resolution_bits: u8,
    /// EMA weight of the newest reading; 0 disables smoothing.
    pub ema_alpha: Real,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            resolution_bits: 12,
            ema_alpha: 0.0,
        }
    }
}

impl AcquisitionConfig {
    /// Same configuration with every field clamped to its legal range.
    pub fn sanitized(self) -> Self {
        Self {
            period_ms: clamp_period(self.period_ms),
            resolution_bits: Resolution::from_bits(self.resolution_bits).bits(),
            ema_alpha: clamp_alpha(self.ema_alpha),
        }
    }
}

pub fn clamp_period(ms: Millis) -> Millis {
    ms.clamp(MIN_PERIOD_MS, MAX_PERIOD_MS)
}

/// Acquisition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the next scheduled attempt.
    Idle { due: Millis },
    /// Attempt due: look up the device if needed and start a conversion.
    StartConversion,
    /// Conversion running on the probe.
    WaitConversion { started: Millis },
    /// Conversion done, scratchpad to be fetched and validated.
    Read,
}

/// Owns conversion scheduling, validation, filtering and fault handling for
/// one probe.
#[derive(Debug)]
pub struct Acquisition {
    phase: Phase,
    address: Option<RomCode>,
    period_ms: Millis,
    resolution: Resolution,
    resolution_pending: bool,
    /// Resolution the running conversion was started with.
    converting: Resolution,
    ema: Ema,
    calibration: Calibration,
    backoff: Backoff,
    latest: Sample,
    last_error: Option<SensorFault>,
    stats: FaultCounters,
    subscribers: SubscriberRegistry,
}

impl Acquisition {
    /// New acquisition whose first conversion starts on the first poll at or
    /// after `now`.
    pub fn new(config: AcquisitionConfig, now: Millis) -> Self {
        let config = config.sanitized();
        Self {
            phase: Phase::Idle { due: now },
            address: None,
            period_ms: config.period_ms,
            resolution: Resolution::from_bits(config.resolution_bits),
            resolution_pending: true,
            converting: Resolution::from_bits(config.resolution_bits),
            ema: Ema::new(config.ema_alpha),
            calibration: Calibration::default(),
            backoff: Backoff::default(),
            latest: Sample::default(),
            last_error: None,
            stats: FaultCounters::default(),
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// Look for the probe and configure it.
    ///
    /// Optional: [`poll`](Self::poll) performs the same discovery lazily.
    pub fn begin<B: ProbeBus + ?Sized>(&mut self, bus: &mut B) -> Result<RomCode, SensorFault> {
        match self.discover(bus) {
            Some(address) => Ok(address),
            None => {
                warn!("no temperature probe found on the bus");
                self.last_error = Some(SensorFault::NoDevice);
                Err(SensorFault::NoDevice)
            }
        }
    }

    /// Advance the state machine as far as it can go without waiting.
    ///
    /// Returns the sample produced by an attempt that finished during this
    /// call, if any.
    pub fn poll<B: ProbeBus + ?Sized>(&mut self, bus: &mut B, now: Millis) -> Option<Sample> {
        loop {
            match self.phase {
                Phase::Idle { due } => {
                    if !deadline_reached(now, due) {
                        return None;
                    }
                    self.phase = Phase::StartConversion;
                }
                Phase::StartConversion => {
                    let known = match self.address {
                        Some(address) => Some(address),
                        None => self.discover(bus),
                    };
                    let Some(address) = known else {
                        return Some(self.fail(SensorFault::NoDevice, now));
                    };
                    if self.resolution_pending {
                        bus.set_resolution(&address, self.resolution);
                        self.resolution_pending = false;
                    }
                    bus.begin_conversion(&address);
                    self.converting = self.resolution;
                    self.phase = Phase::WaitConversion { started: now };
                    return None;
                }
                Phase::WaitConversion { started } => {
                    if bus.conversion_complete() {
                        self.phase = Phase::Read;
                    } else if elapsed(now, started) > CONVERSION_TIMEOUT_MS {
                        return Some(self.fail(SensorFault::Timeout, now));
                    } else {
                        return None;
                    }
                }
                Phase::Read => return Some(self.read(bus, now)),
            }
        }
    }

    fn discover<B: ProbeBus + ?Sized>(&mut self, bus: &mut B) -> Option<RomCode> {
        let address = bus.search()?;
        bus.set_resolution(&address, self.resolution);
        self.resolution_pending = false;
        self.address = Some(address);
        info!(
            address = ?address,
            bits = self.resolution.bits(),
            "temperature probe found"
        );
        Some(address)
    }

    fn read<B: ProbeBus + ?Sized>(&mut self, bus: &mut B, now: Millis) -> Sample {
        let Some(address) = self.address else {
            return self.fail(SensorFault::NoDevice, now);
        };
        let pad = bus.read_scratchpad(&address);
        if !checksum_ok(&pad) {
            return self.fail(SensorFault::CrcFail, now);
        }
        let raw = decode_temp_c(&pad, self.converting);
        if !in_valid_range(raw) {
            return self.fail(SensorFault::RangeFail, now);
        }

        let value_c = self.calibration.apply(self.ema.apply(raw));
        self.backoff.reset();
        self.last_error = None;
        self.stats.record_ok();
        self.phase = Phase::Idle {
            due: after(now, self.period_ms),
        };
        debug!(raw, value_c, "probe sample");
        self.publish(Sample::valid(value_c, now))
    }

    fn fail(&mut self, fault: SensorFault, now: Millis) -> Sample {
        self.stats.record_fault(fault);
        self.last_error = Some(fault);
        self.backoff.on_fault();
        let delay = self.backoff.delay(self.period_ms);
        self.phase = Phase::Idle {
            due: after(now, delay),
        };
        warn!(
            fault = fault.as_str(),
            retry_in_ms = delay,
            "probe acquisition failed"
        );
        let sample = self.latest.invalidated();
        self.publish(sample)
    }

    fn publish(&mut self, sample: Sample) -> Sample {
        self.latest = sample;
        self.subscribers.notify(&sample);
        sample
    }

    /// Most recently produced sample.
    pub fn latest(&self) -> Sample {
        self.latest
    }

    /// Whether the latest sample is valid and recent enough to act on.
    pub fn healthy(&self, now: Millis) -> bool {
        self.latest.valid && self.latest.age_ms(now) <= self.stale_after_ms()
    }

    /// Age beyond which a valid sample stops counting as healthy.
    pub fn stale_after_ms(&self) -> Millis {
        self.period_ms.saturating_mul(STALE_PERIODS)
    }

    /// Fault of the most recent attempt, `None` after a success.
    pub fn last_error(&self) -> Option<SensorFault> {
        self.last_error
    }

    pub fn stats(&self) -> FaultCounters {
        self.stats
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time of the next scheduled attempt while idle.
    pub fn next_due(&self) -> Option<Millis> {
        match self.phase {
            Phase::Idle { due } => Some(due),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<RomCode> {
        self.address
    }

    pub fn backoff_exponent(&self) -> u8 {
        self.backoff.exponent()
    }

    /// Pull the next attempt forward to `now`. No effect mid-conversion.
    pub fn force_sample(&mut self, now: Millis) {
        if let Phase::Idle { .. } = self.phase {
            self.phase = Phase::Idle { due: now };
        }
    }

    pub fn config(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            period_ms: self.period_ms,
            resolution_bits: self.resolution.bits(),
            ema_alpha: self.ema.alpha(),
        }
    }

    /// Set the sampling period, clamped to `[100, 600000]` ms. Takes effect
    /// from the next scheduled attempt.
    pub fn set_period(&mut self, ms: Millis) -> Millis {
        self.period_ms = clamp_period(ms);
        self.period_ms
    }

    /// Set the probe resolution (clamped to 9..=12). Written to the probe
    /// before the next conversion; a running conversion is still decoded at
    /// the resolution it was started with.
    pub fn set_resolution(&mut self, bits: u8) -> Resolution {
        let resolution = Resolution::from_bits(bits);
        if resolution != self.resolution {
            self.resolution = resolution;
            self.resolution_pending = true;
        }
        self.resolution
    }

    pub fn set_ema(&mut self, alpha: Real) -> Real {
        self.ema.set_alpha(alpha)
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, gain: Real, offset: Real) -> Calibration {
        self.calibration.set(gain, offset);
        self.calibration
    }

    /// Register a callback for every produced sample.
    pub fn subscribe<F>(&mut self, callback: F) -> SensorResult<usize>
    where
        F: FnMut(&Sample) + 'static,
    {
        self.subscribers.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{SCRATCHPAD_LEN, Scratchpad, crc8};
    use crate::sim::{ProbeFault, SimProbe};
    use tk_core::{Clock, ManualClock};

    /// Bus that always answers with the same 9-bit scratchpad.
    struct FixedPad {
        pad: Scratchpad,
        written: Vec<Resolution>,
    }

    impl FixedPad {
        fn nine_bit(lsb: u8, msb: u8) -> Self {
            let mut pad = [0u8; SCRATCHPAD_LEN];
            pad[0] = lsb;
            pad[1] = msb;
            pad[4] = Resolution::Bits9.config_register();
            pad[8] = crc8(&pad[..8]);
            Self {
                pad,
                written: Vec::new(),
            }
        }
    }

    impl ProbeBus for FixedPad {
        fn search(&mut self) -> Option<RomCode> {
            Some([0x28, 1, 2, 3, 4, 5, 6, 0])
        }

        fn set_resolution(&mut self, _address: &RomCode, resolution: Resolution) {
            self.written.push(resolution);
        }

        fn begin_conversion(&mut self, _address: &RomCode) {}

        fn conversion_complete(&mut self) -> bool {
            true
        }

        fn read_scratchpad(&mut self, _address: &RomCode) -> Scratchpad {
            self.pad
        }
    }

    fn run_until_sample(
        acq: &mut Acquisition,
        probe: &mut SimProbe<&ManualClock>,
        clock: &ManualClock,
        step_ms: Millis,
    ) -> Sample {
        for _ in 0..100_000 {
            if let Some(s) = acq.poll(probe, clock.now_ms()) {
                return s;
            }
            clock.advance(step_ms);
        }
        panic!("no sample produced");
    }

    #[test]
    fn first_conversion_starts_immediately() {
        let clock = ManualClock::new(5000);
        let mut probe = SimProbe::new(&clock, 40.0);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), clock.now_ms());

        assert_eq!(acq.poll(&mut probe, clock.now_ms()), None);
        assert_eq!(acq.phase(), Phase::WaitConversion { started: 5000 });
        assert_eq!(probe.conversions(), 1);
    }

    #[test]
    fn successful_read_schedules_next_period() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);

        let s = run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert!(s.valid);
        assert_eq!(s.value_c, 40.0);
        assert_eq!(s.timestamp_ms, 750);
        assert_eq!(acq.next_due(), Some(1750));
        assert_eq!(acq.last_error(), None);
        assert_eq!(acq.stats().ok, 1);
    }

    #[test]
    fn period_is_clamped() {
        let mut acq = Acquisition::new(
            AcquisitionConfig {
                period_ms: 20,
                ..Default::default()
            },
            0,
        );
        assert_eq!(acq.config().period_ms, 100);
        assert_eq!(acq.set_period(0), 100);
        assert_eq!(acq.set_period(10_000_000), MAX_PERIOD_MS);
    }

    #[test]
    fn timeout_is_classified() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        probe.push_fault(ProbeFault::Timeout);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);

        let s = run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert!(!s.valid);
        assert!(clock.now_ms() > CONVERSION_TIMEOUT_MS);
        assert_eq!(acq.last_error(), Some(SensorFault::Timeout));
        assert_eq!(acq.stats().timeouts, 1);
        assert_eq!(acq.next_due(), Some(clock.now_ms() + 2000));
    }

    #[test]
    fn no_device_fails_and_backs_off() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        probe.set_present(false);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);
        assert_eq!(acq.begin(&mut probe), Err(SensorFault::NoDevice));

        let s = acq.poll(&mut probe, 0).unwrap();
        assert!(!s.valid);
        assert_eq!(acq.stats().no_device, 1);
        assert_eq!(acq.next_due(), Some(2000));

        // Probe plugged in later is picked up by the next attempt.
        probe.set_present(true);
        clock.set(2000);
        let s = run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert!(s.valid);
        assert_eq!(acq.address(), Some(probe.address()));
    }

    #[test]
    fn resolution_change_reaches_probe() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);
        run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert_eq!(probe.resolution(), Resolution::Bits12);

        acq.set_resolution(9);
        acq.force_sample(clock.now_ms());
        run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert_eq!(probe.resolution(), Resolution::Bits9);
    }

    #[test]
    fn resolution_change_mid_conversion_keeps_started_resolution() {
        // 0x0191 reads 25.0625 at 12 bits but 25.0 at 9 bits.
        let mut bus = FixedPad::nine_bit(0x91, 0x01);
        let config = AcquisitionConfig {
            resolution_bits: 9,
            ..Default::default()
        };
        let mut acq = Acquisition::new(config, 0);

        assert_eq!(acq.poll(&mut bus, 0), None);
        assert!(matches!(acq.phase(), Phase::WaitConversion { .. }));

        acq.set_resolution(12);
        let s = acq.poll(&mut bus, 10).unwrap();
        assert!(s.valid);
        assert_eq!(s.value_c, 25.0);
        assert_eq!(bus.written, vec![Resolution::Bits9]);
    }

    #[test]
    fn force_sample_pulls_attempt_forward() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);
        run_until_sample(&mut acq, &mut probe, &clock, 10);
        let now = clock.now_ms();
        acq.force_sample(now);
        assert_eq!(acq.next_due(), Some(now));
        acq.poll(&mut probe, now);
        assert!(matches!(acq.phase(), Phase::WaitConversion { .. }));

        // Mid-conversion the request is ignored.
        acq.force_sample(now + 5);
        assert!(matches!(acq.phase(), Phase::WaitConversion { .. }));
    }

    #[test]
    fn healthy_expires_after_five_periods() {
        let clock = ManualClock::new(0);
        let mut probe = SimProbe::new(&clock, 40.0);
        let mut acq = Acquisition::new(AcquisitionConfig::default(), 0);
        let s = run_until_sample(&mut acq, &mut probe, &clock, 10);
        assert!(acq.healthy(s.timestamp_ms));
        assert!(acq.healthy(s.timestamp_ms + 5000));
        assert!(!acq.healthy(s.timestamp_ms + 5001));
    }
}
