//! Per-cycle wiring of probe, regulator and relay.

use embedded_hal::digital::OutputPin;
use tk_config::{ConfigStore, ControllerSettings, load_settings, save_settings};
use tk_controls::{
    Decision, RegulatorConfig, RegulatorState, RelayLine, TickInput, evaluate, remaining_dwell_ms,
};
use tk_core::{Millis, Real};
use tk_sensor::{
    Acquisition, AcquisitionConfig, Calibration, ProbeBus, Resolution, Sample, SensorResult,
};
use tracing::{error, info};

use crate::error::AppResult;
use crate::status::StatusSnapshot;

/// One tank: a probe bus, its acquisition, the regulator and the relay.
///
/// The controller is the only writer of the relay line. Call
/// [`tick`](Self::tick) from the main loop with the current millisecond
/// counter; nothing in it blocks.
#[derive(Debug)]
pub struct TankController<B, P> {
    bus: B,
    acquisition: Acquisition,
    config: RegulatorConfig,
    state: RegulatorState,
    relay: RelayLine<P>,
}

impl<B: ProbeBus, P: OutputPin> TankController<B, P> {
    /// Build a controller with the relay driven off.
    pub fn new(bus: B, pin: P, settings: &ControllerSettings, now: Millis) -> AppResult<Self> {
        let settings = settings.clone().sanitized();
        let relay = RelayLine::new(pin, settings.relay.active_high)?;
        info!(
            active_high = relay.active_high(),
            "heater relay initialised off"
        );

        let mut acquisition = Acquisition::new(settings.acquisition, now);
        acquisition.set_calibration(settings.calibration.gain, settings.calibration.offset);

        Ok(Self {
            bus,
            acquisition,
            config: settings.regulator,
            state: RegulatorState::new(now),
            relay,
        })
    }

    /// Look for the probe now instead of on the first due attempt.
    pub fn begin(&mut self) -> bool {
        self.acquisition.begin(&mut self.bus).is_ok()
    }

    /// Run one control cycle.
    ///
    /// The new regulator state is only adopted once the relay write has
    /// succeeded, so a failed write never reports the relay as switched.
    pub fn tick(&mut self, now: Millis) -> AppResult<Decision> {
        self.acquisition.poll(&mut self.bus, now);

        let input = TickInput {
            sample: self.acquisition.latest(),
            sensor_healthy: self.acquisition.healthy(now),
            now,
        };
        let decision = evaluate(&self.config, &self.state, &input);

        if decision.switched {
            if let Err(e) = self.relay.apply(decision.command.is_on()) {
                error!(error = %e, command = ?decision.command, "heater relay write failed");
                return Err(e.into());
            }
            info!(
                on = decision.command.is_on(),
                reason = %decision.reason,
                value_c = input.sample.value_c,
                "heater relay switched"
            );
        } else if decision.reason != self.state.reason {
            info!(reason = %decision.reason, "regulator reason changed");
        }
        self.state = decision.state;
        Ok(decision)
    }

    pub fn status(&self, now: Millis) -> StatusSnapshot {
        let acquisition = &self.acquisition;
        StatusSnapshot {
            sample: acquisition.latest(),
            healthy: acquisition.healthy(now),
            relay_on: self.state.relay_on,
            reason: self.state.reason,
            reason_since_ms: self.state.reason_since_ms,
            remaining_dwell_ms: remaining_dwell_ms(&self.config, &self.state, now),
            setpoint_c: self.config.setpoint_c,
            hysteresis_c: self.config.hysteresis_c,
            max_temp_c: self.config.max_temp_c,
            enabled: self.config.enabled,
            last_error: acquisition.last_error(),
            stats: acquisition.stats(),
        }
    }

    // Regulator tunables. Each returns the value actually applied.

    pub fn set_setpoint(&mut self, c: Real) -> Real {
        self.config.set_setpoint(c)
    }

    pub fn set_hysteresis(&mut self, c: Real) -> Real {
        self.config.set_hysteresis(c)
    }

    pub fn set_max_temp(&mut self, c: Real) -> Real {
        self.config.set_max_temp(c)
    }

    pub fn set_min_on_ms(&mut self, ms: Millis) -> Millis {
        self.config.set_min_on_ms(ms)
    }

    pub fn set_min_off_ms(&mut self, ms: Millis) -> Millis {
        self.config.set_min_off_ms(ms)
    }

    /// Enable or disable regulation. A disabled controller switches the relay
    /// off once the minimum on time has passed.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.set_enabled(enabled);
    }

    pub fn regulator_config(&self) -> &RegulatorConfig {
        &self.config
    }

    pub fn regulator_state(&self) -> &RegulatorState {
        &self.state
    }

    // Acquisition tunables.

    pub fn set_period(&mut self, ms: Millis) -> Millis {
        self.acquisition.set_period(ms)
    }

    pub fn set_resolution(&mut self, bits: u8) -> Resolution {
        self.acquisition.set_resolution(bits)
    }

    pub fn set_ema(&mut self, alpha: Real) -> Real {
        self.acquisition.set_ema(alpha)
    }

    pub fn set_calibration(&mut self, gain: Real, offset: Real) -> Calibration {
        self.acquisition.set_calibration(gain, offset)
    }

    pub fn force_sample(&mut self, now: Millis) {
        self.acquisition.force_sample(now);
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SensorResult<usize>
    where
        F: FnMut(&Sample) + 'static,
    {
        self.acquisition.subscribe(callback)
    }

    pub fn acquisition(&self) -> &Acquisition {
        &self.acquisition
    }

    pub fn acquisition_config(&self) -> AcquisitionConfig {
        self.acquisition.config()
    }

    pub fn relay(&self) -> &RelayLine<P> {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut RelayLine<P> {
        &mut self.relay
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    // Persistence. Never called from `tick`.

    pub fn save<S: ConfigStore + ?Sized>(&self, store: &mut S) -> AppResult<()> {
        save_settings(store, &self.config, &self.acquisition.calibration())?;
        info!("settings saved");
        Ok(())
    }

    /// Apply stored settings; returns how many were found and applied.
    pub fn load<S: ConfigStore + ?Sized>(&mut self, store: &S) -> AppResult<usize> {
        let mut calibration = self.acquisition.calibration();
        let applied = load_settings(store, &mut self.config, &mut calibration)?;
        self.acquisition
            .set_calibration(calibration.gain, calibration.offset);
        info!(applied, "settings loaded");
        Ok(applied)
    }
}
