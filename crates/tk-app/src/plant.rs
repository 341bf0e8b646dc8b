//! Lumped thermal model of the tank for simulation runs.
//!
//! Dynamics: dT/dt = (T_ambient - T) / tau + heating rate while the heater
//! is on. Only good enough to exercise the control loop.

use serde::{Deserialize, Serialize};
use tk_core::{Millis, Real, TkError, TkResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Surrounding temperature (°C).
    pub ambient_c: Real,
    /// Heat loss time constant (s).
    pub tau_s: Real,
    /// Temperature rise with the heater on and no losses (°C/s).
    pub heating_c_per_s: Real,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            ambient_c: 20.0,
            tau_s: 1800.0,
            heating_c_per_s: 0.05,
        }
    }
}

impl PlantParams {
    pub fn validate(&self) -> TkResult<()> {
        if !(self.tau_s.is_finite() && self.tau_s > 0.0) {
            return Err(TkError::InvalidArg {
                what: "tau_s must be positive",
            });
        }
        if !self.ambient_c.is_finite() || !self.heating_c_per_s.is_finite() {
            return Err(TkError::InvalidArg {
                what: "plant parameters must be finite",
            });
        }
        Ok(())
    }

    /// Temperature derivative (°C/s).
    pub fn dtdt(&self, temperature_c: Real, heater_on: bool) -> Real {
        let loss = (self.ambient_c - temperature_c) / self.tau_s;
        if heater_on {
            loss + self.heating_c_per_s
        } else {
            loss
        }
    }
}

/// Tank water temperature driven by the heater relay.
#[derive(Debug, Clone)]
pub struct SimTank {
    params: PlantParams,
    temperature_c: Real,
}

impl SimTank {
    pub fn new(params: PlantParams, initial_c: Real) -> TkResult<Self> {
        params.validate()?;
        let temperature_c = tk_core::ensure_finite(initial_c, "initial temperature")?;
        Ok(Self {
            params,
            temperature_c,
        })
    }

    pub fn temperature_c(&self) -> Real {
        self.temperature_c
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// Advance by `dt_ms` with the heater held at `heater_on`.
    pub fn step(&mut self, dt_ms: Millis, heater_on: bool) -> Real {
        let dt_s = dt_ms as Real / 1000.0;
        self.temperature_c += self.params.dtdt(self.temperature_c, heater_on) * dt_s;
        self.temperature_c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heats_while_on_and_cools_towards_ambient() {
        let mut tank = SimTank::new(PlantParams::default(), 40.0).unwrap();
        let heated = tank.step(10_000, true);
        assert!(heated > 40.0);
        let cooled = tank.step(10_000, false);
        assert!(cooled < heated);
        assert!(cooled > PlantParams::default().ambient_c);
    }

    #[test]
    fn settles_at_ambient_when_off() {
        let mut tank = SimTank::new(PlantParams::default(), 20.0).unwrap();
        tank.step(60_000, false);
        assert!((tank.temperature_c() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_non_positive_time_constant() {
        let params = PlantParams {
            tau_s: 0.0,
            ..Default::default()
        };
        assert!(SimTank::new(params, 20.0).is_err());
    }
}
