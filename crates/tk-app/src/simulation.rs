//! Closed-loop host simulation: simulated probe, demo plant, virtual clock.

use std::rc::Rc;

use tk_config::ControllerSettings;
use tk_controls::{Decision, SimPin};
use tk_core::{Clock, ManualClock, Millis, Real};
use tk_sensor::{ProbeFault, SimProbe};

use crate::controller::TankController;
use crate::error::AppResult;
use crate::plant::{PlantParams, SimTank};

pub type SimController = TankController<SimProbe<Rc<ManualClock>>, SimPin>;

/// Everything needed to run the controller without hardware.
#[derive(Debug)]
pub struct Simulation {
    clock: Rc<ManualClock>,
    tank: SimTank,
    controller: SimController,
}

impl Simulation {
    pub fn new(
        settings: &ControllerSettings,
        plant: PlantParams,
        initial_c: Real,
    ) -> AppResult<Self> {
        let clock = Rc::new(ManualClock::new(0));
        let tank = SimTank::new(plant, initial_c)?;
        let probe = SimProbe::new(Rc::clone(&clock), initial_c);
        let controller = TankController::new(probe, SimPin::new(), settings, clock.now_ms())?;
        Ok(Self {
            clock,
            tank,
            controller,
        })
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Advance the virtual clock by `dt_ms` and run one control cycle.
    ///
    /// The plant integrates over the step with the relay level that was in
    /// force during it.
    pub fn step(&mut self, dt_ms: Millis) -> AppResult<Decision> {
        let heater_on = self.controller.relay().is_on();
        let temperature_c = self.tank.step(dt_ms, heater_on);
        self.controller.bus_mut().set_temperature(temperature_c);
        let now = self.clock.advance(dt_ms);
        self.controller.tick(now)
    }

    /// Queue a fault for one of the next conversions.
    pub fn inject(&mut self, fault: ProbeFault) {
        self.controller.bus_mut().push_fault(fault);
    }

    pub fn tank(&self) -> &SimTank {
        &self.tank
    }

    pub fn controller(&self) -> &SimController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SimController {
        &mut self.controller
    }
}
