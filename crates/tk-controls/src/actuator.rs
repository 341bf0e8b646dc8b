//! Heater relay output line.
//!
//! The regulator thinks in "heater on / heater off". Whether that means a
//! high or a low level on the pin depends on the relay module, which is
//! fixed at startup by the polarity flag.

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin, PinState};

use crate::error::{ActuatorError, ActuatorResult};

/// Physical pin level for a logical command under the given polarity.
pub fn level_for(active_high: bool, on: bool) -> PinState {
    PinState::from(on == active_high)
}

/// Relay driven through one digital output.
#[derive(Debug)]
pub struct RelayLine<P> {
    pin: P,
    active_high: bool,
    on: bool,
}

impl<P: OutputPin> RelayLine<P> {
    /// Take the pin and drive it to the "off" level straight away.
    pub fn new(pin: P, active_high: bool) -> ActuatorResult<Self> {
        let mut line = Self {
            pin,
            active_high,
            on: false,
        };
        line.write(false)?;
        Ok(line)
    }

    /// Drive the relay. On error the tracked state is left unchanged.
    pub fn apply(&mut self, on: bool) -> ActuatorResult<()> {
        self.write(on)?;
        self.on = on;
        Ok(())
    }

    fn write(&mut self, on: bool) -> ActuatorResult<()> {
        self.pin
            .set_state(level_for(self.active_high, on))
            .map_err(|e| ActuatorError::Write {
                kind: digital::Error::kind(&e),
            })
    }

    /// Last successfully written logical state.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn active_high(&self) -> bool {
        self.active_high
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

/// Error of a [`SimPin`] set to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinFault;

impl digital::Error for SimPinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// In-memory output pin for host runs and tests.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    high: bool,
    writes: u32,
    failing: bool,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    fn drive(&mut self, high: bool) -> Result<(), SimPinFault> {
        if self.failing {
            return Err(SimPinFault);
        }
        self.high = high;
        self.writes += 1;
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinFault;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}
