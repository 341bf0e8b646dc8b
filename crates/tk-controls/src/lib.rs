//! Heater regulation for the tank controller.
//!
//! This crate decides what the heater relay should do from the latest probe
//! [`Sample`](tk_sensor::Sample) and drives the physical output line.
//!
//! # Architecture
//!
//! - [`regulator::evaluate`] is a pure function of (sample, config, state):
//!   an ordered list of guards is tried every tick and the first one that
//!   matches decides both the relay command and the [`Reason`].
//! - [`RegulatorConfig`] holds the operator tunables; every setter clamps to
//!   a safe range instead of failing.
//! - [`RelayLine`] maps on/off plus polarity onto an
//!   [`embedded_hal::digital::OutputPin`].
//!
//! Safety guards (stale sensor, over-temperature) always win over the
//! dwell-time guards. Disabling waits out the minimum on time, then switches
//! off. Dwell guards always win over the hysteresis band.

pub mod actuator;
pub mod config;
pub mod error;
pub mod reason;
pub mod regulator;

pub use actuator::{RelayLine, SimPin, level_for};
pub use config::RegulatorConfig;
pub use error::{ActuatorError, ActuatorResult};
pub use reason::Reason;
pub use regulator::{
    Decision, RegulatorState, RelayCommand, TickInput, evaluate, remaining_dwell_ms,
};
