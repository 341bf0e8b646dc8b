//! Bang-bang heater regulator.
//!
//! Every tick runs the guards below in order; the first one that matches
//! decides the reason and the relay action, and nothing after it is
//! evaluated that tick:
//!
//! | # | guard | action | reason |
//! |---|-------|--------|--------|
//! | 1 | sample invalid or sensor unhealthy | force off | `SensorStale` |
//! | 2 | `value >= max_temp` | force off | `OverTempCutoff` |
//! | 3 | disabled or setpoint <= 0 | off once `min_on` has passed | `Disabled` |
//! | 4 | on, and on for less than `min_on` | hold | `MinOnHold` |
//! | 5 | off, and off for less than `min_off` | hold | `MinOffHold` |
//! | 6 | hysteresis band | on / off / hold | `BelowBand` / `AboveBand` / `Idle` |
//!
//! Only guards 1 and 2 switch off inside the minimum on time. A disabled
//! regulator keeps a freshly switched relay on until `min_on` has passed.
//! Forced-off commands are idempotent: a relay that is already off is not
//! switched again and keeps its switch timestamp.

use serde::{Deserialize, Serialize};
use tk_core::Real;
use tk_core::timing::{Millis, elapsed};
use tk_sensor::Sample;

use crate::config::RegulatorConfig;
use crate::reason::Reason;

/// Commanded relay level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayCommand {
    On,
    Off,
}

impl RelayCommand {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for RelayCommand {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Regulator memory carried from tick to tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatorState {
    /// Relay level as last committed.
    pub relay_on: bool,
    /// Time of the last actual relay transition. Anchor for dwell times.
    pub last_switch_ms: Millis,
    /// Reason produced by the last tick.
    pub reason: Reason,
    /// Time the current reason was first produced.
    pub reason_since_ms: Millis,
}

impl RegulatorState {
    /// Relay off, treated as switched off at `now`.
    pub fn new(now: Millis) -> Self {
        Self {
            relay_on: false,
            last_switch_ms: now,
            reason: Reason::Idle,
            reason_since_ms: now,
        }
    }
}

/// What the regulator sees on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// Most recently produced sample.
    pub sample: Sample,
    /// Acquisition health predicate at `now`.
    pub sensor_healthy: bool,
    pub now: Millis,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Level the relay should be at after this tick.
    pub command: RelayCommand,
    /// Whether `command` differs from the previous relay level.
    pub switched: bool,
    pub reason: Reason,
    /// State to carry into the next tick once the command is applied.
    pub state: RegulatorState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Relay off now, bypassing dwell times.
    ForceOff,
    /// Keep the current level.
    Hold,
    /// Drive to the given level; dwell guards have already passed.
    Drive(RelayCommand),
}

struct Context<'a> {
    config: &'a RegulatorConfig,
    state: &'a RegulatorState,
    input: &'a TickInput,
    since_switch: Millis,
}

impl Context<'_> {
    fn value(&self) -> Real {
        self.input.sample.value_c
    }
}

type Guard = fn(&Context<'_>) -> Option<(Reason, Action)>;

/// Priority order. The last guard always matches.
const GUARDS: [Guard; 6] = [
    sensor_stale,
    over_temperature,
    disabled,
    min_on_hold,
    min_off_hold,
    hysteresis_band,
];

fn sensor_stale(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    let usable = ctx.input.sensor_healthy && ctx.input.sample.valid && ctx.value().is_finite();
    (!usable).then_some((Reason::SensorStale, Action::ForceOff))
}

fn over_temperature(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    (ctx.value() >= ctx.config.max_temp_c)
        .then_some((Reason::OverTempCutoff, Action::ForceOff))
}

fn disabled(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    if ctx.config.enabled && ctx.config.setpoint_c > 0.0 {
        return None;
    }
    let action = if ctx.state.relay_on && ctx.since_switch < ctx.config.min_on_ms {
        Action::Hold
    } else {
        Action::ForceOff
    };
    Some((Reason::Disabled, action))
}

fn min_on_hold(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    (ctx.state.relay_on && ctx.since_switch < ctx.config.min_on_ms)
        .then_some((Reason::MinOnHold, Action::Hold))
}

fn min_off_hold(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    (!ctx.state.relay_on && ctx.since_switch < ctx.config.min_off_ms)
        .then_some((Reason::MinOffHold, Action::Hold))
}

fn hysteresis_band(ctx: &Context<'_>) -> Option<(Reason, Action)> {
    let (lo, hi) = ctx.config.band();
    let value = ctx.value();
    Some(if value <= lo {
        (Reason::BelowBand, Action::Drive(RelayCommand::On))
    } else if value >= hi {
        (Reason::AboveBand, Action::Drive(RelayCommand::Off))
    } else {
        (Reason::Idle, Action::Hold)
    })
}

/// Run the guard chain for one tick.
///
/// Pure: the caller applies `decision.command` to the output and then
/// adopts `decision.state`.
pub fn evaluate(config: &RegulatorConfig, state: &RegulatorState, input: &TickInput) -> Decision {
    let ctx = Context {
        config,
        state,
        input,
        since_switch: elapsed(input.now, state.last_switch_ms),
    };
    let (reason, action) = GUARDS
        .iter()
        .find_map(|guard| guard(&ctx))
        .unwrap_or((Reason::Idle, Action::Hold));

    let command = match action {
        Action::ForceOff => RelayCommand::Off,
        Action::Hold => RelayCommand::from(state.relay_on),
        Action::Drive(command) => command,
    };
    let switched = command.is_on() != state.relay_on;

    let mut next = *state;
    if switched {
        next.relay_on = command.is_on();
        next.last_switch_ms = input.now;
    }
    if reason != state.reason {
        next.reason = reason;
        next.reason_since_ms = input.now;
    }

    Decision {
        command,
        switched,
        reason,
        state: next,
    }
}

/// Time left on the dwell that is holding the relay, 0 otherwise.
pub fn remaining_dwell_ms(
    config: &RegulatorConfig,
    state: &RegulatorState,
    now: Millis,
) -> Millis {
    let dwell = match (state.reason, state.relay_on) {
        (Reason::MinOnHold, _) | (Reason::Disabled, true) => config.min_on_ms,
        (Reason::MinOffHold, _) => config.min_off_ms,
        _ => return 0,
    };
    dwell.saturating_sub(elapsed(now, state.last_switch_ms))
}
