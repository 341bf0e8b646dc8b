//! `HEAT <VERB> [args]` text commands.
//!
//! | line | effect | reply |
//! |------|--------|-------|
//! | `HEAT EN <0\|1\|ON\|OFF>` | enable / disable | `OK EN 1` |
//! | `HEAT SET <c>` | setpoint | `OK SET 45.00` |
//! | `HEAT HYS <c>` | hysteresis band width | `OK HYS 0.80` |
//! | `HEAT MAX <c>` | over-temperature cutoff | `OK MAX 60.00` |
//! | `HEAT MINS <on_ms> <off_ms>` | minimum on / off times | `OK MINS 5000 5000` |
//! | `HEAT SAVE` | write settings to the store | `OK SAVE` |
//! | `HEAT LOAD` | read settings from the store | `OK LOAD 8` |
//! | `HEAT STATUS` | status line | snapshot |
//!
//! Verbs are case-insensitive. Replies echo the value after clamping.

use core::str::FromStr;

use embedded_hal::digital::OutputPin;
use thiserror::Error;
use tk_config::ConfigStore;
use tk_core::{Millis, Real};
use tk_sensor::ProbeBus;

use crate::controller::TankController;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Enable(bool),
    Setpoint(Real),
    Hysteresis(Real),
    MaxTemp(Real),
    MinDwell { on_ms: Millis, off_ms: Millis },
    Save,
    Load,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("not a HEAT command: {0}")]
    NotHeat(String),

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("{verb} needs {expected}")]
    MissingArgument {
        verb: &'static str,
        expected: &'static str,
    },

    #[error("{verb}: cannot parse {value:?}")]
    BadArgument { verb: &'static str, value: String },

    #[error("{verb}: unexpected {extra:?}")]
    TrailingInput { verb: &'static str, extra: String },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        if !head.eq_ignore_ascii_case("HEAT") {
            return Err(CommandError::NotHeat(head.to_string()));
        }
        let verb = words.next().ok_or(CommandError::MissingArgument {
            verb: "HEAT",
            expected: "a verb",
        })?;
        let verb = verb.to_ascii_uppercase();

        let command = match verb.as_str() {
            "EN" => Command::Enable(parse_flag(words.next())?),
            "SET" => Command::Setpoint(parse_arg("SET", "a temperature", words.next())?),
            "HYS" => Command::Hysteresis(parse_arg("HYS", "a band width", words.next())?),
            "MAX" => Command::MaxTemp(parse_arg("MAX", "a temperature", words.next())?),
            "MINS" => Command::MinDwell {
                on_ms: parse_arg("MINS", "<on_ms> <off_ms>", words.next())?,
                off_ms: parse_arg("MINS", "<on_ms> <off_ms>", words.next())?,
            },
            "SAVE" => Command::Save,
            "LOAD" => Command::Load,
            "STATUS" => Command::Status,
            _ => return Err(CommandError::UnknownVerb(verb)),
        };

        if let Some(extra) = words.next() {
            return Err(CommandError::TrailingInput {
                verb: command.verb(),
                extra: extra.to_string(),
            });
        }
        Ok(command)
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        line.parse()
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Enable(_) => "EN",
            Self::Setpoint(_) => "SET",
            Self::Hysteresis(_) => "HYS",
            Self::MaxTemp(_) => "MAX",
            Self::MinDwell { .. } => "MINS",
            Self::Save => "SAVE",
            Self::Load => "LOAD",
            Self::Status => "STATUS",
        }
    }

    /// Whether the command changes a live setting without persisting it.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Enable(_)
                | Self::Setpoint(_)
                | Self::Hysteresis(_)
                | Self::MaxTemp(_)
                | Self::MinDwell { .. }
        )
    }
}

fn parse_flag(word: Option<&str>) -> Result<bool, CommandError> {
    let word = word.ok_or(CommandError::MissingArgument {
        verb: "EN",
        expected: "0, 1, ON or OFF",
    })?;
    match word.to_ascii_uppercase().as_str() {
        "1" | "ON" => Ok(true),
        "0" | "OFF" => Ok(false),
        _ => Err(CommandError::BadArgument {
            verb: "EN",
            value: word.to_string(),
        }),
    }
}

fn parse_arg<T: FromStr>(
    verb: &'static str,
    expected: &'static str,
    word: Option<&str>,
) -> Result<T, CommandError> {
    let word = word.ok_or(CommandError::MissingArgument { verb, expected })?;
    word.parse().map_err(|_| CommandError::BadArgument {
        verb,
        value: word.to_string(),
    })
}

/// Run one command against a controller and return the reply line.
pub fn execute<B, P, S>(
    controller: &mut TankController<B, P>,
    command: Command,
    store: &mut S,
    now: Millis,
) -> AppResult<String>
where
    B: ProbeBus,
    P: OutputPin,
    S: ConfigStore + ?Sized,
{
    let reply = match command {
        Command::Enable(on) => {
            controller.set_enabled(on);
            format!("OK EN {}", u8::from(controller.regulator_config().enabled))
        }
        Command::Setpoint(c) => format!("OK SET {:.2}", controller.set_setpoint(c)),
        Command::Hysteresis(c) => format!("OK HYS {:.2}", controller.set_hysteresis(c)),
        Command::MaxTemp(c) => format!("OK MAX {:.2}", controller.set_max_temp(c)),
        Command::MinDwell { on_ms, off_ms } => {
            let on_ms = controller.set_min_on_ms(on_ms);
            let off_ms = controller.set_min_off_ms(off_ms);
            format!("OK MINS {on_ms} {off_ms}")
        }
        Command::Save => {
            controller.save(store)?;
            "OK SAVE".to_string()
        }
        Command::Load => format!("OK LOAD {}", controller.load(store)?),
        Command::Status => controller.status(now).to_string(),
    };
    Ok(reply)
}
