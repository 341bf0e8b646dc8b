//! Integration tests for the regulator guard chain.

use proptest::prelude::*;
use tk_controls::{
    Reason, RegulatorConfig, RegulatorState, RelayCommand, RelayLine, SimPin, TickInput, evaluate,
};
use tk_core::{Millis, Real};
use tk_sensor::Sample;

fn valid_tick(value_c: Real, now: Millis) -> TickInput {
    TickInput {
        sample: Sample::valid(value_c, now),
        sensor_healthy: true,
        now,
    }
}

#[test]
fn band_edges_with_zero_dwell() {
    // Dwell times of zero are below the setter range and only reachable by
    // building the struct directly.
    let config = RegulatorConfig {
        setpoint_c: 45.0,
        hysteresis_c: 0.8,
        max_temp_c: 60.0,
        min_on_ms: 0,
        min_off_ms: 0,
        enabled: true,
    };
    let mut state = RegulatorState::new(0);
    let mut trace = Vec::new();
    for (i, value) in [44.0, 44.4, 45.2, 45.39, 45.4, 45.0, 44.61, 44.6]
        .into_iter()
        .enumerate()
    {
        let d = evaluate(&config, &state, &valid_tick(value, i as Millis * 1000));
        state = d.state;
        trace.push((value, d.command, d.reason));
    }

    assert_eq!(
        trace,
        vec![
            (44.0, RelayCommand::On, Reason::BelowBand),
            (44.4, RelayCommand::On, Reason::BelowBand),
            (45.2, RelayCommand::On, Reason::Idle),
            (45.39, RelayCommand::On, Reason::Idle),
            (45.4, RelayCommand::Off, Reason::AboveBand),
            (45.0, RelayCommand::Off, Reason::Idle),
            (44.61, RelayCommand::Off, Reason::Idle),
            (44.6, RelayCommand::On, Reason::BelowBand),
        ]
    );
}

#[test]
fn stale_sensor_forces_off_with_relay_line() {
    let config = RegulatorConfig::default();
    let mut line = RelayLine::new(SimPin::new(), true).unwrap();
    let mut state = RegulatorState::new(0);

    let d = evaluate(&config, &state, &valid_tick(30.0, 6000));
    assert!(d.switched);
    line.apply(d.command.is_on()).unwrap();
    state = d.state;
    assert!(line.pin().is_high());

    // Sensor goes quiet while the relay is still inside its minimum on time.
    let d = evaluate(
        &config,
        &state,
        &TickInput {
            sample: Sample::valid(30.0, 6000).invalidated(),
            sensor_healthy: false,
            now: 7000,
        },
    );
    assert_eq!(d.reason, Reason::SensorStale);
    assert!(d.switched);
    line.apply(d.command.is_on()).unwrap();
    assert!(!line.pin().is_high());
}

#[derive(Debug, Clone)]
struct Step {
    value_c: Real,
    valid: bool,
    healthy: bool,
    dt_ms: Millis,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (20.0f32..75.0, prop::bool::weighted(0.9), prop::bool::weighted(0.9), 0u32..4000).prop_map(
        |(value_c, valid, healthy, dt_ms)| Step {
            value_c,
            valid,
            healthy,
            dt_ms,
        },
    )
}

fn config_strategy() -> impl Strategy<Value = RegulatorConfig> {
    (
        20.0f32..60.0,
        0.2f32..5.0,
        30.0f32..80.0,
        1000u32..10_000,
        1000u32..10_000,
        prop::bool::weighted(0.8),
    )
        .prop_map(|(sp, hys, max, on, off, enabled)| {
            let mut cfg = RegulatorConfig::default();
            cfg.set_setpoint(sp);
            cfg.set_hysteresis(hys);
            cfg.set_max_temp(max);
            cfg.set_min_on_ms(on);
            cfg.set_min_off_ms(off);
            cfg.set_enabled(enabled);
            cfg
        })
}

proptest! {
    #[test]
    fn transitions_respect_dwell_unless_forced(
        config in config_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..200),
    ) {
        let mut now: Millis = 0;
        let mut state = RegulatorState::new(now);
        for step in steps {
            now += step.dt_ms;
            let sample = if step.valid {
                Sample::valid(step.value_c, now)
            } else {
                Sample::valid(step.value_c, now).invalidated()
            };
            let input = TickInput {
                sample,
                sensor_healthy: step.healthy,
                now,
            };
            let d = evaluate(&config, &state, &input);
            let since = now - state.last_switch_ms;

            if d.switched {
                if d.command.is_on() {
                    prop_assert!(since >= config.min_off_ms);
                    prop_assert_eq!(d.reason, Reason::BelowBand);
                } else {
                    prop_assert!(since >= config.min_on_ms || d.reason.forces_off());
                }
                prop_assert_eq!(d.state.last_switch_ms, now);
            } else {
                prop_assert_eq!(d.state.last_switch_ms, state.last_switch_ms);
            }

            if step.valid && step.healthy && step.value_c >= config.max_temp_c {
                prop_assert_eq!(d.command, RelayCommand::Off);
                prop_assert_eq!(d.reason, Reason::OverTempCutoff);
            }
            if !step.valid || !step.healthy {
                prop_assert_eq!(d.command, RelayCommand::Off);
                prop_assert_eq!(d.reason, Reason::SensorStale);
            }
            state = d.state;
        }
    }
}
