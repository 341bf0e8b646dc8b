//! Mapping between the live tunables and the scalar store.

use tk_controls::RegulatorConfig;
use tk_sensor::Calibration;
use tracing::{debug, warn};

use crate::keys::{ConfigKey, Scalar};
use crate::store::ConfigStore;
use crate::{ConfigError, ConfigResult};

/// Write every persisted setting in one batch.
pub fn save_settings<S: ConfigStore + ?Sized>(
    store: &mut S,
    regulator: &RegulatorConfig,
    calibration: &Calibration,
) -> ConfigResult<()> {
    let values = ConfigKey::ALL.map(|key| {
        let value = current_value(key, regulator, calibration);
        (key, value)
    });
    store.save_all(&values)?;
    debug!("settings saved");
    Ok(())
}

/// Apply every stored setting through the clamping setters.
///
/// Absent keys leave the current value alone. A stored value of the wrong
/// shape is skipped with a warning. Returns the number of settings applied.
pub fn load_settings<S: ConfigStore + ?Sized>(
    store: &S,
    regulator: &mut RegulatorConfig,
    calibration: &mut Calibration,
) -> ConfigResult<usize> {
    let mut applied = 0;
    for key in ConfigKey::ALL {
        let Some(value) = store.load_scalar(key)? else {
            continue;
        };
        match apply_value(key, value, regulator, calibration) {
            Ok(()) => applied += 1,
            Err(e) => warn!(error = %e, ?value, "skipping stored setting"),
        }
    }
    debug!(applied, "settings loaded");
    Ok(applied)
}

fn current_value(
    key: ConfigKey,
    regulator: &RegulatorConfig,
    calibration: &Calibration,
) -> Scalar {
    match key {
        ConfigKey::Setpoint => Scalar::Real(regulator.setpoint_c),
        ConfigKey::Hysteresis => Scalar::Real(regulator.hysteresis_c),
        ConfigKey::Enabled => Scalar::Flag(regulator.enabled),
        ConfigKey::MaxTemp => Scalar::Real(regulator.max_temp_c),
        ConfigKey::MinOnMs => Scalar::Millis(regulator.min_on_ms),
        ConfigKey::MinOffMs => Scalar::Millis(regulator.min_off_ms),
        ConfigKey::CalGain => Scalar::Real(calibration.gain),
        ConfigKey::CalOffset => Scalar::Real(calibration.offset),
    }
}

fn apply_value(
    key: ConfigKey,
    value: Scalar,
    regulator: &mut RegulatorConfig,
    calibration: &mut Calibration,
) -> ConfigResult<()> {
    let real = || {
        value.as_real().ok_or(ConfigError::TypeMismatch {
            key,
            expected: "number",
        })
    };
    let millis = || {
        value.as_millis().ok_or(ConfigError::TypeMismatch {
            key,
            expected: "millisecond count",
        })
    };
    match key {
        ConfigKey::Setpoint => {
            regulator.set_setpoint(real()?);
        }
        ConfigKey::Hysteresis => {
            regulator.set_hysteresis(real()?);
        }
        ConfigKey::MaxTemp => {
            regulator.set_max_temp(real()?);
        }
        ConfigKey::MinOnMs => {
            regulator.set_min_on_ms(millis()?);
        }
        ConfigKey::MinOffMs => {
            regulator.set_min_off_ms(millis()?);
        }
        ConfigKey::Enabled => {
            let flag = value.as_flag().ok_or(ConfigError::TypeMismatch {
                key,
                expected: "flag",
            })?;
            regulator.set_enabled(flag);
        }
        ConfigKey::CalGain => calibration.set_gain(real()?),
        ConfigKey::CalOffset => calibration.set_offset(real()?),
    }
    Ok(())
}
