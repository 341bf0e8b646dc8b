//! YAML startup configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tk_controls::RegulatorConfig;
use tk_sensor::{AcquisitionConfig, Calibration};

use crate::ConfigResult;

/// Relay wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Line level that energises the heater.
    pub active_high: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self { active_high: true }
    }
}

/// Everything needed to bring up a controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub acquisition: AcquisitionConfig,
    pub regulator: RegulatorConfig,
    pub calibration: Calibration,
    pub relay: RelaySettings,
    /// Persistent scalar store; settings found there override this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl ControllerSettings {
    pub fn sanitized(self) -> Self {
        Self {
            acquisition: self.acquisition.sanitized(),
            regulator: self.regulator.sanitized(),
            calibration: self.calibration.sanitized(),
            ..self
        }
    }
}

pub fn load_yaml(path: &Path) -> ConfigResult<ControllerSettings> {
    let content = std::fs::read_to_string(path)?;
    let settings: ControllerSettings = serde_yaml::from_str(&content)?;
    Ok(settings.sanitized())
}

pub fn save_yaml(path: &Path, settings: &ControllerSettings) -> ConfigResult<()> {
    let content = serde_yaml::to_string(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let yaml = "regulator:\n  setpoint_c: 50.0\nrelay:\n  active_high: false\n";
        let settings: ControllerSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.regulator.setpoint_c, 50.0);
        assert_eq!(settings.regulator.hysteresis_c, 0.8);
        assert!(!settings.relay.active_high);
        assert_eq!(settings.acquisition, AcquisitionConfig::default());
        assert!(settings.store_path.is_none());
    }

    #[test]
    fn sanitize_clamps_nested_sections() {
        let yaml = "acquisition:\n  period_ms: 10\n  ema_alpha: 4.0\n\
                    regulator:\n  setpoint_c: 99.0\n";
        let settings: ControllerSettings = serde_yaml::from_str(yaml).unwrap();
        let settings = settings.sanitized();
        assert_eq!(settings.acquisition.period_ms, 100);
        assert_eq!(settings.acquisition.ema_alpha, 1.0);
        assert_eq!(settings.regulator.setpoint_c, 70.0);
    }
}
