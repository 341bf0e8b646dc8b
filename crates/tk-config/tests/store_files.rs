use tk_config::*;
use tk_controls::RegulatorConfig;
use tk_sensor::Calibration;

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn json_store_persists_across_instances() {
    let dir = scratch_dir("tk_config_json_store");
    let path = dir.join("settings.json");

    let mut reg = RegulatorConfig::default();
    reg.set_setpoint(52.0);
    reg.set_enabled(false);
    reg.set_min_off_ms(12_000);
    let mut cal = Calibration::default();
    cal.set(1.1, -0.5);

    let mut store = JsonFileStore::new(path.clone()).unwrap();
    save_settings(&mut store, &reg, &cal).unwrap();
    assert!(path.exists());

    let content = std::fs::read_to_string(&path).unwrap();
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&content).unwrap();
    for key in ConfigKey::ALL {
        assert!(object.contains_key(key.as_str()), "{key} missing");
    }
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("settings.json")]);

    let reopened = JsonFileStore::new(path).unwrap();
    let mut loaded_reg = RegulatorConfig::default();
    let mut loaded_cal = Calibration::default();
    let applied = load_settings(&reopened, &mut loaded_reg, &mut loaded_cal).unwrap();

    assert_eq!(applied, ConfigKey::ALL.len());
    assert_eq!(loaded_reg, reg);
    assert_eq!(loaded_cal, cal);
}

#[test]
fn missing_file_is_an_empty_store() {
    let dir = scratch_dir("tk_config_missing");
    let store = JsonFileStore::new(dir.join("absent.json")).unwrap();
    assert_eq!(store.load_scalar(ConfigKey::Setpoint).unwrap(), None);
}

#[test]
fn hand_edited_whole_numbers_load_as_reals() {
    let dir = scratch_dir("tk_config_hand_edit");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.json");
    let content = r#"{ "setpoint": 50, "enabled": false, "pump_speed": 3 }"#;
    std::fs::write(&path, content).unwrap();

    let mut store = JsonFileStore::new(path.clone()).unwrap();
    let mut reg = RegulatorConfig::default();
    let mut cal = Calibration::default();
    assert_eq!(load_settings(&store, &mut reg, &mut cal).unwrap(), 2);
    assert_eq!(reg.setpoint_c, 50.0);
    assert!(!reg.enabled);

    store
        .save_scalar(ConfigKey::Hysteresis, Scalar::Real(1.0))
        .unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("pump_speed"));
    assert!(content.contains("hysteresis"));
}

#[test]
fn corrupt_file_is_reported() {
    let dir = scratch_dir("tk_config_corrupt");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = JsonFileStore::new(path).unwrap();
    let err = store.load_scalar(ConfigKey::Setpoint).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn yaml_settings_roundtrip() {
    let dir = scratch_dir("tk_config_yaml");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("controller.yaml");

    let mut settings = ControllerSettings::default();
    settings.regulator.set_setpoint(38.5);
    settings.acquisition.period_ms = 2000;
    settings.relay.active_high = false;
    settings.store_path = Some(dir.join("settings.json"));

    save_yaml(&path, &settings).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(loaded, settings);
}
