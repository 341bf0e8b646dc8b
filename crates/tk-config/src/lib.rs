//! tk-config: persistent scalar settings and the startup configuration file.

pub mod keys;
pub mod settings;
pub mod startup;
pub mod store;

pub use keys::{ConfigKey, Scalar};
pub use settings::{load_settings, save_settings};
pub use startup::{ControllerSettings, RelaySettings, load_yaml, save_yaml};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Stored value for {key} is not a {expected}")]
    TypeMismatch {
        key: ConfigKey,
        expected: &'static str,
    },
}
