//! Error types for the tk-app service layer.

use tk_config::ConfigError;
use tk_controls::ActuatorError;
use tk_core::TkError;

use crate::command::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Relay output error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Settings store error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plant model error: {0}")]
    Plant(#[from] TkError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Result type for tk-app operations.
pub type AppResult<T> = Result<T, AppError>;
