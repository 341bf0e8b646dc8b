//! Error types for actuator output.

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

/// Result type for actuator operations.
pub type ActuatorResult<T> = Result<T, ActuatorError>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The output pin rejected a write.
    #[error("Relay line write failed: {kind:?}")]
    Write { kind: ErrorKind },
}
