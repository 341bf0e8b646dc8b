//! Error types for probe acquisition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for acquisition operations that can fail towards the caller.
pub type SensorResult<T> = Result<T, SensorError>;

/// Recoverable acquisition faults.
///
/// These never leave the acquisition state machine as errors: they are
/// counted, remembered as the last error, and turned into an invalid sample.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFault {
    /// No probe answered a bus search.
    #[error("no probe found on the bus")]
    NoDevice,

    /// Conversion did not complete within the timeout.
    #[error("conversion timed out")]
    Timeout,

    /// Scratchpad checksum mismatch.
    #[error("scratchpad checksum mismatch")]
    CrcFail,

    /// Decoded temperature outside the probe range, or the disconnected sentinel.
    #[error("temperature out of range or probe disconnected")]
    RangeFail,
}

impl SensorFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDevice => "no_device",
            Self::Timeout => "timeout",
            Self::CrcFail => "crc_fail",
            Self::RangeFail => "range_fail",
        }
    }
}

/// Errors reported to callers of the acquisition API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// Subscriber registration beyond the fixed capacity.
    #[error("Subscriber registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },
}
