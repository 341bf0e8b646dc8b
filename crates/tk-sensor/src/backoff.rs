//! Exponential retry spacing for a failing probe.

use serde::{Deserialize, Serialize};
use tk_core::Millis;

/// Default cap on the backoff exponent (period × 16).
pub const DEFAULT_MAX_EXPONENT: u8 = 4;

const EXPONENT_LIMIT: u8 = 16;

/// Backoff exponent with a fixed cap.
///
/// Each fault raises the exponent by one up to the cap; a success resets it.
/// The retry delay is `period << exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    exponent: u8,
    max_exponent: u8,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPONENT)
    }
}

impl Backoff {
    pub fn new(max_exponent: u8) -> Self {
        Self {
            exponent: 0,
            max_exponent: max_exponent.min(EXPONENT_LIMIT),
        }
    }

    pub fn exponent(&self) -> u8 {
        self.exponent
    }

    /// Record a fault, returning the new exponent.
    pub fn on_fault(&mut self) -> u8 {
        self.exponent = (self.exponent + 1).min(self.max_exponent);
        self.exponent
    }

    pub fn reset(&mut self) {
        self.exponent = 0;
    }

    /// Delay before the next attempt for the given base period.
    pub fn delay(&self, period: Millis) -> Millis {
        period.saturating_mul(1 << self.exponent)
    }
}
