//! tk-core: shared foundation for the tank controller crates.
//!
//! Contains:
//! - numeric (Real + tolerances + finite/clamp helpers)
//! - timing (wrap-safe millisecond clock arithmetic + clocks)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{TkError, TkResult};
pub use numeric::*;
pub use timing::{Clock, ManualClock, Millis, MonotonicClock};
