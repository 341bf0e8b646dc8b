//! Temperature probe acquisition for the tank controller.
//!
//! This crate turns the raw single-wire probe protocol into a stream of
//! trustworthy [`Sample`]s:
//!
//! - [`bus`]: the probe bus seam ([`ProbeBus`]), scratchpad checksum and decoding
//! - [`acquisition`]: the non-blocking conversion state machine
//! - [`filter`]: EMA smoothing and gain/offset calibration
//! - [`backoff`]: retry spacing under repeated faults
//! - [`registry`]: bounded fan-out of produced samples
//! - [`sim`]: a simulated probe for host runs and tests
//!
//! Nothing in here blocks. The owner polls [`Acquisition::poll`] from its
//! main loop with the current millisecond counter.

pub mod acquisition;
pub mod backoff;
pub mod bus;
pub mod error;
pub mod filter;
pub mod registry;
pub mod sample;
pub mod sim;
pub mod stats;

pub use acquisition::{Acquisition, AcquisitionConfig, Phase};
pub use backoff::Backoff;
pub use bus::{ProbeBus, Resolution, RomCode, Scratchpad};
pub use error::{SensorError, SensorFault, SensorResult};
pub use filter::{Calibration, Ema};
pub use registry::{MAX_SUBSCRIBERS, SubscriberRegistry};
pub use sample::Sample;
pub use sim::{ProbeFault, SimProbe};
pub use stats::FaultCounters;
