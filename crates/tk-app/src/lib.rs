//! Tank controller service layer.
//!
//! Wires probe acquisition, the regulator and the relay line into one
//! [`TankController`], and provides the text command surface and a demo
//! plant shared by the CLI and the tests.

pub mod command;
pub mod controller;
pub mod error;
pub mod plant;
pub mod simulation;
pub mod status;

pub use command::{Command, CommandError, execute};
pub use controller::TankController;
pub use error::{AppError, AppResult};
pub use plant::{PlantParams, SimTank};
pub use simulation::{SimController, Simulation};
pub use status::StatusSnapshot;
