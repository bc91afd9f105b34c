//! Virtual CAN bus tooling for hardware-free testing.
//!
//! Provisions `vcan` interfaces on a Linux host and replays recorded CAN
//! traffic onto them through `canplayer` (can-utils). Everything here is
//! orchestration of external commands; no CAN frames are encoded or decoded.
//!
//! - [`virtualize_can`]: load `vcan`, create and raise an interface
//! - [`simulate_can`]: start a replay and get a [`SimulatorInstance`] back
//! - [`simulate_gps`]: placeholder

pub mod candump;
pub mod command;
pub mod config;
pub mod error;
pub mod gps;
pub mod instance;
pub mod provision;
pub mod replay;
pub mod status;

#[cfg(test)]
pub mod tests;

pub use command::{CommandOutput, CommandRunner, ShellCommand, SystemRunner};
pub use config::{Iterations, SimulateOptions, SimulatorConfig, VirtualizeOptions};
pub use error::{Error, Result, StopError};
pub use gps::simulate_gps;
pub use instance::{ExitRecord, SimulatorInstance};
pub use provision::{VirtualizeOutcome, virtualize_can, virtualize_can_with};
pub use replay::{ReplayCommand, simulate_can, simulate_can_with};
