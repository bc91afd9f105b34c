//! Host-level helpers for vcan_sim integration tests.
//!
//! These tests touch real kernel state (vcan links) and real can-utils
//! binaries, so every test first checks its dependencies and skips with a
//! printed reason when the host cannot run it.
//!
//! # Modules
//!
//! - [`interface`]: RAII guard deleting test-created vcan links
//! - [`harness`]: dependency checks and a managed `candump` capture
//! - [`test_util`]: privilege check and unique interface names

pub mod harness;
pub mod interface;
pub mod test_util;

pub use harness::{
    FrameCapture, SkipReason, check_binary, check_replay_deps, check_vcan_deps,
};
pub use interface::VcanInterface;
pub use test_util::{check_privileges, unique_iface_name};
