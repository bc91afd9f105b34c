//! Shared utilities for integration tests.
#![allow(dead_code)]

use vcan_harness::{VcanInterface, check_replay_deps, check_vcan_deps, unique_iface_name};

/// Returns `true` if provisioning tests should be skipped (prints the
/// reason to stderr). Use at the top of every test.
pub fn skip_without_vcan() -> bool {
    match check_vcan_deps() {
        Ok(()) => false,
        Err(reason) => {
            eprintln!("Skipping: {reason}");
            true
        }
    }
}

/// Like `skip_without_vcan` but also requires canplayer and candump.
pub fn skip_without_replay() -> bool {
    match check_replay_deps() {
        Ok(()) => false,
        Err(reason) => {
            eprintln!("Skipping: {reason}");
            true
        }
    }
}

/// A fresh, not yet created interface name whose link is deleted when the
/// returned guard drops.
pub fn claim_iface(prefix: &str) -> VcanInterface {
    VcanInterface::claim(&unique_iface_name(prefix))
}
