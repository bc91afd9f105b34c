//! Virtual CAN interface provisioning.
//!
//! Loads the `vcan` kernel module, creates the link and brings it up. An
//! interface that already exists is reported as
//! [`VirtualizeOutcome::AlreadyVirtualized`] rather than as an error.

use std::fmt;

use serde::Serialize;

use crate::command::{CommandOutput, CommandRunner, ShellCommand, SystemRunner, run_checked};
use crate::config::{DEFAULT_INTERFACE, VirtualizeOptions};
use crate::error::{Error, Result};
use crate::status::StatusLog;

/// Kernel module providing virtual CAN links.
pub const VCAN_MODULE: &str = "vcan";

/// `ip link add` exit code when the device already exists.
const EXISTS_EXIT_CODE: i32 = 2;

/// Tail of iproute2's `RTNETLINK answers: File exists`.
const EXISTS_STDERR: &str = "File exists";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualizeOutcome {
    /// The interface was created and brought up by this call.
    Virtualized,
    /// The interface was already present; nothing was changed.
    AlreadyVirtualized,
}

impl fmt::Display for VirtualizeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualizeOutcome::Virtualized => write!(f, "virtualized"),
            VirtualizeOutcome::AlreadyVirtualized => write!(f, "already_virtualized"),
        }
    }
}

/// The three commands run, in order, to provision `interface`.
pub fn provisioning_steps(interface: &str, sudo: bool) -> [ShellCommand; 3] {
    [
        ShellCommand::new("modprobe").arg(VCAN_MODULE).elevated(sudo),
        ShellCommand::new("ip")
            .args(["link", "add", "dev", interface, "type", "vcan"])
            .elevated(sudo),
        ShellCommand::new("ip")
            .args(["link", "set", "up", interface])
            .elevated(sudo),
    ]
}

/// True when a failed `ip link add` only means the device exists already.
pub fn is_already_exists(output: &CommandOutput) -> bool {
    output.code == Some(EXISTS_EXIT_CODE) && output.stderr.trim_end().ends_with(EXISTS_STDERR)
}

/// Provision `interface` (default `can0`) on this host.
pub async fn virtualize_can(
    interface: Option<&str>,
    options: &VirtualizeOptions,
) -> Result<VirtualizeOutcome> {
    virtualize_can_with(&SystemRunner, interface, options).await
}

/// Provision `interface` using `runner` for every command.
///
/// Steps run strictly one after another; each depends on the kernel state
/// left by the previous one.
pub async fn virtualize_can_with<R: CommandRunner>(
    runner: &R,
    interface: Option<&str>,
    options: &VirtualizeOptions,
) -> Result<VirtualizeOutcome> {
    let interface = interface.unwrap_or(DEFAULT_INTERFACE);
    let log = StatusLog::new(options.silent, "CAN");

    log.info("Setting up CAN interface");
    log.debug(format_args!("CAN interface: {interface}"));

    let [load_module, add_link, link_up] = provisioning_steps(interface, options.sudo);

    run_checked(runner, &load_module, options.silent).await?;

    let added = runner.run(&add_link, options.silent).await?;
    if !added.success() {
        if is_already_exists(&added) {
            log.warning(format_args!("CAN interface {interface} already virtualized"));
            return Ok(VirtualizeOutcome::AlreadyVirtualized);
        }
        log.error(format_args!("failed to create {interface}"));
        return Err(Error::command_failed(&add_link, added));
    }

    run_checked(runner, &link_up, options.silent).await?;

    log.success(format_args!("CAN interface {interface} virtualized"));
    Ok(VirtualizeOutcome::Virtualized)
}
