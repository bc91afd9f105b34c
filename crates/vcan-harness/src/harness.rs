//! Dependency checks and a managed `candump` capture for end-to-end tests.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::interface::sudo;

// ---------------------------------------------------------------------------
// Dependency checking
// ---------------------------------------------------------------------------

/// Check if a binary exists in PATH.
pub fn check_binary(name: &str) -> Option<PathBuf> {
    Command::new("sh")
        .args(["-c", &format!("command -v {name}")])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| PathBuf::from(String::from_utf8_lossy(&o.stdout).trim().to_string()))
}

/// Reason why integration tests must be skipped.
#[derive(Debug)]
pub enum SkipReason {
    NotRoot,
    MissingTool(String),
    MissingBinary(String),
    NoVcan,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotRoot => write!(f, "requires root / passwordless sudo"),
            SkipReason::MissingTool(t) => write!(f, "system tool '{t}' not found"),
            SkipReason::MissingBinary(b) => write!(f, "{b} not found in PATH (install can-utils)"),
            SkipReason::NoVcan => write!(
                f,
                "vcan kernel module not available (try: sudo modprobe vcan)"
            ),
        }
    }
}

/// Check what provisioning tests need: `ip`, `modprobe`, passwordless sudo
/// and a loadable vcan module.
pub fn check_vcan_deps() -> std::result::Result<(), SkipReason> {
    for tool in ["ip", "modprobe"] {
        if check_binary(tool).is_none() {
            return Err(SkipReason::MissingTool(tool.to_string()));
        }
    }

    if !crate::test_util::check_privileges() {
        return Err(SkipReason::NotRoot);
    }

    let modprobe_ok = sudo(&["modprobe", "vcan"]).is_ok_and(|o| o.status.success());
    if !modprobe_ok {
        return Err(SkipReason::NoVcan);
    }

    Ok(())
}

/// Check deps for replay tests: everything above plus can-utils.
pub fn check_replay_deps() -> std::result::Result<(), SkipReason> {
    check_vcan_deps()?;

    for bin in ["canplayer", "candump"] {
        if check_binary(bin).is_none() {
            return Err(SkipReason::MissingBinary(bin.to_string()));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// FrameCapture
// ---------------------------------------------------------------------------

/// `candump -L` running against one interface.
///
/// Captures stdout and stops the process on drop.
pub struct FrameCapture {
    child: Child,
    iface: String,
}

impl FrameCapture {
    pub fn start(iface: &str) -> Result<Self> {
        let child = Command::new("candump")
            .args(["-L", iface])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn candump on {iface}"))?;

        tracing::debug!(iface, pid = child.id(), "started candump");
        Ok(Self {
            child,
            iface: iface.to_string(),
        })
    }

    /// Check if candump is still running.
    pub fn is_alive(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// Stop candump and return the log lines it wrote.
    pub fn finish(mut self) -> Vec<String> {
        self.terminate();
        match self.child.stdout.take() {
            Some(stdout) => BufReader::new(stdout)
                .lines()
                .map_while(|l| l.ok())
                .collect(),
            None => vec![],
        }
    }

    /// Send SIGTERM so candump flushes, then SIGKILL if it lingers.
    fn terminate(&mut self) {
        if !self.is_alive() {
            return;
        }

        let _ = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .output();

        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if !self.is_alive() {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        tracing::debug!(iface = %self.iface, "candump ignored SIGTERM; killing");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for FrameCapture {
    fn drop(&mut self) {
        self.terminate();
    }
}
