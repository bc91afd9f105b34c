use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::debug;

/// A vcan interface owned by a test, deleted on drop.
///
/// Creation itself is left to the code under test; the guard only
/// guarantees cleanup, including when an assertion panics midway.
pub struct VcanInterface {
    pub name: String,
}

impl VcanInterface {
    /// Take ownership of `name`, removing any stale link left by an earlier
    /// aborted run.
    pub fn claim(name: &str) -> Self {
        let _ = sudo(&["ip", "link", "del", name]);
        Self {
            name: name.to_string(),
        }
    }

    /// True if the link exists and is administratively up.
    pub fn is_up(&self) -> Result<bool> {
        let out = sudo_checked(&["ip", "-brief", "link", "show", "dev", &self.name])
            .with_context(|| format!("query link '{}'", self.name))?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        Ok(stdout.contains("UP") || stdout.contains("UNKNOWN"))
    }

    /// True if the link exists at all.
    pub fn exists(&self) -> bool {
        sudo(&["ip", "link", "show", "dev", &self.name]).is_ok_and(|o| o.status.success())
    }
}

impl Drop for VcanInterface {
    fn drop(&mut self) {
        debug!(iface = %self.name, "deleting vcan interface");
        let _ = sudo(&["ip", "link", "del", &self.name]);
    }
}

// -- helpers --

/// Run `sudo -n <args>`, returning raw output.
pub(crate) fn sudo(args: &[&str]) -> Result<Output> {
    Command::new("sudo")
        .arg("-n")
        .args(args)
        .output()
        .with_context(|| format!("sudo {}", args.join(" ")))
}

/// Run `sudo -n <args>`, returning output on success or bailing with stderr.
pub(crate) fn sudo_checked(args: &[&str]) -> Result<Output> {
    let output = sudo(args)?;
    if !output.status.success() {
        bail!(
            "command failed: sudo {}\n{}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}
