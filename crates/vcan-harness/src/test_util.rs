use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

static IFACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Linux netdev name limit (IFNAMSIZ - 1).
pub const MAX_IFACE_LEN: usize = 15;

/// Returns `true` if passwordless `sudo` can drive `ip link`.
pub fn check_privileges() -> bool {
    Command::new("sudo")
        .args(["-n", "ip", "link", "show"])
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Generate an interface name that is unique across parallel tests.
///
/// Combines prefix + PID + atomic counter, truncated to 15 chars.
pub fn unique_iface_name(prefix: &str) -> String {
    let seq = IFACE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id() % 0xffff;
    let name = format!("{prefix}{pid:x}_{seq}");
    if name.len() > MAX_IFACE_LEN {
        name[..MAX_IFACE_LEN].to_string()
    } else {
        name
    }
}
