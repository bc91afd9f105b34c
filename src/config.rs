//! Options for provisioning and replay, plus the simulator configuration
//! resolved once per process.

use std::ffi::OsString;
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use tracing::warn;

/// Interface used when the caller does not name one.
pub const DEFAULT_INTERFACE: &str = "can0";

/// Replay binary from can-utils.
pub const DEFAULT_PLAYER: &str = "canplayer";

/// How long `stop()` waits for the player to exit after SIGTERM.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the sample log, relative to the install root.
pub const DEFAULT_SOURCE_RELATIVE: &str = "default_sources/default.can.log";

pub const PLAYER_ENV: &str = "VCAN_SIM_PLAYER";
pub const DEFAULT_SOURCE_ENV: &str = "VCAN_SIM_DEFAULT_SOURCE";
pub const STOP_TIMEOUT_ENV: &str = "VCAN_SIM_STOP_TIMEOUT_MS";

/// How many times the log is replayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Iterations {
    Count(NonZeroU32),
    /// Loop until stopped.
    #[default]
    Unbounded,
}

impl Iterations {
    pub const fn once() -> Self {
        Iterations::Count(NonZeroU32::MIN)
    }
}

impl fmt::Display for Iterations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iterations::Count(n) => write!(f, "{n}"),
            Iterations::Unbounded => write!(f, "inf"),
        }
    }
}

impl std::str::FromStr for Iterations {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "i" | "inf" | "infinite" | "unbounded" => Ok(Iterations::Unbounded),
            other => other
                .parse::<NonZeroU32>()
                .map(Iterations::Count)
                .map_err(|_| format!("invalid iterations '{s}': use a positive integer or 'inf'")),
        }
    }
}

/// Options for [`virtualize_can`](crate::virtualize_can).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualizeOptions {
    /// Suppress command output and status lines.
    pub silent: bool,
    /// Run the networking commands through `sudo`.
    pub sudo: bool,
}

impl Default for VirtualizeOptions {
    fn default() -> Self {
        Self {
            silent: true,
            sudo: true,
        }
    }
}

/// Options for [`simulate_can`](crate::simulate_can).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulateOptions {
    /// Suppress player output and status lines.
    pub silent: bool,
    /// Interface the replayed frames are written to.
    pub interface: String,
    pub iterations: Iterations,
    /// Keep the recorded inter-frame timing. When false frames are sent as
    /// fast as possible.
    pub simulate_time: bool,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            silent: true,
            interface: DEFAULT_INTERFACE.to_string(),
            iterations: Iterations::Unbounded,
            simulate_time: true,
        }
    }
}

/// Host-level settings for replay, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Replay binary to launch.
    pub player: PathBuf,
    /// Log replayed when the caller gives no source.
    pub default_source: PathBuf,
    /// Default bound for [`SimulatorInstance::stop`](crate::SimulatorInstance::stop).
    pub stop_timeout: Duration,
}

static GLOBAL_CONFIG: LazyLock<SimulatorConfig> = LazyLock::new(SimulatorConfig::from_env);

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            player: PathBuf::from(DEFAULT_PLAYER),
            default_source: bundled_default_source(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl SimulatorConfig {
    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> &'static SimulatorConfig {
        &GLOBAL_CONFIG
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Build a config from `lookup`, falling back to defaults for unset or
    /// unusable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();

        if let Some(player) = lookup(PLAYER_ENV).filter(|v| !v.is_empty()) {
            config.player = PathBuf::from(player);
        }
        if let Some(source) = lookup(DEFAULT_SOURCE_ENV).filter(|v| !v.is_empty()) {
            config.default_source = PathBuf::from(source);
        }
        if let Some(raw) = lookup(STOP_TIMEOUT_ENV) {
            match raw.to_str().and_then(|s| s.trim().parse::<u64>().ok()) {
                Some(ms) => config.stop_timeout = Duration::from_millis(ms),
                None => warn!(
                    value = ?raw,
                    "ignoring {STOP_TIMEOUT_ENV}: expected milliseconds"
                ),
            }
        }

        config
    }
}

/// Sample log shipped with the crate.
///
/// Prefers a copy installed next to the executable, then the one in the
/// source tree.
pub fn bundled_default_source() -> PathBuf {
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let installed = dir.join(DEFAULT_SOURCE_RELATIVE);
        if installed.is_file() {
            return installed;
        }
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SOURCE_RELATIVE)
}
