//! Replaying recorded CAN traffic through `canplayer`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::candump;
use crate::config::{Iterations, SimulateOptions, SimulatorConfig};
use crate::error::Result;
use crate::instance::SimulatorInstance;
use crate::status::StatusLog;

/// `canplayer` loop argument meaning "repeat forever".
const LOOP_FOREVER: &str = "i";

/// A fully resolved player invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayCommand {
    program: PathBuf,
    source: PathBuf,
    args: Vec<String>,
}

impl ReplayCommand {
    /// Build the player command line.
    ///
    /// `log_interfaces` are the interfaces recorded in the log; each one is
    /// remapped onto `options.interface` (`<write-if>=<log-if>`).
    pub fn build(
        config: &SimulatorConfig,
        source: Option<&Path>,
        options: &SimulateOptions,
        log_interfaces: &[String],
    ) -> Self {
        let source = source.unwrap_or(&config.default_source).to_path_buf();

        let mut args = vec!["-I".to_string(), source.to_string_lossy().into_owned()];

        args.push("-l".to_string());
        args.push(match options.iterations {
            Iterations::Unbounded => LOOP_FOREVER.to_string(),
            Iterations::Count(n) => n.to_string(),
        });

        if !options.simulate_time {
            // Ignore recorded timestamps and send as fast as possible.
            args.push("-t".to_string());
        }

        args.extend(
            log_interfaces
                .iter()
                .map(|log_if| format!("{}={log_if}", options.interface)),
        );

        Self {
            program: config.player.clone(),
            source,
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A ready-to-spawn command. Output is discarded when `silent`.
    pub fn to_command(&self, silent: bool) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if silent {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command
    }
}

impl fmt::Display for ReplayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Start replaying `source` (or the configured default log) using the
/// process-wide [`SimulatorConfig`].
pub async fn simulate_can(
    source: Option<&Path>,
    options: &SimulateOptions,
) -> Result<SimulatorInstance> {
    simulate_can_with(SimulatorConfig::global(), source, options).await
}

/// Start replaying with an explicit configuration.
///
/// Returns once the player has been spawned; it is not checked that the
/// replay actually began.
pub async fn simulate_can_with(
    config: &SimulatorConfig,
    source: Option<&Path>,
    options: &SimulateOptions,
) -> Result<SimulatorInstance> {
    let log = StatusLog::new(options.silent, "CAN");
    let source = source.unwrap_or(&config.default_source);

    let log_interfaces = match candump::read_interfaces(source).await {
        Ok(found) => found,
        Err(e) => {
            log.warning(format_args!(
                "could not read {}: {e}; replaying without interface mapping",
                source.display()
            ));
            Vec::new()
        }
    };

    let replay = ReplayCommand::build(config, Some(source), options, &log_interfaces);
    log.info("Starting canplayer");
    log.debug(format_args!("command: {replay}"));

    let mut command = replay.to_command(options.silent);
    let instance = SimulatorInstance::spawn(
        &mut command,
        options.interface.clone(),
        config.stop_timeout,
        log,
    )?;

    log.debug(format_args!("PID: {}", instance.pid()));
    Ok(instance)
}
