//! External command execution.
//!
//! Commands are run directly (no shell), so arguments such as interface
//! names are passed through verbatim as single argv entries.

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// A program plus its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Wrap the command in `sudo` when `elevate` is set.
    pub fn elevated(self, elevate: bool) -> Self {
        if !elevate {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs commands to completion.
///
/// Provisioning is generic over this so it can be driven against a scripted
/// host in tests.
pub trait CommandRunner: Send + Sync {
    /// Run `command`, capturing its output. When `silent` is false the
    /// captured output is echoed to this process's stdout/stderr.
    ///
    /// A non-zero exit is not an error here; only a failure to spawn is.
    fn run(
        &self,
        command: &ShellCommand,
        silent: bool,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Runs commands on the local host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ShellCommand, silent: bool) -> Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: command.program.clone(),
                source,
            })?;

        if !silent {
            // Echo is best-effort; a closed stdout must not fail provisioning.
            let _ = tokio::io::stdout().write_all(&output.stdout).await;
            let _ = tokio::io::stderr().write_all(&output.stderr).await;
        }

        debug!(%command, code = ?output.status.code(), "command finished");

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command`, turning a non-zero exit into [`Error::CommandFailed`].
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    command: &ShellCommand,
    silent: bool,
) -> Result<CommandOutput> {
    let output = runner.run(command, silent).await?;
    if !output.success() {
        return Err(Error::command_failed(command, output));
    }
    Ok(output)
}
