//! Error types for provisioning and replay.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::command::{CommandOutput, ShellCommand};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A command ran but exited unsuccessfully.
    #[error("`{command}` failed (code: {code:?}): {}", .stderr.trim_end())]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The OS refused to start the program at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Stop(#[from] StopError),
}

impl Error {
    pub(crate) fn command_failed(command: &ShellCommand, output: CommandOutput) -> Self {
        Error::CommandFailed {
            command: command.to_string(),
            code: output.code,
            stderr: output.stderr,
        }
    }

    /// Exit code carried by a [`Error::CommandFailed`], if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Why [`SimulatorInstance::stop`](crate::SimulatorInstance::stop) did not
/// confirm a graceful shutdown.
///
/// Cloneable so that every caller sharing one in-flight stop sees the same
/// result.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StopError {
    #[error("player terminated abnormally (code: {code:?}, signal: {signal:?})")]
    AbnormalTermination {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("waiting on player failed: {0}")]
    Wait(String),

    #[error("could not signal process group {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("player did not exit within {0:?}")]
    Timeout(Duration),
}
