//! Lifecycle of a running replay process.
//!
//! The child is started as the leader of its own process group so that
//! stopping it also reaches any helpers it forked. A monitor task owns the
//! [`Child`] and publishes how it ended on a watch channel; `stop()` and
//! `wait()` observe that channel instead of touching the child directly.

use std::fmt;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{OnceCell, watch};

use crate::error::{Error, Result, StopError};
use crate::status::StatusLog;

/// Signal sent by `stop()`; exiting on it counts as a clean shutdown.
pub const GRACEFUL_SIGNAL: i32 = libc::SIGTERM;

/// How a child process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitRecord {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ExitRecord {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ExitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

#[derive(Clone, Debug)]
enum ProcessState {
    Running,
    Exited(ExitRecord),
    WaitFailed(String),
}

impl ProcessState {
    fn is_settled(&self) -> bool {
        !matches!(self, ProcessState::Running)
    }

    fn outcome(&self) -> std::result::Result<ExitRecord, StopError> {
        match self {
            ProcessState::Exited(record) => Ok(*record),
            ProcessState::WaitFailed(message) => Err(StopError::Wait(message.clone())),
            ProcessState::Running => Err(StopError::Wait("process still running".to_string())),
        }
    }
}

/// Handle to one running replay process.
///
/// The holder is responsible for stopping it. Dropping a handle whose
/// process is still running kills the whole process group.
#[derive(Debug)]
pub struct SimulatorInstance {
    pid: u32,
    interface: String,
    state: watch::Receiver<ProcessState>,
    stop_requested: Arc<AtomicBool>,
    stop_result: OnceCell<std::result::Result<(), StopError>>,
    stop_timeout: Duration,
    log: StatusLog,
}

impl SimulatorInstance {
    /// Spawn `command` as a new process-group leader and start watching it.
    ///
    /// Returns as soon as the OS accepted the spawn. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(
        command: &mut Command,
        interface: impl Into<String>,
        stop_timeout: Duration,
        log: StatusLog,
    ) -> Result<Self> {
        let program = command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned();

        let child = command
            .process_group(0)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| Error::Spawn {
            program,
            source: io::Error::other("child was reaped before its pid was read"),
        })?;

        Ok(Self::watch(child, pid, interface.into(), stop_timeout, log))
    }

    fn watch(
        mut child: Child,
        pid: u32,
        interface: String,
        stop_timeout: Duration,
        log: StatusLog,
    ) -> Self {
        let (state_tx, state) = watch::channel(ProcessState::Running);
        let stop_requested = Arc::new(AtomicBool::new(false));

        let requested = Arc::clone(&stop_requested);
        tokio::spawn(async move {
            let next = match child.wait().await {
                Ok(status) => {
                    let record = ExitRecord::from(status);
                    if !requested.load(Ordering::Acquire) {
                        log.success(format_args!("CAN player finished ({record})"));
                    }
                    ProcessState::Exited(record)
                }
                Err(e) => ProcessState::WaitFailed(e.to_string()),
            };
            state_tx.send_replace(next);
        });

        Self {
            pid,
            interface,
            state,
            stop_requested,
            stop_result: OnceCell::new(),
            stop_timeout,
            log,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Interface the replay was started against.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn is_running(&self) -> bool {
        !self.state.borrow().is_settled()
    }

    #[cfg(test)]
    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Stop the player, waiting at most the configured stop timeout.
    pub async fn stop(&self) -> std::result::Result<(), StopError> {
        self.stop_with_timeout(self.stop_timeout).await
    }

    /// Stop the player, waiting at most `timeout` for it to exit.
    ///
    /// Succeeds immediately if the process already exited. Otherwise the
    /// process group gets SIGTERM and the call succeeds only if the player
    /// dies from that signal. The first call's termination is shared: every
    /// call, concurrent or later, returns its result and `timeout` is only
    /// honoured for that first call. A timed-out result is dropped once the
    /// process is gone (after [`kill`](Self::kill)).
    pub async fn stop_with_timeout(&self, timeout: Duration) -> std::result::Result<(), StopError> {
        let result = self
            .stop_result
            .get_or_init(|| self.terminate(timeout))
            .await;
        match result {
            // A timed-out stop followed by kill() has nothing left to stop.
            Err(StopError::Timeout(_)) if !self.is_running() => Ok(()),
            other => other.clone(),
        }
    }

    /// Wait for the process to exit without signalling it.
    pub async fn wait(&self) -> std::result::Result<ExitRecord, StopError> {
        let mut state = self.state.clone();
        let observed = state
            .wait_for(ProcessState::is_settled)
            .await
            .map_err(|_| StopError::Wait("exit monitor went away".to_string()))?;
        observed.outcome()
    }

    /// SIGKILL the whole process group. Used after a stop timed out.
    pub fn kill(&self) -> std::result::Result<(), StopError> {
        if !self.is_running() {
            return Ok(());
        }
        self.stop_requested.store(true, Ordering::Release);
        signal_group(self.pid, libc::SIGKILL)
    }

    async fn terminate(&self, timeout: Duration) -> std::result::Result<(), StopError> {
        if !self.is_running() {
            return Ok(());
        }

        self.stop_requested.store(true, Ordering::Release);
        signal_group(self.pid, GRACEFUL_SIGNAL)?;

        let record = match tokio::time::timeout(timeout, self.wait()).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                self.log
                    .error(format_args!("CAN player did not exit within {timeout:?}"));
                return Err(StopError::Timeout(timeout));
            }
        };

        if record.signal == Some(GRACEFUL_SIGNAL) {
            self.log.success("CAN player closed");
            Ok(())
        } else {
            self.log.error(format_args!("CAN player exited ({record})"));
            Err(StopError::AbnormalTermination {
                code: record.code,
                signal: record.signal,
            })
        }
    }
}

impl Drop for SimulatorInstance {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = signal_group(self.pid, libc::SIGKILL);
        }
    }
}

/// Send `signal` to the process group led by `pid`.
///
/// A group that no longer exists is not an error; the monitor reports how
/// the process ended.
fn signal_group(pid: u32, signal: i32) -> std::result::Result<(), StopError> {
    let pgid = libc::pid_t::try_from(pid).map_err(|_| StopError::Signal {
        pid,
        message: "pid out of range".to_string(),
    })?;

    // SAFETY: kill(2) takes plain integers and has no memory-safety
    // requirements. The negative pid addresses the child's process group.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(StopError::Signal {
        pid,
        message: err.to_string(),
    })
}
