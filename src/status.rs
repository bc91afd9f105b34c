//! Leveled, silenceable status lines.
//!
//! Every operation takes a `silent` flag; when it is set nothing is emitted.
//! Otherwise lines go through `tracing` tagged with a short scope such as
//! `CAN`, so the subscriber installed by the binary decides formatting.

use std::fmt::Display;

use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug)]
pub struct StatusLog {
    silent: bool,
    scope: &'static str,
}

impl StatusLog {
    pub const fn new(silent: bool, scope: &'static str) -> Self {
        Self { silent, scope }
    }

    pub fn info(&self, msg: impl Display) {
        if !self.silent {
            info!(scope = self.scope, "{msg}");
        }
    }

    pub fn debug(&self, msg: impl Display) {
        if !self.silent {
            debug!(scope = self.scope, "{msg}");
        }
    }

    /// Completion of a step, logged at info level with `ok = true`.
    pub fn success(&self, msg: impl Display) {
        if !self.silent {
            info!(scope = self.scope, ok = true, "{msg}");
        }
    }

    pub fn warning(&self, msg: impl Display) {
        if !self.silent {
            warn!(scope = self.scope, "{msg}");
        }
    }

    pub fn error(&self, msg: impl Display) {
        if !self.silent {
            error!(scope = self.scope, "{msg}");
        }
    }
}
