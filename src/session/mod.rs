//! Solver session management.
//!
//! A [`SolverSession`] owns one running instance of the external engine
//! and the command/response channel to it. The evaluation layer only ever
//! sees this trait, so the transport can be swapped (pipes, sockets, a
//! scripted double in tests) without touching the GA.
//!
//! # Key Types
//!
//! - [`SolverSession`]: `open` / `execute` / `close` / `restart` contract
//! - [`ProcessSession`]: child-process implementation over stdin/stdout
//! - [`Command`]: the closed set of automation commands
//! - [`SessionConfig`]: executable, model, delays, timeout, length limit
//!
//! # Failure policy
//!
//! Sessions never retry. Each failed round trip surfaces as a
//! [`ChannelError`](crate::error::ChannelError); the caller decides when to
//! [`restart`](SolverSession::restart).

mod command;
mod config;
mod process;
mod registry;

#[cfg(test)]
pub(crate) mod stub;

pub use command::{Command, WindowKind};
pub use config::SessionConfig;
pub use process::ProcessSession;

use crate::error::{ChannelError, SessionStartError};

/// Managed connection to the external engine.
pub trait SolverSession {
    /// Launches a fresh engine instance and loads the model.
    ///
    /// Any instance that is already running is terminated first.
    fn open(&mut self) -> Result<(), SessionStartError>;

    /// Sends one command and blocks for its acknowledgment.
    ///
    /// Returns the data carried by the acknowledgment (empty for commands
    /// that report nothing).
    fn execute(&mut self, command: &Command) -> Result<String, ChannelError>;

    /// Shuts the engine down, forcefully if the graceful path fails.
    fn close(&mut self);

    /// Tears the current instance down (best-effort) and opens a new one.
    fn restart(&mut self) -> Result<(), SessionStartError>;

    /// Whether a channel is currently established.
    fn is_open(&self) -> bool;
}

impl<S: SolverSession + ?Sized> SolverSession for Box<S> {
    fn open(&mut self) -> Result<(), SessionStartError> {
        (**self).open()
    }

    fn execute(&mut self, command: &Command) -> Result<String, ChannelError> {
        (**self).execute(command)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn restart(&mut self) -> Result<(), SessionStartError> {
        (**self).restart()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
