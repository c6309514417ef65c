//! # Command Runner
//!
//! The single seam through which the installer shells out to the host:
//! package-manager invocations, database administration, service management
//! tools, and service processes all go through a [`Runner`].
//!
//! A [`Command`] is a reusable, clonable description of an invocation.
//! [`LocalRunner`] executes it as a child process with captured output, and
//! [`SudoRunner`] wraps any other runner to re-issue the command with
//! elevated privilege in a non-interactive mode.
//!
//! ## Example
//!
//! ```rust,no_run
//! use command_runner::{Command, LocalRunner, Runner};
//!
//! # async fn example() -> command_runner::Result<()> {
//! let runner = LocalRunner;
//! let out = runner
//!     .run_checked(Command::new("uname").arg("-r"))
//!     .await?;
//! println!("kernel: {}", out.stdout.trim());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod command;
mod runner;
mod sudo;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use command::Command;
pub use runner::{ExitStatus, LocalRunner, Output, Runner};
pub use sudo::SudoRunner;

/// Error type for command execution
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The process could not be spawned at all
    #[error("failed to spawn `{command}`: {reason}")]
    SpawnFailed {
        /// The rendered command line
        command: String,
        /// Why the spawn failed
        reason: String,
    },

    /// The process ran but exited with a non-zero status
    #[error("command `{command}` failed with status {code:?}: {stderr}")]
    CommandFailed {
        /// The rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
