//! The execution trait and the local backend

use async_process::Stdio;
use async_trait::async_trait;
use tracing::debug;

use crate::command::Command;
use crate::{Error, Result};

/// Exit status of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
}

impl ExitStatus {
    /// Whether the process exited with code zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Captured result of a completed command
#[derive(Debug, Clone)]
pub struct Output {
    /// Exit status
    pub status: ExitStatus,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl Output {
    /// A successful output with the given stdout, used by test doubles
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: ExitStatus { code: Some(0) },
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Executes commands to completion.
///
/// Every invocation is blocking from the caller's point of view: `run`
/// resolves only once the child has exited and both output streams are
/// drained. There is one implementation per execution mode; wrappers such
/// as [`crate::SudoRunner`] compose on top of any other runner.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the command to completion, capturing its output.
    ///
    /// A non-zero exit is not an error at this level; use
    /// [`Runner::run_checked`] when the exit code must be enforced.
    async fn run(&self, command: Command) -> Result<Output>;

    /// Launch the command without waiting for it, returning the child pid.
    ///
    /// Used for starting long-lived service processes; everything else
    /// should go through [`Runner::run`].
    async fn spawn(&self, command: Command) -> Result<u32>;

    /// Run the command and treat a non-zero exit as fatal
    async fn run_checked(&self, command: Command) -> Result<Output> {
        let rendered = command.display();
        let output = self.run(command).await?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: rendered,
                code: output.status.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

/// Runs commands as local child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner;

#[async_trait]
impl Runner for LocalRunner {
    async fn run(&self, command: Command) -> Result<Output> {
        debug!(command = %command.display(), "running command");
        let mut cmd = command.prepare();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let out = cmd.output().await.map_err(|e| Error::SpawnFailed {
            command: command.display(),
            reason: e.to_string(),
        })?;

        Ok(Output {
            status: ExitStatus {
                code: out.status.code(),
            },
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    async fn spawn(&self, command: Command) -> Result<u32> {
        debug!(command = %command.display(), "spawning detached");
        let child = command.prepare().spawn().map_err(|e| Error::SpawnFailed {
            command: command.display(),
            reason: e.to_string(),
        })?;
        Ok(child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        smol::block_on(async {
            let out = LocalRunner
                .run(Command::new("echo").arg("hello"))
                .await
                .unwrap();
            assert!(out.status.success());
            assert_eq!(out.stdout.trim(), "hello");
        });
    }

    #[test]
    fn nonzero_exit_is_not_an_error_unchecked() {
        smol::block_on(async {
            let out = LocalRunner.run(Command::new("false")).await.unwrap();
            assert!(!out.status.success());
        });
    }

    #[test]
    fn run_checked_rejects_nonzero_exit() {
        smol::block_on(async {
            let err = LocalRunner
                .run_checked(Command::new("false"))
                .await
                .unwrap_err();
            match err {
                Error::CommandFailed { command, code, .. } => {
                    assert_eq!(command, "false");
                    assert_eq!(code, Some(1));
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        smol::block_on(async {
            let err = LocalRunner
                .run(Command::new("definitely-not-a-real-binary"))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::SpawnFailed { .. }));
        });
    }
}
