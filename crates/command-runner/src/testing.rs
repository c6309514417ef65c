//! Scripted runner for tests in this crate and downstream crates.
//!
//! Enabled with the `test-utils` feature.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::Command;
use crate::runner::{ExitStatus, Output, Runner};
use crate::Result;

/// A runner that replays canned outputs and records every command.
///
/// Outputs are consumed in FIFO order; once the queue is empty every
/// further command succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<Output>>,
    commands: Mutex<Vec<Command>>,
    spawned: Mutex<Vec<Command>>,
}

impl ScriptedRunner {
    /// Create a runner with no scripted outputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful output with the given stdout
    pub fn push_output(&self, stdout: impl Into<String>) {
        self.outputs.lock().unwrap().push_back(Output::success(stdout));
    }

    /// Queue a failing output with the given exit code and stderr
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.outputs.lock().unwrap().push_back(Output {
            status: ExitStatus { code: Some(code) },
            stdout: String::new(),
            stderr: stderr.into(),
        });
    }

    /// Every command passed to [`Runner::run`], in order
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    /// Rendered command lines, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(Command::display).collect()
    }

    /// Every command passed to [`Runner::spawn`], in order
    pub fn spawned(&self) -> Vec<Command> {
        self.spawned.lock().unwrap().clone()
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn run(&self, command: Command) -> Result<Output> {
        self.commands.lock().unwrap().push(command);
        let next = self.outputs.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| Output::success("")))
    }

    async fn spawn(&self, command: Command) -> Result<u32> {
        self.spawned.lock().unwrap().push(command);
        Ok(4242)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_outputs_in_order() {
        smol::block_on(async {
            let runner = ScriptedRunner::new();
            runner.push_output("first");
            runner.push_failure(2, "boom");

            let first = runner.run(Command::new("a")).await.unwrap();
            assert_eq!(first.stdout, "first");

            let second = runner.run(Command::new("b")).await.unwrap();
            assert_eq!(second.status.code, Some(2));

            // Queue drained: further commands succeed with empty output
            let third = runner.run(Command::new("c")).await.unwrap();
            assert!(third.status.success());

            assert_eq!(runner.command_lines(), ["a", "b", "c"]);
        });
    }
}
