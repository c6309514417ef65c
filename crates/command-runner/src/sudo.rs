//! Privilege escalation wrapper
//!
//! Re-issues commands under `sudo -E -n`: the environment set on the
//! command is preserved, and sudo never prompts (a required password is a
//! hard failure rather than a hang). Host setup is expected to allow the
//! installer's commands without a password.

use async_trait::async_trait;

use crate::command::Command;
use crate::runner::{Output, Runner};
use crate::Result;

/// Runner that executes commands through `sudo`
#[derive(Debug, Clone)]
pub struct SudoRunner<R> {
    inner: R,
}

impl<R> SudoRunner<R> {
    /// Wrap the given runner with privilege escalation
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

fn escalate(command: Command) -> Command {
    let mut sudo = Command::new("sudo")
        .arg("-E")
        .arg("-n")
        .arg(command.program())
        .args(command.get_args().iter().cloned());
    for (key, value) in command.get_envs() {
        sudo = sudo.env(key, value);
    }
    if let Some(dir) = command.get_current_dir() {
        sudo = sudo.current_dir(dir);
    }
    sudo
}

#[async_trait]
impl<R> Runner for SudoRunner<R>
where
    R: Runner,
{
    async fn run(&self, command: Command) -> Result<Output> {
        self.inner.run(escalate(command)).await
    }

    async fn spawn(&self, command: Command) -> Result<u32> {
        self.inner.spawn(escalate(command)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_sudo_noninteractive() {
        let cmd = Command::new("apt-get").arg("install").arg("-y").arg("curl");
        let escalated = escalate(cmd);
        assert_eq!(escalated.program(), "sudo");
        assert_eq!(
            escalated.get_args(),
            ["-E", "-n", "apt-get", "install", "-y", "curl"]
        );
    }

    #[test]
    fn keeps_env_and_cwd() {
        let cmd = Command::new("apt-get")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .current_dir("/var/tmp");
        let escalated = escalate(cmd);
        assert_eq!(
            escalated
                .get_envs()
                .get("DEBIAN_FRONTEND")
                .map(String::as_str),
            Some("noninteractive")
        );
        assert_eq!(
            escalated.get_current_dir(),
            Some(std::path::Path::new("/var/tmp"))
        );
    }
}
