//! Command Executor: runs a shell command with a deny-list check, a hard
//! timeout and a bound on simultaneous executions.
//!
//! The deny-list is plain substring matching on the lower-cased command. It
//! stops accidents, not an adversary; anything reaching `run` can execute
//! arbitrary code as the server user.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::TerminalSettings;

/// Substrings that block execution outright.
pub const BLOCKED_COMMANDS: &[&str] = &["rm -rf /", "rm -rf ~", "mkfs", ":(){:|:&};:"];

/// Captured result of one command. Failures that never reached the shell
/// (blocked, spawn error, timeout) are reported with `returncode` 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl CommandOutput {
    fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            returncode: 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.returncode == 0
    }
}

/// Returns the deny-list entry `command` matches, if any.
pub fn blocked_pattern(command: &str) -> Option<&'static str> {
    let lowered = command.trim().to_lowercase();
    BLOCKED_COMMANDS
        .iter()
        .copied()
        .find(|pattern| lowered.contains(pattern))
}

const MIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct CommandExecutor {
    default_cwd: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl CommandExecutor {
    pub fn new(default_cwd: impl Into<PathBuf>, settings: &TerminalSettings) -> Self {
        Self {
            default_cwd: default_cwd.into(),
            timeout: settings.timeout().max(MIN_TIMEOUT),
            permits: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
        }
    }

    pub fn default_cwd(&self) -> &Path {
        &self.default_cwd
    }

    /// Runs `command` through `sh -c` in `cwd` (or the workspace root).
    pub async fn run(&self, command: &str, cwd: Option<&Path>) -> CommandOutput {
        if let Some(pattern) = blocked_pattern(command) {
            warn!(command = %command, pattern, "Refusing deny-listed command");
            return CommandOutput::failure(format!("Blocked: `{pattern}`"));
        }

        let cwd = cwd.unwrap_or(&self.default_cwd);
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => return CommandOutput::failure(format!("Executor closed: {e}")),
        };

        info!(command = %command, cwd = %cwd.display(), "Running shell command");
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(error = ?e, cwd = %cwd.display(), "Failed to spawn shell");
                return CommandOutput::failure(e.to_string());
            }
        };

        // Dropping the child on timeout kills it (kill_on_drop).
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    returncode: output.status.code().unwrap_or(1),
                };
                debug!(returncode = result.returncode, "Shell command finished");
                result
            }
            Ok(Err(e)) => CommandOutput::failure(e.to_string()),
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Shell command timed out");
                CommandOutput::failure(format!("Timed out after {}s", self.timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_list_is_case_and_whitespace_insensitive() {
        assert_eq!(blocked_pattern("  RM -RF /  "), Some("rm -rf /"));
        assert_eq!(blocked_pattern("sudo mkfs.ext4 /dev/sda1"), Some("mkfs"));
        assert_eq!(blocked_pattern(":(){:|:&};:"), Some(":(){:|:&};:"));
        assert_eq!(blocked_pattern("ls -la"), None);
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let settings = TerminalSettings {
            timeout_secs: 0,
            max_concurrent: 1,
        };
        let executor = CommandExecutor::new("/", &settings);
        assert_eq!(executor.timeout, Duration::from_secs(1));
    }
}
