//! Base command execution abstraction
//!
//! Every multiplexer call goes through [`CommandExecutor`], so the tmux layer
//! can be exercised against a fake server in tests.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Upper bound for a single multiplexer call when no timeout is configured.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
///
/// This abstraction allows the rest of the codebase to execute commands
/// without directly depending on `tokio::process::Command`, enabling testing
/// with fake implementations.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// Real implementation backed by `tokio::process::Command`.
///
/// The child is killed if it outlives the timeout, so a wedged multiplexer
/// server can never hang a caller.
#[derive(Debug, Clone)]
pub struct ProcessCommandExecutor {
    timeout: Duration,
}

impl ProcessCommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CommandError::CommandNotFound {
                        command: program.to_string(),
                    }
                } else {
                    CommandError::Io { message: e.to_string() }
                }
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| CommandError::Io { message: e.to_string() })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_command_executor_success() {
        let executor = ProcessCommandExecutor::default();
        let result = executor.execute("echo", &["hello"]).await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_command_executor_command_not_found() {
        let executor = ProcessCommandExecutor::default();
        let result = executor.execute("nonexistent_command_xyz", &[]).await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), CommandError::CommandNotFound { .. }));
    }

    #[tokio::test]
    async fn test_process_command_executor_nonzero_exit_is_not_an_error() {
        let executor = ProcessCommandExecutor::default();
        let output = executor.execute("sh", &["-c", "echo oops >&2; exit 3"]).await.unwrap();

        assert!(!output.success());
        assert_eq!(output.status_code, 3);
        assert!(output.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_process_command_executor_times_out() {
        let executor = ProcessCommandExecutor::new(Duration::from_millis(100));
        let result = executor.execute("sleep", &["5"]).await;

        assert!(matches!(result, Err(CommandError::Timeout { timeout_ms: 100 })));
    }
}
