//! tmux integration: liveness probe, auto-respawn hook and respawn coordinator.
//!
//! A [`Tmux`] handle is scoped to one isolation socket (`tmux -L <socket>`).
//! An empty socket name means the legacy unscoped mode that talks to the
//! default server.

pub mod hook;
pub mod liveness;
pub mod respawn;

#[cfg(test)]
pub(crate) mod fake;

use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::debug;

use crate::external::{CommandError, CommandExecutor, ProcessCommandExecutor};

pub use hook::{build_auto_respawn_hook_cmd, build_auto_respawn_hook_cmd_with_grace, AUTO_RESPAWN_GRACE};
pub use respawn::RespawnOutcome;

const TMUX_BINARY: &str = "tmux";

static SESSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").expect("valid session regex"));
static SOCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("valid socket regex"));

#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("tmux {args} failed (exit {status_code}): {stderr}")]
    CommandFailed {
        args: String,
        status_code: i32,
        stderr: String,
    },
    #[error("could not run tmux: {0}")]
    Exec(#[from] CommandError),
    #[error("invalid session name {0:?}")]
    InvalidSession(String),
    #[error("invalid socket name {0:?}")]
    InvalidSocket(String),
    #[error("unexpected tmux output for {query}: {output:?}")]
    UnexpectedOutput { query: &'static str, output: String },
}

/// Handle on one tmux server.
#[derive(Clone)]
pub struct Tmux {
    socket_name: String,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for Tmux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tmux")
            .field("socket_name", &self.socket_name)
            .finish_non_exhaustive()
    }
}

impl Default for Tmux {
    fn default() -> Self {
        Self::new()
    }
}

impl Tmux {
    /// Unscoped handle on the default tmux server.
    pub fn new() -> Self {
        Self::with_socket("")
    }

    pub fn with_socket(socket: impl Into<String>) -> Self {
        Self::with_executor(socket, Arc::new(ProcessCommandExecutor::default()))
    }

    pub fn with_executor(socket: impl Into<String>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            socket_name: socket.into(),
            executor,
        }
    }

    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// The literal invocation prefix used both for our own calls and inside
    /// hook text: `tmux` or `tmux -L <socket>`.
    pub fn command_prefix(&self) -> String {
        if self.socket_name.is_empty() {
            TMUX_BINARY.to_string()
        } else {
            format!("{TMUX_BINARY} -L {}", self.socket_name)
        }
    }

    /// Run a tmux subcommand against this handle's server and return stdout.
    pub(crate) async fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if !self.socket_name.is_empty() {
            full.push("-L");
            full.push(&self.socket_name);
        }
        full.extend_from_slice(args);

        debug!(socket = %self.socket_name, args = ?args, "tmux");
        let output = self.executor.execute(TMUX_BINARY, &full).await?;
        if !output.success() {
            return Err(TmuxError::CommandFailed {
                args: args.join(" "),
                status_code: output.status_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    pub(crate) fn validate_names(&self, session: &str) -> Result<(), TmuxError> {
        if !SESSION_NAME.is_match(session) {
            return Err(TmuxError::InvalidSession(session.to_string()));
        }
        if !self.socket_name.is_empty() && !SOCKET_NAME.is_match(&self.socket_name) {
            return Err(TmuxError::InvalidSocket(self.socket_name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prefix_is_bare_without_socket() {
        assert_eq!(Tmux::new().command_prefix(), "tmux");
    }

    #[test]
    fn command_prefix_carries_socket_flag() {
        assert_eq!(Tmux::with_socket("gt").command_prefix(), "tmux -L gt");
    }

    #[test]
    fn rejects_names_that_would_break_hook_text() {
        let tmux = Tmux::with_socket("gt");
        assert!(tmux.validate_names("hq-deacon").is_ok());
        assert!(matches!(
            tmux.validate_names("bad'name"),
            Err(TmuxError::InvalidSession(_))
        ));
        assert!(matches!(
            tmux.validate_names("a b"),
            Err(TmuxError::InvalidSession(_))
        ));

        let bad_socket = Tmux::with_socket("gt; rm -rf /");
        assert!(matches!(
            bad_socket.validate_names("hq"),
            Err(TmuxError::InvalidSocket(_))
        ));
    }
}
