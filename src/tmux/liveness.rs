//! Pane liveness queries.
//!
//! These readings are advisory: the hook and the daemon read them
//! independently and either may act on a stale answer.

use tracing::debug;

use super::{Tmux, TmuxError};

/// Interpret `list-panes -F '#{pane_dead}'` output. Only an explicit `1` on
/// the first pane counts as dead.
pub fn parse_pane_dead(output: &str) -> bool {
    output.lines().next().map(str::trim) == Some("1")
}

pub fn parse_pane_pid(output: &str) -> Result<u32, TmuxError> {
    let first = output.lines().next().unwrap_or("").trim();
    first.parse::<u32>().map_err(|_| TmuxError::UnexpectedOutput {
        query: "pane_pid",
        output: output.to_string(),
    })
}

impl Tmux {
    /// Whether the session's pane is dead.
    ///
    /// Any query failure (session gone, server not running, timeout) reads as
    /// *not dead*: the absence of a positive answer is never proof of death.
    pub async fn is_pane_dead(&self, session: &str) -> bool {
        match self.run(&["list-panes", "-t", session, "-F", "#{pane_dead}"]).await {
            Ok(out) => parse_pane_dead(&out),
            Err(e) => {
                debug!(session, error = %e, "pane liveness query failed; treating as alive");
                false
            }
        }
    }

    /// PID of the process currently backing the session's pane.
    pub async fn pane_pid(&self, session: &str) -> Result<u32, TmuxError> {
        let out = self
            .run(&["display-message", "-t", session, "-p", "#{pane_pid}"])
            .await?;
        parse_pane_pid(&out)
    }

    pub async fn has_session(&self, session: &str) -> bool {
        self.run(&["has-session", "-t", session]).await.is_ok()
    }
}
