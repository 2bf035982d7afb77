//! Respawn coordinator: hook installation and the synchronous respawn path.

use serde::Serialize;
use tracing::{debug, info};

use super::hook::build_auto_respawn_hook_cmd;
use super::{Tmux, TmuxError};

/// Result of a direct respawn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RespawnOutcome {
    /// The pane was dead at recheck time and has been respawned.
    Respawned,
    /// The pane was alive at recheck time; nothing was killed.
    SkippedAlive,
}

impl Tmux {
    /// Keep a pane around after its process exits so it can be respawned in
    /// place instead of being destroyed with its window.
    pub async fn set_remain_on_exit(&self, session: &str, on: bool) -> Result<(), TmuxError> {
        let value = if on { "on" } else { "off" };
        self.run(&["set-option", "-t", session, "remain-on-exit", value])
            .await?;
        Ok(())
    }

    /// Install the auto-respawn `pane-died` hook on `session`.
    ///
    /// Idempotent: re-running replaces the previous hook. Both multiplexer
    /// calls must succeed; setup failures are returned, never swallowed.
    pub async fn set_auto_respawn_hook(&self, session: &str) -> Result<(), TmuxError> {
        self.validate_names(session)?;
        self.set_remain_on_exit(session, true).await?;

        let hook = build_auto_respawn_hook_cmd(&self.command_prefix(), session);
        self.run(&["set-hook", "-t", session, "pane-died", &hook])
            .await?;

        info!(
            session,
            socket = %self.socket_name(),
            "auto-respawn hook installed"
        );
        Ok(())
    }

    /// Respawn the pane with its original command, for a supervisor that has
    /// independently seen it dead.
    ///
    /// Liveness is re-read immediately before the kill-and-respawn, so a pane
    /// that the hook (or anyone else) already brought back is left alone.
    pub async fn respawn_pane_default(&self, session: &str) -> Result<RespawnOutcome, TmuxError> {
        if !self.is_pane_dead(session).await {
            debug!(session, "pane alive at recheck; skipping respawn");
            return Ok(RespawnOutcome::SkippedAlive);
        }
        self.run(&["respawn-pane", "-k", "-t", session]).await?;
        info!(session, socket = %self.socket_name(), "pane respawned");
        Ok(RespawnOutcome::Respawned)
    }

    /// Like [`Tmux::respawn_pane_default`] but with a replacement command.
    pub async fn respawn_pane(
        &self,
        session: &str,
        command: &str,
    ) -> Result<RespawnOutcome, TmuxError> {
        if !self.is_pane_dead(session).await {
            debug!(session, "pane alive at recheck; skipping respawn");
            return Ok(RespawnOutcome::SkippedAlive);
        }
        self.run(&["respawn-pane", "-k", "-t", session, command])
            .await?;
        info!(session, command, socket = %self.socket_name(), "pane respawned with new command");
        Ok(RespawnOutcome::Respawned)
    }
}
