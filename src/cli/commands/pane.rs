use anyhow::{bail, Result};
use std::path::PathBuf;

use super::{load_config, tmux_for};
use crate::tmux::{RespawnOutcome, Tmux};

pub struct PaneStatusCommand {
    pub config_path: Option<PathBuf>,
    pub session: String,
    pub socket: Option<String>,
}

impl PaneStatusCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_deref())?;
        let tmux = tmux_for(&config, self.socket.as_deref());

        if !tmux.has_session(&self.session).await {
            bail!("session '{}' not found on {}", self.session, tmux.command_prefix());
        }

        let dead = tmux.is_pane_dead(&self.session).await;
        println!("📋 Session: {}", self.session);
        println!("   State: {}", if dead { "💀 dead" } else { "✅ alive" });
        match tmux.pane_pid(&self.session).await {
            Ok(pid) => println!("   PID: {pid}"),
            Err(e) => println!("   PID: unavailable ({e})"),
        }
        Ok(())
    }
}

pub struct PaneRespawnCommand {
    pub config_path: Option<PathBuf>,
    pub session: String,
    pub socket: Option<String>,
    pub command: Option<String>,
}

impl PaneRespawnCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_deref())?;
        let tmux = tmux_for(&config, self.socket.as_deref());

        match respawn_existing(&tmux, &self.session, self.command.as_deref()).await? {
            RespawnOutcome::Respawned => println!("🔄 Respawned pane in '{}'", self.session),
            RespawnOutcome::SkippedAlive => {
                println!("✅ Pane in '{}' is alive; nothing to do", self.session)
            }
        }
        Ok(())
    }
}

/// A missing session reads as "alive" to the liveness probe, so check it
/// exists before asking for a respawn.
async fn respawn_existing(
    tmux: &Tmux,
    session: &str,
    command: Option<&str>,
) -> Result<RespawnOutcome> {
    tmux.validate_names(session)?;
    if !tmux.has_session(session).await {
        bail!("session '{}' not found on {}", session, tmux.command_prefix());
    }

    let outcome = match command {
        Some(command) => tmux.respawn_pane(session, command).await?,
        None => tmux.respawn_pane_default(session).await?,
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::fake::FakeTmuxServer;

    #[tokio::test]
    async fn respawn_of_missing_session_fails() {
        let server = FakeTmuxServer::new("gt");

        let err = respawn_existing(&server.tmux(), "hq-deacon", None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not found"), "{err}");
        assert!(server
            .calls()
            .iter()
            .all(|call| !call.iter().any(|arg| arg == "respawn-pane")));
    }

    #[tokio::test]
    async fn respawn_of_dead_pane_goes_through() {
        let server = FakeTmuxServer::new("gt");
        server.add_session("hq-deacon", 100);
        server.kill_process("hq-deacon");

        let outcome = respawn_existing(&server.tmux(), "hq-deacon", None)
            .await
            .unwrap();

        assert_eq!(outcome, RespawnOutcome::Respawned);
        assert_eq!(server.respawn_count("hq-deacon"), 1);
    }
}
