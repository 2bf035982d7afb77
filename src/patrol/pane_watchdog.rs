//! Supervisor sweep over the configured sessions.
//!
//! The `pane-died` hook handles the common case on its own. This patrol is
//! the safety net for panes the hook missed (hook not installed yet, tmux
//! restarted, `run-shell` job lost): any pane seen dead is respawned through
//! the same recheck path, so a pane the hook already revived is left alone.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Patrol, PatrolContext, PatrolError, PatrolReport};
use crate::config::DEFAULT_PANE_WATCHDOG_INTERVAL;
use crate::tmux::{RespawnOutcome, Tmux};

pub const PANE_WATCHDOG_NAME: &str = "pane_watchdog";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchdogSweep {
    pub respawned: Vec<String>,
    pub skipped_alive: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PaneWatchdog {
    tmux: Tmux,
}

impl PaneWatchdog {
    pub fn new(tmux: Tmux) -> Self {
        Self { tmux }
    }

    pub async fn sweep(&self, sessions: &[String]) -> WatchdogSweep {
        let mut sweep = WatchdogSweep::default();

        for session in sessions {
            if !self.tmux.has_session(session).await {
                debug!(session = %session, "supervised session not found");
                sweep.missing.push(session.clone());
                continue;
            }
            if !self.tmux.is_pane_dead(session).await {
                continue;
            }

            match self.tmux.respawn_pane_default(session).await {
                Ok(RespawnOutcome::Respawned) => sweep.respawned.push(session.clone()),
                Ok(RespawnOutcome::SkippedAlive) => sweep.skipped_alive.push(session.clone()),
                Err(e) => {
                    warn!(session = %session, error = %e, "failed to respawn dead pane");
                    sweep.failed.push(session.clone());
                }
            }
        }

        sweep
    }
}

#[async_trait]
impl Patrol for PaneWatchdog {
    fn name(&self) -> &'static str {
        PANE_WATCHDOG_NAME
    }

    fn default_interval(&self) -> Duration {
        DEFAULT_PANE_WATCHDOG_INTERVAL
    }

    fn enabled_by_default(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &PatrolContext) -> Result<PatrolReport, PatrolError> {
        let sessions = ctx
            .config
            .patrols
            .pane_watchdog
            .as_ref()
            .map(|c| c.sessions.clone())
            .unwrap_or_default();

        let sweep = self.sweep(&sessions).await;
        let mut report = PatrolReport::new(format!(
            "{} sessions checked, {} respawned, {} missing",
            sessions.len(),
            sweep.respawned.len(),
            sweep.missing.len()
        ));
        if !sweep.failed.is_empty() {
            report.escalation = Some(format!(
                "could not respawn dead panes in: {}",
                sweep.failed.join(", ")
            ));
        }
        Ok(report)
    }
}
