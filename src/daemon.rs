//! Daemon wiring: builds the tmux handle and store connector from config,
//! installs auto-respawn hooks, and runs the patrol scheduler until shutdown.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigProvider, DaemonConfig, SharedConfig, StoreBackend, StoreConfig};
use crate::external::ProcessCommandExecutor;
use crate::patrol::{PaneWatchdog, PatrolScheduler, WispReaper};
use crate::shutdown::ShutdownCoordinator;
use crate::store::{DoltConnector, SqliteConnector, StoreConnector};
use crate::tmux::{Tmux, TmuxError};

/// tmux handle on the configured socket with the configured command timeout.
pub fn tmux_from_config(config: &DaemonConfig) -> Tmux {
    Tmux::with_executor(
        config.tmux.socket.clone(),
        Arc::new(ProcessCommandExecutor::new(config.tmux.command_timeout())),
    )
}

pub fn connector_from_config(store: &StoreConfig) -> Result<Arc<dyn StoreConnector>> {
    match store.backend {
        StoreBackend::Dolt => Ok(Arc::new(DoltConnector)),
        StoreBackend::Sqlite => match &store.sqlite_dir {
            Some(dir) => Ok(Arc::new(SqliteConnector::new(dir.clone()))),
            None => bail!("store.backend = \"sqlite\" requires store.sqlite_dir"),
        },
    }
}

/// Install the auto-respawn hook on every session. Keeps going past failures
/// and returns them so the caller decides how loud to be.
pub async fn install_hooks(tmux: &Tmux, sessions: &[String]) -> Vec<(String, TmuxError)> {
    let mut failures = Vec::new();
    for session in sessions {
        if let Err(e) = tmux.set_auto_respawn_hook(session).await {
            failures.push((session.clone(), e));
        }
    }
    failures
}

pub struct Daemon {
    config: SharedConfig,
    shutdown: ShutdownCoordinator,
}

impl Daemon {
    pub fn new(config: SharedConfig, shutdown: ShutdownCoordinator) -> Self {
        Self { config, shutdown }
    }

    /// Scheduler with every patrol registered. Enabled flags are resolved at
    /// fire time, so disabled patrols are registered too.
    pub fn build_scheduler(&self, tmux: Tmux) -> Result<PatrolScheduler> {
        let snapshot = self.config.snapshot();
        let connector = connector_from_config(&snapshot.store)?;

        let mut scheduler = PatrolScheduler::new(Arc::new(self.config.clone()));
        scheduler.register(Arc::new(WispReaper::new(connector)));
        scheduler.register(Arc::new(PaneWatchdog::new(tmux)));
        Ok(scheduler)
    }

    pub async fn run(self) -> Result<()> {
        let snapshot = self.config.snapshot();
        let tmux = tmux_from_config(&snapshot);

        let sessions = snapshot
            .patrols
            .pane_watchdog
            .as_ref()
            .map(|c| c.sessions.clone())
            .unwrap_or_default();
        for (session, e) in install_hooks(&tmux, &sessions).await {
            warn!(session = %session, error = %e, "failed to install auto-respawn hook");
        }

        let scheduler = self.build_scheduler(tmux)?;
        let metrics = scheduler.metrics();

        #[cfg(unix)]
        self.spawn_reload_on_sighup()?;

        info!(socket = %snapshot.tmux.socket, "pane-warden daemon started");
        scheduler.run(self.shutdown.subscribe()).await;
        metrics.log_stats();
        info!("pane-warden daemon stopped");
        Ok(())
    }

    /// SIGHUP re-reads the config file; a bad file keeps the old snapshot.
    #[cfg(unix)]
    fn spawn_reload_on_sighup(&self) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = signal(SignalKind::hangup())?;
        let config = self.config.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait_for_shutdown() => break,
                    received = hangup.recv() => {
                        if received.is_none() {
                            break;
                        }
                        if let Err(e) = config.reload() {
                            warn!(error = %e, "config reload failed; keeping previous configuration");
                        }
                    }
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::fake::FakeTmuxServer;

    #[test]
    fn sqlite_backend_requires_directory() {
        let mut store = StoreConfig {
            backend: StoreBackend::Sqlite,
            ..Default::default()
        };
        assert!(connector_from_config(&store).is_err());

        store.sqlite_dir = Some(std::env::temp_dir());
        assert!(connector_from_config(&store).is_ok());
        assert!(connector_from_config(&StoreConfig::default()).is_ok());
    }

    #[test]
    fn scheduler_registers_every_patrol() {
        let daemon = Daemon::new(
            SharedConfig::new(DaemonConfig::default()),
            ShutdownCoordinator::new(),
        );
        let scheduler = daemon
            .build_scheduler(FakeTmuxServer::new("").tmux())
            .unwrap();
        assert_eq!(scheduler.patrol_names(), vec!["wisp_reaper", "pane_watchdog"]);
    }

    #[tokio::test]
    async fn hook_install_continues_past_failures() {
        let server = FakeTmuxServer::new("gt");
        server.add_session("hq-deacon", 100);
        server.add_session("hq-mayor", 200);

        let sessions = vec![
            "hq-deacon".to_string(),
            "missing".to_string(),
            "hq-mayor".to_string(),
        ];
        let failures = install_hooks(&server.tmux(), &sessions).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "missing");
        assert!(server.hook("hq-deacon").is_some());
        assert!(server.hook("hq-mayor").is_some());
    }

    #[tokio::test]
    async fn daemon_stops_when_shutdown_already_triggered() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DaemonConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_dir = Some(dir.path().to_path_buf());
        config.tmux.socket = "pane-warden-test-unused".to_string();

        let shutdown = ShutdownCoordinator::new();
        shutdown.trigger();
        let daemon = Daemon::new(SharedConfig::new(config), shutdown);

        tokio::time::timeout(std::time::Duration::from_secs(5), daemon.run())
            .await
            .expect("daemon should stop promptly")
            .unwrap();
    }
}
